//! Side-channel alert hook: a stdout line (always) plus an optional Slack
//! message. Only the "missed block proposal for one of our validators"
//! event is configured to also fire Slack (`notify_with_slack`); every
//! other engine alert goes through the stdout-only `notify`.

use reqwest::Client;
use serde::Serialize;
use slog::{error, info, Logger};

pub struct Notifier {
    log: Logger,
    http: Client,
    slack_channel: Option<String>,
    slack_token: Option<String>,
}

#[derive(Serialize)]
struct SlackMessage<'a> {
    channel: &'a str,
    text: &'a str,
}

impl Notifier {
    pub fn new(log: Logger, slack_channel: Option<String>, slack_token: Option<String>) -> Self {
        Notifier {
            log,
            http: Client::new(),
            slack_channel,
            slack_token,
        }
    }

    fn slack_configured(&self) -> bool {
        self.slack_channel.is_some() && self.slack_token.is_some()
    }

    /// Prints `text` to stdout via the shared logger. Never touches Slack —
    /// this is the path every engine submodule except the missed-block-for-
    /// one-of-ours branch uses.
    pub async fn notify(&self, text: &str) {
        info!(self.log, "{}", text);
    }

    /// Prints `text` to stdout and, if Slack credentials are configured,
    /// also posts it as a chat message. Reserved for one event: one of
    /// our validators missing a block proposal.
    pub async fn notify_with_slack(&self, text: &str) {
        info!(self.log, "{}", text);

        if !self.slack_configured() {
            return;
        }

        let channel = self.slack_channel.as_deref().expect("checked above");
        let token = self.slack_token.as_deref().expect("checked above");

        let result = self
            .http
            .post("https://slack.com/api/chat.postMessage")
            .bearer_auth(token)
            .json(&SlackMessage { channel, text })
            .send()
            .await;

        if let Err(e) = result {
            error!(self.log, "failed to send Slack message"; "error" => e.to_string());
        }
    }
}
