//! CLI surface: flags, environment fallbacks, and the validation that has
//! to happen before the engine starts.

use clap::Parser;
use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(
    name = "validator-watcher",
    about = "Watches an Ethereum beacon chain and alerts on missed proposals, suboptimal attestation inclusion, and consecutive missed attestations for a watched set of validators"
)]
pub struct Config {
    /// URL of the beacon node to watch.
    #[arg(long)]
    pub beacon_url: Url,

    /// File containing the list of public keys to watch, one 0x-prefixed
    /// hex key per line.
    #[arg(long)]
    pub pubkeys_file_path: Option<PathBuf>,

    /// URL to a Web3Signer instance managing keys to watch. May be
    /// repeated.
    #[arg(long = "web3signer-url")]
    pub web3signer_urls: Vec<Url>,

    /// File touched every slot so an external watchdog can detect a hang.
    #[arg(long)]
    pub liveness_file: Option<PathBuf>,

    /// Slack channel to post missed-block alerts to. Falls back to
    /// $SLACK_CHANNEL.
    #[arg(long, env = "SLACK_CHANNEL")]
    pub slack_channel: Option<String>,

    /// Slack bot token. Falls back to $SLACK_TOKEN.
    #[arg(long, env = "SLACK_TOKEN")]
    pub slack_token: Option<String>,

    /// Port the Prometheus exposition server listens on.
    #[arg(long, default_value_t = 8000)]
    pub metrics_port: u16,
}

impl Config {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(path) = &self.pubkeys_file_path {
            if !path.exists() {
                return Err(format!("pubkeys file does not exist: {}", path.display()));
            }
        }
        Ok(())
    }
}
