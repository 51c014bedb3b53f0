//! Consumes `GET /eth/v1/events?topics=block` as a blocking iterator over
//! parsed `EventBlockEnvelope`s. Reconnects on stream closure with the
//! same exponential-backoff shape as the HTTP retry policy; only
//! exhausting the reconnect budget is unrecoverable.

use crate::beacon::retry::backoff_delay;
use crate::beacon::wire::EventBlockEnvelope;
use crate::error::Error;
use futures_util::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use slog::{error, info, warn, Logger};
use url::Url;

/// How many consecutive reconnect attempts we tolerate before giving up
/// entirely. Generous on purpose: a beacon node restart can easily take
/// longer than the HTTP retry budget used for ordinary requests.
const MAX_RECONNECT_ATTEMPTS: u32 = 10;

pub struct BlockEventStream {
    url: Url,
    log: Logger,
    source: Option<EventSource>,
    reconnect_attempt: u32,
}

impl BlockEventStream {
    pub fn new(base_url: &Url, log: Logger) -> Self {
        let mut url = base_url.join("eth/v1/events").expect("valid base url");
        url.query_pairs_mut().append_pair("topics", "block");
        BlockEventStream {
            url,
            log,
            source: None,
            reconnect_attempt: 0,
        }
    }

    /// Blocks until the next `block` event arrives, reconnecting as needed.
    /// Returns `Err(Error::Sse(_))` only once the reconnect budget is
    /// exhausted — the caller should treat that as fatal.
    pub async fn next_event(&mut self) -> Result<EventBlockEnvelope, Error> {
        loop {
            if self.source.is_none() {
                self.source = Some(EventSource::get(self.url.clone()));
            }

            let source = self.source.as_mut().expect("source just populated");

            match source.next().await {
                Some(Ok(Event::Open)) => {
                    self.reconnect_attempt = 0;
                    continue;
                }
                Some(Ok(Event::Message(message))) => {
                    match serde_json::from_str::<EventBlockEnvelope>(&message.data) {
                        Ok(envelope) => return Ok(envelope),
                        Err(e) => {
                            warn!(self.log, "unparsable SSE payload, skipping"; "error" => e.to_string());
                            continue;
                        }
                    }
                }
                Some(Err(e)) => {
                    self.source = None;
                    self.reconnect_attempt += 1;
                    warn!(
                        self.log, "SSE stream error, reconnecting";
                        "error" => e.to_string(),
                        "attempt" => self.reconnect_attempt,
                    );
                }
                None => {
                    self.source = None;
                    self.reconnect_attempt += 1;
                    info!(self.log, "SSE stream closed, reconnecting"; "attempt" => self.reconnect_attempt);
                }
            }

            if self.reconnect_attempt > MAX_RECONNECT_ATTEMPTS {
                error!(self.log, "exhausted SSE reconnect budget");
                return Err(Error::Sse("reconnect budget exhausted".into()));
            }

            tokio::time::sleep(backoff_delay(self.reconnect_attempt.min(3).max(1))).await;
        }
    }
}
