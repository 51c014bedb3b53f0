//! HTTP retry policy: exponential backoff with factor 0.5, up to 3
//! attempts, retrying only on HTTP 404 — the status the consensus-layer
//! REST dialect also returns immediately after a new-head notification,
//! before the block is actually queryable.

use std::time::Duration;

pub const MAX_ATTEMPTS: u32 = 3;
pub const BACKOFF_FACTOR: f64 = 0.5;

/// Delay before attempt number `attempt` (0-indexed: the first retry is
/// `attempt == 1`). `0.5 * 2^(attempt-1)` seconds, the classic
/// exponential-backoff-with-factor shape.
pub fn backoff_delay(attempt: u32) -> Duration {
    let seconds = BACKOFF_FACTOR * 2f64.powi(attempt as i32 - 1);
    Duration::from_secs_f64(seconds.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially() {
        assert_eq!(backoff_delay(1), Duration::from_secs_f64(0.5));
        assert_eq!(backoff_delay(2), Duration::from_secs_f64(1.0));
        assert_eq!(backoff_delay(3), Duration::from_secs_f64(2.0));
    }
}
