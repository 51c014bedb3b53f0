//! A liveness file rewritten at each slot so external watchdogs can
//! detect a hung process. Truncate-and-replace;
//! readers always see either the previous or the new content, never a
//! partial write, since replace happens via a single `write` call.

use crate::types::Slot;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub async fn touch(path: &Path, last_slot: Slot) -> std::io::Result<()> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let contents = format!("{} {}\n", now, last_slot.as_u64());
    tokio::fs::write(path, contents).await
}
