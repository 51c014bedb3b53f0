//! Missed-block-proposal detection.

use crate::beacon::BeaconNodeClient;
use crate::error::Error;
use crate::metrics;
use crate::notifier::Notifier;
use crate::types::{Block, Pubkey, Slot};
use std::collections::HashSet;

/// Classifies the proposer outcome for `slot`. `block` is `None` when the
/// slot was observed as orphaned.
pub async fn run(
    beacon: &BeaconNodeClient,
    notifier: &Notifier,
    watched: &HashSet<Pubkey>,
    slot: Slot,
    block: Option<&Block>,
) -> Result<(), Error> {
    let epoch = slot.epoch();
    let duties = beacon.get_proposer_duties(epoch).await?;

    let proposer_pubkey = duties
        .iter()
        .find(|duty| duty.slot == slot)
        .map(|duty| duty.pubkey.clone())
        .ok_or_else(|| Error::TransportError(format!("no proposer duty found for slot {}", slot)))?;

    let missed = block.is_none();
    let is_ours = watched.contains(&proposer_pubkey);

    let (emoji, verb) = match (is_ours, missed) {
        (true, true) => ("\u{274c}", "missed  "),  // ❌
        (true, false) => ("\u{2728}", "proposed"), // ✨
        (false, true) => ("\u{1f4a9}", "missed  "), // 💩
        (false, false) => ("\u{2705}", "proposed"), // ✅
    };

    let short = proposer_pubkey.short();
    let owned = if is_ours { "Our " } else { "    " };

    let console_line = format!(
        "{emoji} {owned}validator {short} {verb} block at epoch {epoch} - slot {slot} {emoji} - \u{1f511} {count} keys watched",
        emoji = emoji,
        owned = owned,
        short = short,
        verb = verb,
        epoch = epoch,
        slot = slot,
        count = watched.len(),
    );

    if is_ours && missed {
        let slack_line = format!(
            "{emoji} {owned}validator `{short}` {verb} block at epoch `{epoch}` - slot `{slot}` {emoji}",
            emoji = emoji,
            owned = owned,
            short = short,
            verb = verb,
            epoch = epoch,
            slot = slot,
        );
        notifier.notify_with_slack(&slack_line).await;

        metrics::MISSED_BLOCK_PROPOSALS_COUNT.with_label_values(&["", ""]).inc();
        metrics::MISSED_BLOCK_PROPOSALS_COUNT
            .with_label_values(&[&slot.as_u64().to_string(), &epoch.as_u64().to_string()])
            .inc();
    } else {
        notifier.notify(&console_line).await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(is_ours: bool, missed: bool) -> (&'static str, &'static str) {
        match (is_ours, missed) {
            (true, true) => ("\u{274c}", "missed  "),
            (true, false) => ("\u{2728}", "proposed"),
            (false, true) => ("\u{1f4a9}", "missed  "),
            (false, false) => ("\u{2705}", "proposed"),
        }
    }

    #[test]
    fn quadrant_emoji_mapping_matches_spec() {
        assert_eq!(classify(true, true), ("\u{274c}", "missed  "));
        assert_eq!(classify(true, false), ("\u{2728}", "proposed"));
        assert_eq!(classify(false, true), ("\u{1f4a9}", "missed  "));
        assert_eq!(classify(false, false), ("\u{2705}", "proposed"));
    }
}
