//! Per-epoch liveness / consecutive-miss detection. Runs once per epoch
//! boundary, for the epoch that just ended (see DESIGN.md for why this
//! crate gates on epoch boundaries rather than a slot-in-epoch threshold).

use crate::beacon::BeaconNodeClient;
use crate::error::Error;
use crate::notifier::Notifier;
use crate::types::{Epoch, Pubkey, ValidatorIndex};
use std::collections::{HashMap, HashSet};

/// Checks liveness for the epoch that just ended (`epoch(S) - 1`). Returns
/// the new dead set, which the caller stores for the next call so a
/// second consecutive miss can be detected.
pub async fn run(
    beacon: &BeaconNodeClient,
    notifier: &Notifier,
    active_index_to_pubkey: &HashMap<ValidatorIndex, Pubkey>,
    queried_epoch: Epoch,
    previous_dead: &HashSet<ValidatorIndex>,
) -> Result<HashSet<ValidatorIndex>, Error> {
    if active_index_to_pubkey.is_empty() {
        return Ok(HashSet::new());
    }

    let indices: HashSet<ValidatorIndex> = active_index_to_pubkey.keys().copied().collect();
    let live = beacon.get_validators_liveness(queried_epoch, &indices).await?;

    let dead: HashSet<ValidatorIndex> = live
        .into_iter()
        .filter_map(|(index, is_live)| (!is_live).then_some(index))
        .collect();

    if !dead.is_empty() {
        notifier.notify(&alert_line(&dead, active_index_to_pubkey, "\u{2620}\u{fe0f}", "had not attested")).await;
    }

    let double_dead: HashSet<ValidatorIndex> = dead.intersection(previous_dead).copied().collect();
    if !double_dead.is_empty() {
        notifier
            .notify(&alert_line(
                &double_dead,
                active_index_to_pubkey,
                "\u{1f631}",
                "failed to attest two epochs in a row",
            ))
            .await;
    }

    Ok(dead)
}

fn alert_line(
    indices: &HashSet<ValidatorIndex>,
    active_index_to_pubkey: &HashMap<ValidatorIndex, Pubkey>,
    emoji: &str,
    verb: &str,
) -> String {
    let mut sorted: Vec<ValidatorIndex> = indices.iter().copied().collect();
    sorted.sort_unstable();

    let shown: Vec<&str> = sorted
        .iter()
        .take(5)
        .filter_map(|index| active_index_to_pubkey.get(index))
        .map(|pubkey| pubkey.short())
        .collect();
    let overflow = sorted.len().saturating_sub(shown.len());

    format!("{emoji} Our validator {} and {} more {verb}", shown.join(", "), overflow, emoji = emoji, verb = verb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Pubkey;

    fn pubkey(n: u8) -> Pubkey {
        Pubkey::normalize(&format!("0x{:02x}{}", n, "0".repeat(94))).unwrap()
    }

    /// Previous dead set `{42, 43}`, liveness returns
    /// `{42: false, 43: true, 44: false}` => dead `{42, 44}`,
    /// two-in-a-row `{42}`.
    #[test]
    fn two_in_a_row_intersection() {
        let mut active: HashMap<ValidatorIndex, Pubkey> = HashMap::new();
        active.insert(42, pubkey(42));
        active.insert(43, pubkey(43));
        active.insert(44, pubkey(44));

        let live: HashMap<ValidatorIndex, bool> = [(42, false), (43, true), (44, false)].into_iter().collect();
        let dead: HashSet<ValidatorIndex> = live.into_iter().filter_map(|(i, l)| (!l).then_some(i)).collect();
        assert_eq!(dead, [42u64, 44].into_iter().collect());

        let previous_dead: HashSet<ValidatorIndex> = [42u64, 43].into_iter().collect();
        let double_dead: HashSet<ValidatorIndex> = dead.intersection(&previous_dead).copied().collect();
        assert_eq!(double_dead, [42u64].into_iter().collect());

        let line = alert_line(&double_dead, &active, "\u{1f631}", "failed to attest two epochs in a row");
        assert!(line.contains(pubkey(42).short()));
    }
}
