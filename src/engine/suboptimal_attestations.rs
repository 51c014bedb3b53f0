//! Sub-optimal attestation-inclusion detection: did the attestations due
//! at slot `S-1` actually get included in the block at slot `S` (the
//! immediately following slot), or only later?

use crate::beacon::BeaconNodeClient;
use crate::error::Error;
use crate::metrics;
use crate::notifier::Notifier;
use crate::types::{Block, Pubkey, Slot, ValidatorIndex};
use std::collections::{HashMap, HashSet};

/// Checks inclusion for the block observed at `slot`. Only called when a
/// block is actually present (an orphaned slot has nothing to check
/// inclusion against).
pub async fn run(
    beacon: &BeaconNodeClient,
    notifier: &Notifier,
    active_index_to_pubkey: &HashMap<ValidatorIndex, Pubkey>,
    slot: Slot,
    block: &Block,
) -> Result<(), Error> {
    let previous_slot = slot.saturating_sub_one();
    let previous_epoch = previous_slot.epoch();

    let committees = beacon.get_duty_committees(previous_epoch).await?;
    let duty_by_committee = match committees.get(&previous_slot) {
        Some(duty) => duty,
        None => return Ok(()),
    };

    let duty_indices: HashSet<ValidatorIndex> = duty_by_committee.values().flatten().copied().collect();
    let our_duty: HashSet<ValidatorIndex> = duty_indices
        .intersection(&active_index_to_pubkey.keys().copied().collect())
        .copied()
        .collect();

    let actual = beacon.aggregate_attestations(block, previous_slot)?;

    let mut ok: HashSet<ValidatorIndex> = HashSet::new();
    for (committee_index, mask) in &actual {
        if let Some(duty_validators) = duty_by_committee.get(committee_index) {
            let included = crate::bitfield::apply_mask(duty_validators, mask)?;
            ok.extend(included);
        }
    }

    let our_ok: HashSet<ValidatorIndex> = ok.intersection(&our_duty).copied().collect();
    let our_ko: HashSet<ValidatorIndex> = our_duty.difference(&our_ok).copied().collect();

    if !our_duty.is_empty() {
        let rate = 100.0 * our_ko.len() as f64 / our_duty.len() as f64;
        metrics::RATE_OF_NOT_OPTIMAL_ATTESTATION_INCLUSION.set(rate);
    }

    if !our_ko.is_empty() {
        let mut ko_indices: Vec<ValidatorIndex> = our_ko.iter().copied().collect();
        ko_indices.sort_unstable();

        let shown: Vec<&str> = ko_indices
            .iter()
            .take(5)
            .filter_map(|index| active_index_to_pubkey.get(index))
            .map(|pubkey| pubkey.short())
            .collect();
        let overflow = ko_indices.len().saturating_sub(shown.len());

        let rate = 100.0 * our_ko.len() as f64 / our_duty.len().max(1) as f64;
        let line = format!(
            "\u{2623}\u{fe0f}  Our validator {} and {} more ({:.1} %) had not optimal attestation inclusion at slot {}",
            shown.join(", "),
            overflow,
            rate,
            previous_slot,
        );
        notifier.notify(&line).await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Pubkey;

    fn pubkey(n: u8) -> Pubkey {
        Pubkey::normalize(&format!("0x{:02x}{}", n, "0".repeat(94))).unwrap()
    }

    /// Duty `[10, 11, 12, 13]`, actual mask `[true, false, true, true]`,
    /// watched = {11} => our_ko = {11}, rate = 100%.
    #[test]
    fn inclusion_classification_matches_spec_scenario() {
        let duty = vec![10u64, 11, 12, 13];
        let actual_mask = vec![true, false, true, true];
        let included = crate::bitfield::apply_mask(&duty, &actual_mask).unwrap();
        let ok: HashSet<u64> = included.into_iter().collect();

        let our_duty: HashSet<u64> = [11u64].into_iter().collect();
        let our_ok: HashSet<u64> = ok.intersection(&our_duty).copied().collect();
        let our_ko: HashSet<u64> = our_duty.difference(&our_ok).copied().collect();

        assert_eq!(our_ko, [11u64].into_iter().collect());
        assert_eq!(100.0 * our_ko.len() as f64 / our_duty.len() as f64, 100.0);
    }

    #[test]
    fn pubkey_helper_is_stable() {
        assert_eq!(pubkey(1).short().len(), 10);
    }
}
