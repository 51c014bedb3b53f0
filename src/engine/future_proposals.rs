//! Future-proposal pre-announcement: at each new epoch, name any slot in
//! the current or next epoch where a watched key is scheduled to propose.

use crate::beacon::BeaconNodeClient;
use crate::error::Error;
use crate::notifier::Notifier;
use crate::types::{Epoch, Pubkey, Slot};
use std::collections::HashSet;

pub async fn run(
    beacon: &BeaconNodeClient,
    notifier: &Notifier,
    watched: &HashSet<Pubkey>,
    current_slot: Slot,
    current_epoch: Epoch,
) -> Result<(), Error> {
    let this_epoch_duties = beacon.get_proposer_duties(current_epoch).await?;
    let next_epoch_duties = beacon.get_proposer_duties(current_epoch.next()).await?;

    for duty in this_epoch_duties.iter().chain(next_epoch_duties.iter()) {
        if watched.contains(&duty.pubkey) && duty.slot > current_slot {
            let line = format!(
                "\u{1f4e2} Validator {} is scheduled to propose at slot {}",
                duty.pubkey.short(),
                duty.slot,
            );
            notifier.notify(&line).await;
        }
    }

    Ok(())
}
