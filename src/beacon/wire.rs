//! JSON shapes of the beacon REST responses this crate consumes. Field
//! sets are pared down to what the duty engine actually reads; unknown
//! fields are ignored rather than rejected, since these are third-party
//! responses this crate does not own.

use crate::beacon::serde_utils;
use crate::types::{CommitteeAssignment, Pubkey, ProposerDuty, Slot, ValidatorIndex};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct EventBlockEnvelope {
    #[serde(with = "serde_utils::quoted_slot")]
    pub slot: Slot,
}

#[derive(Debug, Deserialize)]
pub struct ProposerDutiesResponse {
    pub data: Vec<ProposerDuty>,
}

#[derive(Debug, Deserialize)]
pub struct CommitteesResponse {
    pub data: Vec<CommitteeAssignment>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorStatus {
    PendingInitialized,
    PendingQueued,
    ActiveOngoing,
    ActiveExiting,
    ActiveSlashed,
    ExitedUnslashed,
    ExitedSlashed,
    WithdrawalPossible,
    WithdrawalDone,
}

impl ValidatorStatus {
    /// The two active statuses: `active_ongoing` and `active_exiting`.
    pub fn is_active(&self) -> bool {
        matches!(self, ValidatorStatus::ActiveOngoing | ValidatorStatus::ActiveExiting)
    }
}

#[derive(Debug, Deserialize)]
pub struct ValidatorRecordInner {
    pub pubkey: Pubkey,
}

#[derive(Debug, Deserialize)]
pub struct ValidatorRecord {
    #[serde(with = "serde_utils::quoted_u64")]
    pub index: ValidatorIndex,
    pub status: ValidatorStatus,
    pub validator: ValidatorRecordInner,
}

#[derive(Debug, Deserialize)]
pub struct ValidatorsResponse {
    pub data: Vec<ValidatorRecord>,
}

#[derive(Debug, Deserialize)]
pub struct AttestationData {
    #[serde(with = "serde_utils::quoted_slot")]
    pub slot: Slot,
    #[serde(with = "serde_utils::quoted_u64", rename = "index")]
    pub committee_index: u64,
}

#[derive(Debug, Deserialize)]
pub struct Attestation {
    pub aggregation_bits: String,
    pub data: AttestationData,
}

#[derive(Debug, Deserialize)]
pub struct BlockBody {
    pub attestations: Vec<Attestation>,
}

#[derive(Debug, Deserialize)]
pub struct BeaconBlockMessage {
    #[serde(with = "serde_utils::quoted_slot")]
    pub slot: Slot,
    pub proposer_index: ProposerIndexField,
    pub body: BlockBody,
}

/// `proposer_index` arrives as a quoted integer just like any other
/// consensus-layer integer field; kept as its own newtype only so the
/// `serde(with = ...)` attribute stays readable at the call site.
#[derive(Debug)]
pub struct ProposerIndexField(pub ValidatorIndex);

impl<'de> Deserialize<'de> for ProposerIndexField {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        serde_utils::quoted_u64::deserialize(deserializer).map(ProposerIndexField)
    }
}

#[derive(Debug, Deserialize)]
pub struct BlockResponseData {
    pub message: BeaconBlockMessage,
}

#[derive(Debug, Deserialize)]
pub struct BlockResponse {
    pub data: BlockResponseData,
}

#[derive(Debug, serde::Serialize)]
pub struct LivenessRequest {
    pub epoch: u64,
    pub indices: Vec<ValidatorIndex>,
}

#[derive(Debug, Deserialize)]
pub struct LivenessItem {
    #[serde(with = "serde_utils::quoted_u64")]
    pub index: ValidatorIndex,
    pub is_live: bool,
}

#[derive(Debug, Deserialize)]
pub struct LivenessResponse {
    pub data: Vec<LivenessItem>,
}
