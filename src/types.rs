//! Core primitives shared across the crate: slot/epoch arithmetic, the
//! validator pubkey representation, and the wire-adjacent duty/committee
//! shapes that the beacon client and the duty engine pass between them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Slots per epoch on the beacon chain.
pub const SLOTS_PER_EPOCH: u64 = 32;

/// Seconds per slot.
pub const SECONDS_PER_SLOT: u64 = 12;

/// Grace period after an SSE `block` event before we query the block,
/// giving a reorg a chance to resolve so we don't report a false miss.
pub const BLOCK_NOT_ORPHANED_TIME: std::time::Duration = std::time::Duration::from_secs(9);

/// A slot number. 64-bit, non-negative by construction (`u64`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slot(pub u64);

impl Slot {
    pub fn new(slot: u64) -> Self {
        Slot(slot)
    }

    /// `epoch(slot) = slot / 32`.
    pub fn epoch(&self) -> Epoch {
        Epoch(self.0 / SLOTS_PER_EPOCH)
    }

    /// `slot_in_epoch(slot) = slot mod 32`.
    pub fn slot_in_epoch(&self) -> u64 {
        self.0 % SLOTS_PER_EPOCH
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Slot immediately preceding this one. Saturates at 0, which never
    /// arises in practice since slot 0 has no predecessor to attest for.
    pub fn saturating_sub_one(&self) -> Slot {
        Slot(self.0.saturating_sub(1))
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An epoch number, a group of `SLOTS_PER_EPOCH` consecutive slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epoch(pub u64);

impl Epoch {
    pub fn new(epoch: u64) -> Self {
        Epoch(epoch)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn start_slot(&self) -> Slot {
        Slot(self.0 * SLOTS_PER_EPOCH)
    }

    pub fn next(&self) -> Epoch {
        Epoch(self.0 + 1)
    }

    pub fn previous(&self) -> Option<Epoch> {
        self.0.checked_sub(1).map(Epoch)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validator index, stable for the lifetime of the validator.
pub type ValidatorIndex = u64;

/// A committee index within a slot.
pub type CommitteeIndex = u64;

/// A 48-byte BLS public key, represented as a normalized `0x`-prefixed
/// lowercase hex string (98 characters total). Equality is byte equality
/// after normalization; see `Pubkey::normalize`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pubkey(String);

impl Pubkey {
    /// The length of the hex body (without the `0x` prefix) for a valid
    /// BLS12-381 public key: 48 bytes, 2 hex chars per byte.
    const HEX_BODY_LEN: usize = 96;

    /// Normalize a raw key string: strip surrounding whitespace, lowercase,
    /// require exactly 96 hex chars in the body, prepend `0x` if absent.
    pub fn normalize(raw: &str) -> Result<Self, crate::error::Error> {
        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();
        let body = lower.strip_prefix("0x").unwrap_or(&lower);

        if body.len() != Self::HEX_BODY_LEN || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(crate::error::Error::InvalidAddress(raw.to_string()));
        }

        Ok(Pubkey(format!("0x{}", body)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A short, 10-character prefix used in log lines and Slack messages.
    pub fn short(&self) -> &str {
        &self.0[..10.min(self.0.len())]
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of `/eth/v1/validator/duties/proposer/{epoch}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProposerDuty {
    pub pubkey: Pubkey,
    #[serde(with = "crate::beacon::serde_utils::quoted_u64")]
    pub validator_index: ValidatorIndex,
    #[serde(with = "crate::beacon::serde_utils::quoted_slot")]
    pub slot: Slot,
}

/// A single (slot, committee_index) -> validator-index-list assignment, as
/// returned by `/eth/v1/beacon/states/head/committees`.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitteeAssignment {
    #[serde(with = "crate::beacon::serde_utils::quoted_slot")]
    pub slot: Slot,
    #[serde(with = "crate::beacon::serde_utils::quoted_u64", rename = "index")]
    pub committee_index: CommitteeIndex,
    #[serde(with = "crate::beacon::serde_utils::quoted_u64_vec")]
    pub validators: Vec<ValidatorIndex>,
}

/// `committees[slot][committee_index] -> validator indices`, the shape
/// the duty engine actually consumes.
pub type DutyCommittees = std::collections::HashMap<Slot, std::collections::HashMap<CommitteeIndex, Vec<ValidatorIndex>>>;

/// A single attestation as it appears inside a block body: its aggregation
/// bitfield (still hex-encoded) and the slot/committee it attests for.
#[derive(Debug, Clone)]
pub struct Attestation {
    pub aggregation_bits: String,
    pub data_slot: Slot,
    pub committee_index: CommitteeIndex,
}

/// The fields of a beacon block the duty engine needs: who proposed it
/// and which attestations it includes.
#[derive(Debug, Clone)]
pub struct Block {
    pub slot: Slot,
    pub proposer_index: ValidatorIndex,
    pub attestations: Vec<Attestation>,
}

impl From<crate::beacon::wire::BlockResponse> for Block {
    fn from(resp: crate::beacon::wire::BlockResponse) -> Self {
        let message = resp.data.message;
        Block {
            slot: message.slot,
            proposer_index: message.proposer_index.0,
            attestations: message
                .body
                .attestations
                .into_iter()
                .map(|a| Attestation {
                    aggregation_bits: a.aggregation_bits,
                    data_slot: a.data.slot,
                    committee_index: a.data.committee_index,
                })
                .collect(),
        }
    }
}
