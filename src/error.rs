//! Crate-wide error taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A non-404 HTTP failure, or a network error, after the retry budget
    /// is exhausted. The offending sub-step is skipped; the loop continues.
    #[error("transport error: {0}")]
    TransportError(String),

    /// The block at the requested slot does not exist (404, or
    /// retry-exhaustion over 404s). Not a process-level failure: it is the
    /// expected shape of an orphaned slot.
    #[error("no block at requested slot")]
    NoBlock,

    /// `decode_aggregation_bits`/`strip_sentinel` was handed a bitfield
    /// with no set bit at all, so the sentinel could not be located.
    #[error("malformed aggregation bitfield: no sentinel bit found")]
    MalformedBitfield,

    /// `or_fold`/`apply_mask` was handed sequences of differing length.
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// A pubkey string failed hex/length validation at the key-source
    /// boundary.
    #[error("invalid validator pubkey: {0}")]
    InvalidAddress(String),

    /// The SSE stream could not be (re-)opened within its own retry
    /// budget. Unrecoverable: propagates to the entrypoint, which exits
    /// non-zero.
    #[error("event stream error: {0}")]
    Sse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
