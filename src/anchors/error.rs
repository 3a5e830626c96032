use super::types::AnchorNumber;
use crate::table::TableError;

/// Errors surfaced by `AnchorKeyCache` operations.
#[derive(Debug, thiserror::Error)]
pub enum AnchorError {
    /// No record for this anchor number.
    #[error("anchor {0} not found")]
    NotFound(AnchorNumber),

    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// The table store could not be reached, created, or failed mid-call.
    #[error("anchor table unavailable: {0}")]
    StoreUnavailable(#[from] TableError),

    /// The candidate number was already taken in the table. Another writer is
    /// allocating against the same table; the counter has been invalidated.
    #[error("anchor number {0} is already taken by another writer")]
    AllocationConflict(AnchorNumber),

    /// Storage still holds the highest representable anchor number.
    #[error("anchor numbers exhausted at {0}")]
    Exhausted(AnchorNumber),

    #[error("stored row key {0:?} is not an anchor number")]
    CorruptRowKey(String),
}
