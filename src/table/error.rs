use super::types::EntityIdentity;

/// Failure modes of a `TableStore` call.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// No row with this identity exists.
    #[error("entity not found: {0}")]
    NotFound(EntityIdentity),

    /// Insert refused because the `(partition_key, row_key)` pair is taken.
    #[error("entity already exists: {0}")]
    Conflict(EntityIdentity),

    /// The backing table cannot be reached or created.
    #[error("table unavailable: {0}")]
    Unavailable(String),

    #[error("table storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("table snapshot could not be encoded or decoded: {0}")]
    Codec(#[from] bincode::Error),
}
