use super::error::TableError;
use super::types::{ContinuationToken, EntityIdentity, ScanFilter, Segment, TableEntity};

use async_trait::async_trait;

/// Contract the anchor cache relies on.
///
/// Every call may suspend on I/O. Single-row operations are atomic; nothing is
/// atomic across rows.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Makes the backing table available. Idempotent, possibly slow the first time.
    async fn ensure_ready(&self) -> Result<(), TableError>;

    async fn retrieve(&self, partition_key: &str, row_key: &str)
    -> Result<TableEntity, TableError>;

    /// Inserts a new row and returns it as stored (with its write timestamp).
    ///
    /// # Errors
    /// `TableError::Conflict` if the identity is already taken.
    async fn insert(&self, entity: TableEntity) -> Result<TableEntity, TableError>;

    /// Returns one page of rows strictly after `continuation`, in store order.
    async fn scan_segment(
        &self,
        filter: Option<&ScanFilter>,
        continuation: Option<ContinuationToken>,
    ) -> Result<Segment, TableError>;

    async fn delete(&self, identity: &EntityIdentity) -> Result<(), TableError>;

    /// Follows continuation tokens until the scan is exhausted.
    async fn scan_all(&self, filter: Option<&ScanFilter>) -> Result<Vec<TableEntity>, TableError> {
        let mut entities = Vec::new();
        let mut continuation = None;
        let mut pages = 0usize;

        loop {
            let segment = self.scan_segment(filter, continuation).await?;
            pages += 1;
            entities.extend(segment.entities);

            match segment.continuation {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }

        tracing::debug!("Scan drained {} page(s), {} entities", pages, entities.len());
        Ok(entities)
    }
}
