//! Partitioned Table Store
//!
//! The durable layer underneath the anchor registry. Entities are addressed by a
//! two-part key `(partition_key, row_key)` and read back either by point lookup or
//! by a segmented scan that hands out one page at a time plus a continuation token.
//!
//! ## Core Concepts
//! - **Contract**: `TableStore` is the only surface the anchor cache talks to.
//!   It promises single-row atomicity and nothing across rows.
//! - **Segments**: scans are paginated; `TableStore::scan_all` drains every page.
//! - **Filters**: a scan may carry one equality/inequality predicate on a column.
//! - **MemoryTable**: the bundled implementation, sharded by partition key and
//!   optionally snapshotted to disk so the mapping survives restarts.

pub mod error;
pub mod memory;
pub mod store;
pub mod types;

pub use error::TableError;
pub use memory::MemoryTable;
pub use store::TableStore;
pub use types::{Column, ContinuationToken, EntityIdentity, ScanFilter, Segment, TableEntity};

#[cfg(test)]
mod tests;
