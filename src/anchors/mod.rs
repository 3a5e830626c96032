//! Anchor Key Registry Module
//!
//! Hands out dense anchor numbers for opaque anchor keys and answers lookups
//! against the partitioned table.
//!
//! ## Core Concepts
//! - **Allocation**: a single per-process mutex covers counter derivation,
//!   increment and insert, so concurrent requests never collide on a number.
//! - **Lazy Counter**: the counter is derived from the largest stored row key on
//!   first use and after any conflict or ceiling hit.
//! - **Init Gate**: the table is prepared exactly once before any data operation;
//!   a failed attempt is retried by the next caller.
//! - **Scans**: last-key, list and delete operations drain a full paginated scan.
//!
//! ## Submodules
//! - **`cache`**: `AnchorKeyCache`, the allocator and query layer.
//! - **`keys`**: anchor number <-> `(partition_key, row_key)` mapping.
//! - **`handlers`**: Axum handlers and router for the public API.
//! - **`protocol`**: endpoint paths and query DTOs.

pub mod cache;
pub mod error;
pub mod handlers;
pub mod keys;
pub mod protocol;
pub mod types;

pub use cache::{AllocatorState, AnchorKeyCache, CacheOptions};
pub use error::AnchorError;
pub use types::{AnchorNumber, AnchorRecord, DeleteReport};
