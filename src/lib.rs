//! Anchor Key Registry Library
//!
//! Server side of a spatial-anchor sharing protocol: clients submit long opaque
//! anchor keys and get back short, dense anchor numbers they can share.
//! This crate is the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! - **`anchors`**: The anchor key cache (allocation, lookups, bulk deletes)
//!   and its HTTP API.
//! - **`table`**: The partitioned table store contract and the bundled
//!   in-memory, snapshot-persisted implementation.
//! - **`config`**: Command-line and environment configuration.

pub mod anchors;
pub mod config;
pub mod table;
