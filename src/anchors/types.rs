use crate::table::{EntityIdentity, TableError};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense integer handle handed out for an anchor key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct AnchorNumber(pub u64);

impl fmt::Display for AnchorNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The unit of storage: one allocated anchor number and what it points at.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorRecord {
    pub anchor_number: AnchorNumber,
    pub anchor_key: String,
    /// Present only for registration-flavored inserts.
    pub registered_object_name: Option<String>,
    /// Write time assigned by the table store (ms).
    pub timestamp: u64,
}

/// Outcome of a scan-and-delete pass.
///
/// Per-row failures are collected here instead of aborting the pass.
#[derive(Debug, Default)]
pub struct DeleteReport {
    pub matched: usize,
    pub deleted: usize,
    /// Rows that vanished between the scan and the delete.
    pub already_gone: usize,
    pub failures: Vec<(EntityIdentity, TableError)>,
}

impl DeleteReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
