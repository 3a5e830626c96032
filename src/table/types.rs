//! Table Data Types
//!
//! Row layout and scan primitives shared by every `TableStore` implementation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two-part identity of a row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityIdentity {
    pub partition_key: String,
    pub row_key: String,
}

impl EntityIdentity {
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
        }
    }
}

impl fmt::Display for EntityIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.partition_key, self.row_key)
    }
}

/// A single stored row.
///
/// `timestamp` is owned by the store: whatever the caller passes to `insert` is
/// replaced with the write time (ms since the Unix epoch).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableEntity {
    pub partition_key: String,
    pub row_key: String,
    /// `AnchorKey` column.
    pub anchor_key: String,
    /// `Authorable` column, set only for registered objects.
    pub authorable: Option<String>,
    pub timestamp: u64,
}

impl TableEntity {
    pub fn identity(&self) -> EntityIdentity {
        EntityIdentity::new(self.partition_key.clone(), self.row_key.clone())
    }

    fn is_after(&self, token: &ContinuationToken) -> bool {
        (self.partition_key.as_str(), self.row_key.as_str())
            > (token.partition_key.as_str(), token.row_key.as_str())
    }

    pub(crate) fn is_after_token(&self, token: Option<&ContinuationToken>) -> bool {
        token.is_none_or(|token| self.is_after(token))
    }
}

/// Columns a scan filter can compare against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    PartitionKey,
    RowKey,
    AnchorKey,
    Authorable,
}

impl Column {
    fn value<'a>(&self, entity: &'a TableEntity) -> Option<&'a str> {
        match self {
            Column::PartitionKey => Some(&entity.partition_key),
            Column::RowKey => Some(&entity.row_key),
            Column::AnchorKey => Some(&entity.anchor_key),
            Column::Authorable => entity.authorable.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
}

/// A single-column predicate applied server-side during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFilter {
    pub column: Column,
    pub comparison: Comparison,
    pub value: String,
}

impl ScanFilter {
    pub fn eq(column: Column, value: impl Into<String>) -> Self {
        Self {
            column,
            comparison: Comparison::Equal,
            value: value.into(),
        }
    }

    pub fn ne(column: Column, value: impl Into<String>) -> Self {
        Self {
            column,
            comparison: Comparison::NotEqual,
            value: value.into(),
        }
    }

    /// A missing column never equals anything, so it always passes `NotEqual`.
    pub fn matches(&self, entity: &TableEntity) -> bool {
        let actual = self.column.value(entity);
        match self.comparison {
            Comparison::Equal => actual == Some(self.value.as_str()),
            Comparison::NotEqual => actual != Some(self.value.as_str()),
        }
    }
}

/// Position to resume a scan from: the identity of the last row already returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationToken {
    pub partition_key: String,
    pub row_key: String,
}

impl From<EntityIdentity> for ContinuationToken {
    fn from(identity: EntityIdentity) -> Self {
        Self {
            partition_key: identity.partition_key,
            row_key: identity.row_key,
        }
    }
}

/// One page of a segmented scan.
#[derive(Debug, Clone, Default)]
pub struct Segment {
    pub entities: Vec<TableEntity>,
    /// `None` once the scan is exhausted.
    pub continuation: Option<ContinuationToken>,
}
