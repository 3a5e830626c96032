use super::error::AnchorError;
use super::types::{AnchorNumber, AnchorRecord};
use crate::table::{EntityIdentity, TableEntity};

pub const DEFAULT_PARTITION_SIZE: u64 = 1000;

/// Maps anchor numbers onto `(partition_key, row_key)`.
///
/// `row_key` is the decimal anchor number and `partition_key` is the decimal
/// bucket `anchor_number / partition_size`. Every record uses the same function,
/// registered or not.
#[derive(Debug, Clone, Copy)]
pub struct PartitionScheme {
    partition_size: u64,
}

impl PartitionScheme {
    pub fn new(partition_size: u64) -> Self {
        Self {
            partition_size: partition_size.max(1),
        }
    }

    pub fn partition_size(&self) -> u64 {
        self.partition_size
    }

    pub fn partition_key(&self, number: AnchorNumber) -> String {
        (number.0 / self.partition_size).to_string()
    }

    pub fn row_key(&self, number: AnchorNumber) -> String {
        number.0.to_string()
    }

    pub fn identity(&self, number: AnchorNumber) -> EntityIdentity {
        EntityIdentity::new(self.partition_key(number), self.row_key(number))
    }

    pub fn parse_row_key(row_key: &str) -> Option<AnchorNumber> {
        row_key.parse::<u64>().ok().map(AnchorNumber)
    }

    pub fn to_entity(
        &self,
        number: AnchorNumber,
        anchor_key: &str,
        object_name: Option<&str>,
    ) -> TableEntity {
        TableEntity {
            partition_key: self.partition_key(number),
            row_key: self.row_key(number),
            anchor_key: anchor_key.to_string(),
            authorable: object_name.map(str::to_string),
            timestamp: 0,
        }
    }

    pub fn to_record(entity: TableEntity) -> Result<AnchorRecord, AnchorError> {
        let anchor_number = Self::parse_row_key(&entity.row_key)
            .ok_or_else(|| AnchorError::CorruptRowKey(entity.row_key.clone()))?;

        Ok(AnchorRecord {
            anchor_number,
            anchor_key: entity.anchor_key,
            registered_object_name: entity.authorable,
            timestamp: entity.timestamp,
        })
    }
}

impl Default for PartitionScheme {
    fn default() -> Self {
        Self::new(DEFAULT_PARTITION_SIZE)
    }
}
