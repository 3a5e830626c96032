//! Anchor Key Cache
//!
//! Stateful allocator and query layer over a `TableStore`. The only state it
//! owns is the allocation counter and the one-time initialization gate; every
//! read, enumerate and delete goes straight to the table.

use super::error::AnchorError;
use super::keys::{DEFAULT_PARTITION_SIZE, PartitionScheme};
use super::types::{AnchorNumber, AnchorRecord, DeleteReport};
use crate::table::{Column, ScanFilter, TableEntity, TableError, TableStore};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Anchor key reserved as a placeholder row; `delete_all` never touches it and
/// the delimited listing always starts with it.
pub const PLACEHOLDER_KEY: &str = "0";

pub const KEY_DELIMITER: &str = ",";

#[derive(Debug, Clone, Copy)]
pub struct CacheOptions {
    pub partition_size: u64,
    /// Once the counter reaches this value it is re-derived from storage before
    /// the next allocation.
    pub max_anchor_number: u64,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            partition_size: DEFAULT_PARTITION_SIZE,
            max_anchor_number: u64::MAX,
        }
    }
}

/// In-memory allocation counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocatorState {
    /// Not derived from storage yet (or invalidated).
    Unknown,
    /// Derived from an empty table: the next number is 0.
    Empty,
    /// Highest number known to be assigned.
    Assigned(AnchorNumber),
}

impl AllocatorState {
    fn next_candidate(self) -> AnchorNumber {
        match self {
            AllocatorState::Unknown | AllocatorState::Empty => AnchorNumber(0),
            AllocatorState::Assigned(last) => AnchorNumber(last.0 + 1),
        }
    }
}

pub struct AnchorKeyCache<S> {
    store: Arc<S>,
    scheme: PartitionScheme,
    max_anchor_number: u64,
    initialized: AtomicBool,
    // Bumped (under `init_attempt`) each time a setup attempt fails.
    failed_inits: AtomicU64,
    // Error text of the most recent failed setup; the lock also admits one attempt at a time.
    init_attempt: Mutex<Option<String>>,
    // Held across derive -> increment -> insert, so one allocation is in flight per process.
    counter: Mutex<AllocatorState>,
}

impl<S: TableStore> AnchorKeyCache<S> {
    pub fn new(store: Arc<S>, options: CacheOptions) -> Self {
        Self {
            store,
            scheme: PartitionScheme::new(options.partition_size),
            max_anchor_number: options.max_anchor_number,
            initialized: AtomicBool::new(false),
            failed_inits: AtomicU64::new(0),
            init_attempt: Mutex::new(None),
            counter: Mutex::new(AllocatorState::Unknown),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn scheme(&self) -> PartitionScheme {
        self.scheme
    }

    pub async fn allocator_state(&self) -> AllocatorState {
        *self.counter.lock().await
    }

    /// Makes sure the backing table exists before any data operation.
    ///
    /// One setup attempt runs at a time. Callers that queued behind an attempt
    /// share its outcome, failure included; a caller arriving after a failure
    /// starts a fresh attempt.
    pub async fn ensure_initialized(&self) -> Result<(), AnchorError> {
        if self.is_initialized() {
            return Ok(());
        }

        let seen_failures = self.failed_inits.load(Ordering::Acquire);
        let mut last_failure = self.init_attempt.lock().await;

        if self.is_initialized() {
            return Ok(());
        }
        if self.failed_inits.load(Ordering::Acquire) != seen_failures {
            let reason = last_failure
                .as_deref()
                .unwrap_or("anchor table setup failed")
                .to_string();
            return Err(AnchorError::StoreUnavailable(TableError::Unavailable(
                reason,
            )));
        }

        tracing::info!("Preparing anchor table");
        match self.store.ensure_ready().await {
            Ok(()) => {
                *last_failure = None;
                self.initialized.store(true, Ordering::Release);
                tracing::info!("Anchor table ready");
                Ok(())
            }
            Err(e) => {
                tracing::error!("Anchor table setup failed: {}", e);
                *last_failure = Some(e.to_string());
                self.failed_inits.fetch_add(1, Ordering::AcqRel);
                Err(AnchorError::StoreUnavailable(e))
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Assigns the next anchor number to `anchor_key` and persists the mapping.
    ///
    /// # Errors
    /// * `InvalidInput` for a blank key.
    /// * `AllocationConflict` if the candidate row already exists; the counter is
    ///   reset so the next call re-derives it from storage.
    /// * `Exhausted` if storage already holds the highest allowed number.
    pub async fn allocate(
        &self,
        anchor_key: &str,
        object_name: Option<&str>,
    ) -> Result<AnchorNumber, AnchorError> {
        if anchor_key.trim().is_empty() {
            return Err(AnchorError::InvalidInput("anchor key must not be blank"));
        }
        self.ensure_initialized().await?;

        let mut counter = self.counter.lock().await;

        let mut derived_now = false;
        if *counter == AllocatorState::Unknown {
            *counter = self.derive_state().await?;
            derived_now = true;
            tracing::info!("Anchor counter derived from storage: {:?}", *counter);
        }

        if self.at_ceiling(*counter) {
            if !derived_now {
                tracing::warn!(
                    "Anchor counter reached {}, re-deriving from storage",
                    self.max_anchor_number
                );
                *counter = self.derive_state().await?;
            }
            if let AllocatorState::Assigned(last) = *counter
                && self.at_ceiling(*counter)
            {
                *counter = AllocatorState::Unknown;
                return Err(AnchorError::Exhausted(last));
            }
        }

        let candidate = counter.next_candidate();
        let entity = self.scheme.to_entity(candidate, anchor_key, object_name);

        match self.store.insert(entity).await {
            Ok(_) => {
                *counter = AllocatorState::Assigned(candidate);
                tracing::debug!(
                    "Allocated anchor {} in partition {}",
                    candidate,
                    self.scheme.partition_key(candidate)
                );
                Ok(candidate)
            }
            Err(TableError::Conflict(identity)) => {
                *counter = AllocatorState::Unknown;
                tracing::error!(
                    "Allocation conflict on {}: another writer owns anchor {}",
                    identity,
                    candidate
                );
                Err(AnchorError::AllocationConflict(candidate))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn at_ceiling(&self, state: AllocatorState) -> bool {
        matches!(state, AllocatorState::Assigned(last) if last.0 >= self.max_anchor_number)
    }

    /// Largest numeric row key in the table.
    async fn derive_state(&self) -> Result<AllocatorState, AnchorError> {
        let entities = self.store.scan_all(None).await?;

        let last = entities
            .iter()
            .filter_map(|entity| {
                let parsed = PartitionScheme::parse_row_key(&entity.row_key);
                if parsed.is_none() {
                    tracing::warn!("Skipping non-numeric row key {:?}", entity.row_key);
                }
                parsed
            })
            .max();

        Ok(match last {
            Some(last) => AllocatorState::Assigned(last),
            None => AllocatorState::Empty,
        })
    }

    pub async fn get_by_number(&self, anchor_number: AnchorNumber) -> Result<String, AnchorError> {
        self.ensure_initialized().await?;

        let identity = self.scheme.identity(anchor_number);
        match self
            .store
            .retrieve(&identity.partition_key, &identity.row_key)
            .await
        {
            Ok(entity) => Ok(entity.anchor_key),
            Err(TableError::NotFound(_)) => Err(AnchorError::NotFound(anchor_number)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_record(&self, anchor_number: AnchorNumber) -> Result<AnchorRecord, AnchorError> {
        self.ensure_initialized().await?;

        let identity = self.scheme.identity(anchor_number);
        match self
            .store
            .retrieve(&identity.partition_key, &identity.row_key)
            .await
        {
            Ok(entity) => PartitionScheme::to_record(entity),
            Err(TableError::NotFound(_)) => Err(AnchorError::NotFound(anchor_number)),
            Err(e) => Err(e.into()),
        }
    }

    /// Most recently written record, found by scanning the whole table.
    ///
    /// Equal timestamps resolve to the larger anchor number.
    pub async fn get_last_record(&self) -> Result<Option<AnchorRecord>, AnchorError> {
        self.ensure_initialized().await?;

        let entities = self.store.scan_all(None).await?;
        let last = entities.into_iter().max_by_key(|entity| {
            (
                entity.timestamp,
                PartitionScheme::parse_row_key(&entity.row_key),
            )
        });

        last.map(PartitionScheme::to_record).transpose()
    }

    pub async fn get_last_key(&self) -> Result<Option<String>, AnchorError> {
        Ok(self
            .get_last_record()
            .await?
            .map(|record| record.anchor_key))
    }

    /// Every anchor key, in table scan order.
    pub async fn get_all_keys(&self) -> Result<Vec<String>, AnchorError> {
        self.ensure_initialized().await?;

        let entities = self.store.scan_all(None).await?;
        Ok(entities
            .into_iter()
            .map(|entity| entity.anchor_key)
            .collect())
    }

    /// `"0"` followed by `",<key>"` for every key, in `get_all_keys` order.
    pub async fn get_all_keys_delimited(&self) -> Result<String, AnchorError> {
        let keys = self.get_all_keys().await?;

        let mut joined = String::from(PLACEHOLDER_KEY);
        for key in &keys {
            joined.push_str(KEY_DELIMITER);
            joined.push_str(key);
        }
        Ok(joined)
    }

    /// Deletes every record whose key equals `anchor_key`.
    ///
    /// Returns `true` if at least one row was removed.
    pub async fn delete_by_key(&self, anchor_key: &str) -> Result<bool, AnchorError> {
        let report = self
            .delete_matching(ScanFilter::eq(Column::AnchorKey, anchor_key))
            .await?;
        Ok(report.deleted > 0)
    }

    /// Deletes every record except placeholder rows.
    ///
    /// Keeps going past per-row failures; returns `false` if any row could not be
    /// deleted, leaving those rows in place.
    pub async fn delete_all(&self) -> Result<bool, AnchorError> {
        let report = self
            .delete_matching(ScanFilter::ne(Column::AnchorKey, PLACEHOLDER_KEY))
            .await?;
        Ok(report.is_complete())
    }

    pub async fn delete_matching(&self, filter: ScanFilter) -> Result<DeleteReport, AnchorError> {
        self.ensure_initialized().await?;

        let entities = self.store.scan_all(Some(&filter)).await?;
        let report = self.delete_entities(entities).await;

        tracing::info!(
            "Delete pass ({:?} {:?} {:?}): matched={} deleted={} already_gone={} failed={}",
            filter.column,
            filter.comparison,
            filter.value,
            report.matched,
            report.deleted,
            report.already_gone,
            report.failures.len()
        );

        if !report.is_complete() {
            let failed: Vec<String> = report
                .failures
                .iter()
                .map(|(identity, e)| format!("{} ({})", identity, e))
                .collect();
            tracing::warn!("Partial delete failure: {}", failed.join(", "));
        }

        Ok(report)
    }

    async fn delete_entities(&self, entities: Vec<TableEntity>) -> DeleteReport {
        let mut report = DeleteReport {
            matched: entities.len(),
            ..DeleteReport::default()
        };

        for entity in entities {
            let identity = entity.identity();
            match self.store.delete(&identity).await {
                Ok(()) => report.deleted += 1,
                Err(TableError::NotFound(_)) => {
                    tracing::debug!("Row {} already deleted", identity);
                    report.already_gone += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to delete row {}: {}", identity, e);
                    report.failures.push((identity, e));
                }
            }
        }

        report
    }
}
