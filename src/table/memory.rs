use super::error::TableError;
use super::store::TableStore;
use super::types::{ContinuationToken, EntityIdentity, ScanFilter, Segment, TableEntity};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, MutexGuard};

pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// In-memory `TableStore`, sharded by partition key.
///
/// When constructed with a data file, `ensure_ready` loads the previous snapshot
/// and every mutation rewrites it (write to a temp file, then rename), so a
/// restarted process sees the same rows.
pub struct MemoryTable {
    partitions: DashMap<String, DashMap<String, TableEntity>>,
    page_size: usize,
    data_file: Option<PathBuf>,
    ready: AtomicBool,
    last_timestamp: AtomicU64,
    // Held across every mutation and its snapshot write, and across the initial load.
    persist_lock: Mutex<()>,
}

impl MemoryTable {
    pub fn new(page_size: usize) -> Self {
        Self {
            partitions: DashMap::new(),
            page_size: page_size.max(1),
            data_file: None,
            ready: AtomicBool::new(false),
            last_timestamp: AtomicU64::new(0),
            persist_lock: Mutex::new(()),
        }
    }

    pub fn with_data_file(page_size: usize, data_file: impl Into<PathBuf>) -> Self {
        Self {
            data_file: Some(data_file.into()),
            ..Self::new(page_size)
        }
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    pub fn entity_count(&self) -> usize {
        self.partitions
            .iter()
            .map(|partition| partition.value().len())
            .sum()
    }

    /// Write timestamps are strictly increasing within one table.
    fn next_timestamp(&self) -> u64 {
        let now = now_ms();
        let mut current = self.last_timestamp.load(Ordering::Relaxed);
        loop {
            let next = now.max(current + 1);
            match self.last_timestamp.compare_exchange_weak(
                current,
                next,
                Ordering::SeqCst,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }

    fn store_local(&self, entity: TableEntity) {
        self.last_timestamp
            .fetch_max(entity.timestamp, Ordering::SeqCst);
        self.partitions
            .entry(entity.partition_key.clone())
            .or_default()
            .insert(entity.row_key.clone(), entity);
    }

    fn remove_local(&self, identity: &EntityIdentity) -> Option<TableEntity> {
        let removed = self
            .partitions
            .get(&identity.partition_key)
            .and_then(|partition| partition.remove(&identity.row_key))
            .map(|(_, entity)| entity);

        self.partitions
            .remove_if(&identity.partition_key, |_, partition| partition.is_empty());

        removed
    }

    fn snapshot(&self) -> Vec<TableEntity> {
        let mut entities: Vec<TableEntity> = self
            .partitions
            .iter()
            .flat_map(|partition| {
                partition
                    .value()
                    .iter()
                    .map(|row| row.value().clone())
                    .collect::<Vec<_>>()
            })
            .collect();
        entities.sort_by(|a, b| {
            (&a.partition_key, &a.row_key).cmp(&(&b.partition_key, &b.row_key))
        });
        entities
    }

    /// Rewrites the snapshot. The caller holds `persist_lock` from the in-memory
    /// change until this returns, including any rollback.
    async fn persist(&self, _held: &MutexGuard<'_, ()>) -> Result<(), TableError> {
        let Some(path) = &self.data_file else {
            return Ok(());
        };

        let bytes = bincode::serialize(&self.snapshot())?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;

        tracing::debug!("Persisted table snapshot to {}", path.display());
        Ok(())
    }

    async fn load(&self, path: &Path) -> Result<(), TableError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No table snapshot at {}, starting empty", path.display());
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let entities: Vec<TableEntity> = bincode::deserialize(&bytes)?;
        let count = entities.len();
        for entity in entities {
            self.store_local(entity);
        }

        tracing::info!("Loaded {} entities from {}", count, path.display());
        Ok(())
    }
}

#[async_trait]
impl TableStore for MemoryTable {
    async fn ensure_ready(&self) -> Result<(), TableError> {
        if self.ready.load(Ordering::Acquire) {
            return Ok(());
        }

        let _guard = self.persist_lock.lock().await;
        if self.ready.load(Ordering::Acquire) {
            return Ok(());
        }

        if let Some(path) = &self.data_file {
            self.load(path).await?;
        }
        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    async fn retrieve(
        &self,
        partition_key: &str,
        row_key: &str,
    ) -> Result<TableEntity, TableError> {
        self.partitions
            .get(partition_key)
            .and_then(|partition| partition.get(row_key).map(|row| row.value().clone()))
            .ok_or_else(|| TableError::NotFound(EntityIdentity::new(partition_key, row_key)))
    }

    async fn insert(&self, mut entity: TableEntity) -> Result<TableEntity, TableError> {
        let guard = self.persist_lock.lock().await;
        entity.timestamp = self.next_timestamp();
        let identity = entity.identity();

        {
            let partition = self
                .partitions
                .entry(entity.partition_key.clone())
                .or_default();
            match partition.entry(entity.row_key.clone()) {
                Entry::Occupied(_) => return Err(TableError::Conflict(identity)),
                Entry::Vacant(slot) => {
                    slot.insert(entity.clone());
                }
            }
        }

        if let Err(e) = self.persist(&guard).await {
            tracing::warn!("Rolling back insert of {}: {}", identity, e);
            self.remove_local(&identity);
            return Err(e);
        }

        Ok(entity)
    }

    async fn scan_segment(
        &self,
        filter: Option<&ScanFilter>,
        continuation: Option<ContinuationToken>,
    ) -> Result<Segment, TableError> {
        let mut partition_keys: Vec<String> = self
            .partitions
            .iter()
            .map(|partition| partition.key().clone())
            .filter(|key| {
                continuation
                    .as_ref()
                    .is_none_or(|token| key.as_str() >= token.partition_key.as_str())
            })
            .collect();
        partition_keys.sort();

        let mut entities = Vec::with_capacity(self.page_size);

        for partition_key in partition_keys {
            let mut rows: Vec<TableEntity> = match self.partitions.get(&partition_key) {
                Some(partition) => partition
                    .iter()
                    .map(|row| row.value().clone())
                    .filter(|entity| entity.is_after_token(continuation.as_ref()))
                    .filter(|entity| filter.is_none_or(|filter| filter.matches(entity)))
                    .collect(),
                None => continue,
            };
            rows.sort_by(|a, b| a.row_key.cmp(&b.row_key));

            for row in rows {
                if entities.len() == self.page_size {
                    let continuation = entities
                        .last()
                        .map(|last: &TableEntity| ContinuationToken::from(last.identity()));
                    return Ok(Segment {
                        entities,
                        continuation,
                    });
                }
                entities.push(row);
            }
        }

        Ok(Segment {
            entities,
            continuation: None,
        })
    }

    async fn delete(&self, identity: &EntityIdentity) -> Result<(), TableError> {
        let guard = self.persist_lock.lock().await;
        let removed = self
            .remove_local(identity)
            .ok_or_else(|| TableError::NotFound(identity.clone()))?;

        if let Err(e) = self.persist(&guard).await {
            tracing::warn!("Rolling back delete of {}: {}", identity, e);
            self.store_local(removed);
            return Err(e);
        }

        Ok(())
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
