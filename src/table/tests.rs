//! Table Store Tests
//!
//! Validates the `MemoryTable` implementation of the `TableStore` contract.
//!
//! ## Test Scopes
//! - **Point Operations**: insert-if-absent, retrieve, delete and their error cases.
//! - **Segmented Scans**: page boundaries, continuation tokens, filters.
//! - **Persistence**: snapshots survive a fresh `MemoryTable` over the same file.

#[cfg(test)]
mod tests {
    use crate::table::{
        Column, EntityIdentity, MemoryTable, ScanFilter, TableEntity, TableError, TableStore,
    };

    fn entity(partition_key: &str, row_key: &str, anchor_key: &str) -> TableEntity {
        TableEntity {
            partition_key: partition_key.to_string(),
            row_key: row_key.to_string(),
            anchor_key: anchor_key.to_string(),
            authorable: None,
            timestamp: 0,
        }
    }

    // ============================================================
    // POINT OPERATIONS
    // ============================================================

    #[tokio::test]
    async fn test_insert_then_retrieve() {
        let table = MemoryTable::new(10);
        table.ensure_ready().await.unwrap();

        let stored = table.insert(entity("0", "7", "blob-7")).await.unwrap();
        assert!(stored.timestamp > 0, "Store should stamp the write time");

        let retrieved = table.retrieve("0", "7").await.unwrap();
        assert_eq!(retrieved, stored);
    }

    #[tokio::test]
    async fn test_insert_existing_identity_conflicts() {
        let table = MemoryTable::new(10);

        table.insert(entity("0", "1", "first")).await.unwrap();
        let result = table.insert(entity("0", "1", "second")).await;

        assert!(matches!(result, Err(TableError::Conflict(_))));
        // Original row untouched
        assert_eq!(table.retrieve("0", "1").await.unwrap().anchor_key, "first");
    }

    #[tokio::test]
    async fn test_same_row_key_in_other_partition_is_not_a_conflict() {
        let table = MemoryTable::new(10);

        table.insert(entity("0", "1", "a")).await.unwrap();
        table.insert(entity("1", "1", "b")).await.unwrap();

        assert_eq!(table.entity_count(), 2);
        assert_eq!(table.partition_count(), 2);
    }

    #[tokio::test]
    async fn test_retrieve_missing_is_not_found() {
        let table = MemoryTable::new(10);

        let result = table.retrieve("0", "404").await;
        assert!(matches!(result, Err(TableError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_removes_row_and_empty_partition() {
        let table = MemoryTable::new(10);
        table.insert(entity("3", "3000", "k")).await.unwrap();

        table
            .delete(&EntityIdentity::new("3", "3000"))
            .await
            .unwrap();

        assert!(table.retrieve("3", "3000").await.is_err());
        assert_eq!(table.partition_count(), 0);

        let again = table.delete(&EntityIdentity::new("3", "3000")).await;
        assert!(matches!(again, Err(TableError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_timestamps_strictly_increase() {
        let table = MemoryTable::new(10);

        let mut previous = 0;
        for i in 0..50 {
            let stored = table
                .insert(entity("0", &i.to_string(), "k"))
                .await
                .unwrap();
            assert!(stored.timestamp > previous);
            previous = stored.timestamp;
        }
    }

    // ============================================================
    // SEGMENTED SCANS
    // ============================================================

    #[tokio::test]
    async fn test_scan_segment_paginates_with_continuation() {
        let table = MemoryTable::new(3);
        for i in 0..10 {
            table
                .insert(entity("0", &format!("{:02}", i), &format!("key-{}", i)))
                .await
                .unwrap();
        }

        let mut pages = Vec::new();
        let mut continuation = None;
        loop {
            let segment = table.scan_segment(None, continuation).await.unwrap();
            pages.push(segment.entities.len());
            match segment.continuation {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }

        assert_eq!(pages, vec![3, 3, 3, 1]);
    }

    #[tokio::test]
    async fn test_exactly_full_last_page_has_no_continuation() {
        let table = MemoryTable::new(2);
        table.insert(entity("0", "0", "a")).await.unwrap();
        table.insert(entity("0", "1", "b")).await.unwrap();

        let segment = table.scan_segment(None, None).await.unwrap();

        assert_eq!(segment.entities.len(), 2);
        assert!(segment.continuation.is_none());
    }

    #[tokio::test]
    async fn test_scan_all_crosses_partitions_in_key_order() {
        let table = MemoryTable::new(2);
        for (partition, row) in [("1", "1000"), ("0", "1"), ("0", "0"), ("2", "2000"), ("1", "1001")] {
            table.insert(entity(partition, row, row)).await.unwrap();
        }

        let rows: Vec<String> = table
            .scan_all(None)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.row_key)
            .collect();

        assert_eq!(rows, vec!["0", "1", "1000", "1001", "2000"]);
    }

    #[tokio::test]
    async fn test_scan_filters_equal_and_not_equal() {
        let table = MemoryTable::new(2);
        table.insert(entity("0", "0", "0")).await.unwrap();
        table.insert(entity("0", "1", "dup")).await.unwrap();
        table.insert(entity("0", "2", "other")).await.unwrap();
        table.insert(entity("0", "3", "dup")).await.unwrap();

        let equal = table
            .scan_all(Some(&ScanFilter::eq(Column::AnchorKey, "dup")))
            .await
            .unwrap();
        assert_eq!(equal.len(), 2);
        assert!(equal.iter().all(|e| e.anchor_key == "dup"));

        let not_placeholder = table
            .scan_all(Some(&ScanFilter::ne(Column::AnchorKey, "0")))
            .await
            .unwrap();
        assert_eq!(not_placeholder.len(), 3);
    }

    #[test]
    fn test_filter_on_missing_column() {
        let row = entity("0", "0", "k");

        assert!(!ScanFilter::eq(Column::Authorable, "chair").matches(&row));
        assert!(ScanFilter::ne(Column::Authorable, "chair").matches(&row));
    }

    #[tokio::test]
    async fn test_scan_empty_table() {
        let table = MemoryTable::new(5);

        let segment = table.scan_segment(None, None).await.unwrap();
        assert!(segment.entities.is_empty());
        assert!(segment.continuation.is_none());
    }

    // ============================================================
    // PERSISTENCE
    // ============================================================

    #[tokio::test]
    async fn test_snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anchors.bin");

        {
            let table = MemoryTable::with_data_file(10, &path);
            table.ensure_ready().await.unwrap();
            table.insert(entity("0", "0", "zero")).await.unwrap();
            table.insert(entity("0", "1", "one")).await.unwrap();
            table.delete(&EntityIdentity::new("0", "0")).await.unwrap();
        }

        let reopened = MemoryTable::with_data_file(10, &path);
        reopened.ensure_ready().await.unwrap();

        assert_eq!(reopened.entity_count(), 1);
        assert_eq!(reopened.retrieve("0", "1").await.unwrap().anchor_key, "one");
        assert!(reopened.retrieve("0", "0").await.is_err());
    }

    #[tokio::test]
    async fn test_reopened_table_keeps_timestamps_increasing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("anchors.bin");

        let first_stamp = {
            let table = MemoryTable::with_data_file(10, &path);
            table.ensure_ready().await.unwrap();
            table.insert(entity("0", "0", "zero")).await.unwrap().timestamp
        };

        let reopened = MemoryTable::with_data_file(10, &path);
        reopened.ensure_ready().await.unwrap();
        let second = reopened.insert(entity("0", "1", "one")).await.unwrap();

        assert!(second.timestamp > first_stamp);
    }

    #[tokio::test]
    async fn test_failed_snapshot_write_rolls_back_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anchors.bin");
        let table = MemoryTable::with_data_file(10, &path);
        table.ensure_ready().await.unwrap();
        table.insert(entity("0", "0", "kept")).await.unwrap();

        // A directory where the temp snapshot goes makes every write fail
        let blocker = path.with_extension("tmp");
        std::fs::create_dir(&blocker).unwrap();

        let insert = table.insert(entity("0", "1", "lost")).await;
        assert!(matches!(insert, Err(TableError::Io(_))));
        assert!(matches!(
            table.retrieve("0", "1").await,
            Err(TableError::NotFound(_))
        ));

        let delete = table.delete(&EntityIdentity::new("0", "0")).await;
        assert!(matches!(delete, Err(TableError::Io(_))));
        assert_eq!(table.retrieve("0", "0").await.unwrap().anchor_key, "kept");

        // Once writes work again, the next mutation snapshots only committed rows
        std::fs::remove_dir(&blocker).unwrap();
        table.insert(entity("0", "2", "later")).await.unwrap();

        let reopened = MemoryTable::with_data_file(10, &path);
        reopened.ensure_ready().await.unwrap();
        assert_eq!(reopened.entity_count(), 2);
        assert!(reopened.retrieve("0", "1").await.is_err());
        assert_eq!(reopened.retrieve("0", "0").await.unwrap().anchor_key, "kept");
    }

    #[tokio::test]
    async fn test_ensure_ready_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anchors.bin");
        let table = MemoryTable::with_data_file(10, &path);

        table.ensure_ready().await.unwrap();
        table.insert(entity("0", "0", "zero")).await.unwrap();
        // A second load must not duplicate or clobber rows
        table.ensure_ready().await.unwrap();

        assert_eq!(table.entity_count(), 1);
    }
}
