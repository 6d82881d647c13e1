//! Repository Integration Tests
//!
//! Tests for the local backend over each key-value store and for the remote
//! backend over the in-memory table service.

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    use crate::domain::{HistoryAction, HistoryEntry, Priority, Todo};
    use crate::repository::remote::{HISTORY_TABLE, TODOS_TABLE};
    use crate::repository::{
        Commit, FileKv, KeyValueStore, LocalBackend, MemoryKv, MemoryTables, PersistenceError,
        RemoteBackend, SqliteKv, TableClient, TodoPersistence, HISTORY_KEY, TODOS_KEY,
    };
    use crate::store::TodoStore;

    fn sample() -> (Vec<Todo>, Vec<HistoryEntry>) {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let milk = Todo::new("t1", "Buy milk", Priority::High, created);
        let mut walk = Todo::new("t2", "Walk dog", Priority::None, created);
        walk.completed = true;

        let history = vec![
            HistoryEntry::added(&milk, created),
            HistoryEntry::added(&walk, created),
            HistoryEntry::toggled(&walk, created),
        ];
        (vec![milk, walk], history)
    }

    async fn assert_round_trip(backend: &dyn TodoPersistence) {
        let (todos, history) = sample();
        backend.save_todos(&todos).await.expect("save todos");
        backend.save_history(&history).await.expect("save history");

        assert_eq!(backend.load_todos().await.expect("load todos"), todos);
        assert_eq!(backend.load_history().await.expect("load history"), history);
    }

    // ========================
    // Local backend
    // ========================

    #[tokio::test]
    async fn test_local_round_trip_memory() {
        assert_round_trip(&LocalBackend::new(MemoryKv::new())).await;
    }

    #[tokio::test]
    async fn test_local_round_trip_files() {
        let dir = TempDir::new().unwrap();
        assert_round_trip(&LocalBackend::new(FileKv::open(dir.path()).unwrap())).await;

        // a second handle on the same directory sees the data
        let reopened = LocalBackend::new(FileKv::open(dir.path()).unwrap());
        assert_eq!(reopened.load_todos().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_local_round_trip_sqlite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("ledger.db");
        assert_round_trip(&LocalBackend::new(SqliteKv::open(&path).unwrap())).await;

        let reopened = LocalBackend::new(SqliteKv::open(&path).unwrap());
        assert_eq!(reopened.load_history().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_local_empty_store_loads_empty() {
        let backend = LocalBackend::new(SqliteKv::open_in_memory().unwrap());
        assert!(backend.load_todos().await.unwrap().is_empty());
        assert!(backend.load_history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_local_commit_rewrites_both_blobs() {
        let backend = LocalBackend::new(MemoryKv::new());
        let (todos, history) = sample();

        let commit = backend.commit(&history[2], &todos, &history).await.unwrap();
        assert_eq!(commit, Commit::Saved);

        let stored = backend.store().get(TODOS_KEY).unwrap().unwrap();
        assert!(stored.contains("\"schema_version\":1"));
        assert!(backend.store().get(HISTORY_KEY).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_local_loads_legacy_blobs() {
        let kv = MemoryKv::new();
        kv.set(
            TODOS_KEY,
            r#"[{"id": 1700000000000, "text": "Old todo", "completed": false}]"#,
        )
        .unwrap();
        kv.set(
            HISTORY_KEY,
            r#"[
                {"action": "Added", "timeStamp": "2023-11-14 22:13:20",
                 "todo": {"id": "1700000000000", "text": "Old todo"}},
                {"action": "Updated", "timeStamp": 1700000100000,
                 "todo": {"id": "1700000000000", "text": "New todo", "priority": "High"},
                 "previousTodo": {"id": "1700000000000", "text": "Old todo"}}
            ]"#,
        )
        .unwrap();
        let backend = LocalBackend::new(kv);

        let todos = backend.load_todos().await.unwrap();
        assert_eq!(todos[0].id, "1700000000000");
        assert_eq!(todos[0].priority, Priority::None);
        assert_eq!(todos[0].created_at.timestamp_millis(), 1_700_000_000_000);

        let history = backend.load_history().await.unwrap();
        assert_eq!(history[0].action, HistoryAction::Added);
        assert_eq!(history[1].text_change(), Some(("Old todo", "New todo")));
        assert_eq!(history[1].priority_change(), Some((Priority::None, Priority::High)));

        // the next save writes the current schema
        backend.save_history(&history).await.unwrap();
        assert!(backend.store().get(HISTORY_KEY).unwrap().unwrap().starts_with("{"));
    }

    #[tokio::test]
    async fn test_legacy_blob_hydrates_without_blank_or_repeated_todos() {
        let kv = MemoryKv::new();
        kv.set(TODOS_KEY, r#"[{"id": "1", "text": "  "}, {"id": "1", "text": "x"}]"#)
            .unwrap();
        let backend = Arc::new(LocalBackend::new(kv));

        let mut store = TodoStore::hydrate(backend).await.unwrap();
        assert_eq!(store.todos().len(), 1);
        assert_eq!(store.todos()[0].text, "x");

        store.remove("1").await.unwrap();
        assert!(store.get("1").is_none());
    }

    #[tokio::test]
    async fn test_local_rejects_newer_schema() {
        let kv = MemoryKv::new();
        kv.set(TODOS_KEY, r#"{"schema_version": 99, "items": []}"#).unwrap();
        let backend = LocalBackend::new(kv);

        let err = backend.load_todos().await.unwrap_err();
        assert!(matches!(err, PersistenceError::UnsupportedSchema { found: 99, .. }));
    }

    #[tokio::test]
    async fn test_local_corrupt_blob_is_error() {
        let kv = MemoryKv::new();
        kv.set(HISTORY_KEY, "{not json").unwrap();
        let backend = LocalBackend::new(kv);

        assert!(matches!(
            backend.load_history().await,
            Err(PersistenceError::Serialization(_))
        ));
    }

    // ========================
    // Remote backend
    // ========================

    #[tokio::test]
    async fn test_remote_round_trip() {
        let backend = RemoteBackend::new(MemoryTables::new());
        let (todos, _) = sample();
        backend.save_todos(&todos).await.unwrap();

        assert_eq!(backend.load_todos().await.unwrap(), todos);
    }

    #[tokio::test]
    async fn test_remote_save_todos_drops_missing_rows() {
        let backend = RemoteBackend::new(MemoryTables::new());
        let (todos, _) = sample();
        backend.save_todos(&todos).await.unwrap();
        backend.save_todos(&todos[..1]).await.unwrap();

        let rows = backend.client().rows(TODOS_TABLE);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "t1");

        backend.save_todos(&[]).await.unwrap();
        assert!(backend.client().rows(TODOS_TABLE).is_empty());
    }

    #[tokio::test]
    async fn test_remote_commit_resyncs_history() {
        let backend = RemoteBackend::new(MemoryTables::new());
        let (todos, history) = sample();

        let commit = backend.commit(&history[0], &todos[..1], &history[..1]).await.unwrap();
        match commit {
            Commit::Resynced(entries) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].id, history[0].id);
                assert_eq!(entries[0].action, HistoryAction::Added);
                assert!(entries[0].recorded_at.is_some());
            }
            Commit::Saved => panic!("expected a resync"),
        }
        assert_eq!(backend.client().rows(TODOS_TABLE)[0]["text"], "Buy milk");
    }

    #[tokio::test]
    async fn test_remote_commit_partial_write() {
        let backend = RemoteBackend::new(MemoryTables::new());
        backend.client().fail_writes_to(HISTORY_TABLE);
        let (todos, history) = sample();

        let err = backend.commit(&history[0], &todos[..1], &history[..1]).await.unwrap_err();
        match err {
            PersistenceError::PartialWrite { written, failed, .. } => {
                assert_eq!(written, TODOS_TABLE);
                assert_eq!(failed, HISTORY_TABLE);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(backend.client().rows(TODOS_TABLE).len(), 1);
    }

    #[tokio::test]
    async fn test_remote_tolerates_sparse_rows() {
        let tables = MemoryTables::new();
        tables
            .insert(TODOS_TABLE, json!({"id": "x", "text": "Sparse", "priority": null}))
            .await
            .unwrap();
        tables
            .insert(
                HISTORY_TABLE,
                json!({"id": "h", "todo_id": "x", "action": "Toggled Completion",
                       "completed": true, "timeStamp": "2024-03-01T09:00:00Z"}),
            )
            .await
            .unwrap();
        let backend = RemoteBackend::new(tables);

        let todos = backend.load_todos().await.unwrap();
        assert_eq!(todos[0].priority, Priority::None);

        let history = backend.load_history().await.unwrap();
        assert_eq!(history[0].action, HistoryAction::ToggledCompletion);
        assert!(history[0].snapshot_after.completed);
    }

    #[tokio::test]
    async fn test_remote_clear_history() {
        let backend = RemoteBackend::new(MemoryTables::new());
        let (_, history) = sample();
        backend.save_history(&history).await.unwrap();
        assert_eq!(backend.client().rows(HISTORY_TABLE).len(), 3);

        backend.save_history(&[]).await.unwrap();
        assert!(backend.load_history().await.unwrap().is_empty());
    }
}
