//! Remote Backend
//!
//! Per-row persistence against the hosted `todos` / `todo_history` tables.
//! A mutation is one write on `todos`, one insert on `todo_history`, then a
//! refresh-read of `todo_history`. The two writes are not transactional.

mod client;
mod memory;
mod rest;
mod rows;

pub use client::TableClient;
pub use memory::MemoryTables;
pub use rest::RestTableClient;
pub use rows::{HistoryRow, TodoRow};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashSet;

use super::error::{PersistenceError, PersistenceResult};
use super::traits::{Commit, TodoPersistence};
use crate::domain::{HistoryAction, HistoryEntry, Todo};

pub const TODOS_TABLE: &str = "todos";
pub const HISTORY_TABLE: &str = "todo_history";

pub struct RemoteBackend<C> {
    client: C,
}

impl<C: TableClient> RemoteBackend<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    async fn fetch<T: DeserializeOwned>(&self, table: &str) -> PersistenceResult<Vec<T>> {
        self.client
            .select_all(table, "created_at")
            .await?
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(PersistenceError::from))
            .collect()
    }

    /// Write the change described by `entry` to the `todos` table
    async fn write_todo(&self, entry: &HistoryEntry) -> PersistenceResult<()> {
        let todo = &entry.snapshot_after;
        match entry.action {
            HistoryAction::Added => {
                self.client
                    .insert(TODOS_TABLE, serde_json::to_value(TodoRow::from(todo))?)
                    .await?;
            }
            HistoryAction::Updated | HistoryAction::ToggledCompletion => {
                let patch = json!({
                    "text": todo.text,
                    "completed": todo.completed,
                    "priority": todo.priority.as_str(),
                    "updated_at": todo.updated_at,
                });
                self.client.update(TODOS_TABLE, &todo.id, patch).await?;
            }
            HistoryAction::Removed => {
                self.client.delete(TODOS_TABLE, &todo.id).await?;
            }
        }
        Ok(())
    }

    /// Make `table` hold exactly `rows`
    async fn replace_table(&self, table: &str, rows: Vec<Value>) -> PersistenceResult<()> {
        if rows.is_empty() {
            return self.client.delete_all(table).await;
        }

        let keep: HashSet<&str> = rows.iter().filter_map(|row| row.get("id")?.as_str()).collect();
        let existing = self.client.select_all(table, "created_at").await?;
        for row in &existing {
            if let Some(id) = row.get("id").and_then(Value::as_str) {
                if !keep.contains(id) {
                    self.client.delete(table, id).await?;
                }
            }
        }

        self.client.upsert(table, rows).await
    }
}

#[async_trait]
impl<C: TableClient> TodoPersistence for RemoteBackend<C> {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn load_todos(&self) -> PersistenceResult<Vec<Todo>> {
        let rows: Vec<TodoRow> = self.fetch(TODOS_TABLE).await?;
        Ok(rows.into_iter().map(Todo::from).collect())
    }

    async fn load_history(&self) -> PersistenceResult<Vec<HistoryEntry>> {
        let rows: Vec<HistoryRow> = self.fetch(HISTORY_TABLE).await?;
        Ok(rows.into_iter().map(HistoryEntry::from).collect())
    }

    async fn save_todos(&self, todos: &[Todo]) -> PersistenceResult<()> {
        let rows = todos
            .iter()
            .map(|todo| serde_json::to_value(TodoRow::from(todo)))
            .collect::<Result<Vec<_>, _>>()?;
        self.replace_table(TODOS_TABLE, rows).await
    }

    async fn save_history(&self, history: &[HistoryEntry]) -> PersistenceResult<()> {
        let rows = history
            .iter()
            .map(|entry| serde_json::to_value(HistoryRow::from(entry)))
            .collect::<Result<Vec<_>, _>>()?;
        self.replace_table(HISTORY_TABLE, rows).await
    }

    async fn commit(
        &self,
        entry: &HistoryEntry,
        _todos: &[Todo],
        _history: &[HistoryEntry],
    ) -> PersistenceResult<Commit> {
        self.write_todo(entry).await?;

        let row = serde_json::to_value(HistoryRow::from(entry))?;
        if let Err(e) = self.client.insert(HISTORY_TABLE, row).await {
            return Err(PersistenceError::PartialWrite {
                written: TODOS_TABLE.to_string(),
                failed: HISTORY_TABLE.to_string(),
                message: e.to_string(),
            });
        }

        match self.load_history().await {
            Ok(server_history) => Ok(Commit::Resynced(server_history)),
            Err(e) => {
                tracing::warn!("History refresh after {} failed, keeping local log: {}", entry.action, e);
                Ok(Commit::Saved)
            }
        }
    }
}
