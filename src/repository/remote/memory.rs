//! In-Memory Table Service
//!
//! Behaves like the hosted service for tests: assigns `created_at` on insert,
//! orders selects, and can be told to fail operations on a given table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::client::TableClient;
use crate::repository::error::{PersistenceError, PersistenceResult};

#[derive(Debug, Default)]
pub struct MemoryTables {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    failing_writes: Mutex<HashSet<String>>,
    failing_reads: Mutex<HashSet<String>>,
}

impl MemoryTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every insert/update/delete/upsert on `table` fail
    pub fn fail_writes_to(&self, table: &str) {
        if let Ok(mut failing) = self.failing_writes.lock() {
            failing.insert(table.to_string());
        }
    }

    /// Make every select on `table` fail
    pub fn fail_reads_of(&self, table: &str) {
        if let Ok(mut failing) = self.failing_reads.lock() {
            failing.insert(table.to_string());
        }
    }

    pub fn heal(&self) {
        if let Ok(mut failing) = self.failing_writes.lock() {
            failing.clear();
        }
        if let Ok(mut failing) = self.failing_reads.lock() {
            failing.clear();
        }
    }

    /// Raw rows of a table in storage order
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .map(|tables| tables.get(table).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    fn check(&self, set: &Mutex<HashSet<String>>, table: &str) -> PersistenceResult<()> {
        let failing = set.lock().map_err(|e| PersistenceError::Lock(e.to_string()))?;
        if failing.contains(table) {
            return Err(PersistenceError::remote(table, "service unavailable"));
        }
        Ok(())
    }

    fn with_table<T>(&self, table: &str, f: impl FnOnce(&mut Vec<Value>) -> T) -> PersistenceResult<T> {
        self.check(&self.failing_writes, table)?;
        let mut tables = self
            .tables
            .lock()
            .map_err(|e| PersistenceError::Lock(e.to_string()))?;
        Ok(f(tables.entry(table.to_string()).or_default()))
    }
}

fn row_id(row: &Value) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

fn sort_key(row: &Value, column: &str) -> Option<DateTime<Utc>> {
    row.get(column)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl TableClient for MemoryTables {
    async fn select_all(&self, table: &str, order_by: &str) -> PersistenceResult<Vec<Value>> {
        self.check(&self.failing_reads, table)?;
        let mut rows = self.rows(table);
        // stable: rows with equal keys keep insertion order
        rows.sort_by_key(|row| sort_key(row, order_by));
        Ok(rows)
    }

    async fn insert(&self, table: &str, mut row: Value) -> PersistenceResult<Value> {
        if let Some(object) = row.as_object_mut() {
            object
                .entry("created_at")
                .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
        }
        let stored = row.clone();
        self.with_table(table, |rows| rows.push(row))?;
        Ok(stored)
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> PersistenceResult<()> {
        self.with_table(table, |rows| {
            let target = rows.iter_mut().find(|row| row_id(row) == Some(id));
            if let (Some(Value::Object(target)), Value::Object(patch)) = (target, patch) {
                target.extend(patch);
            }
        })
    }

    async fn delete(&self, table: &str, id: &str) -> PersistenceResult<()> {
        self.with_table(table, |rows| rows.retain(|row| row_id(row) != Some(id)))
    }

    async fn delete_all(&self, table: &str) -> PersistenceResult<()> {
        self.with_table(table, |rows| rows.clear())
    }

    async fn upsert(&self, table: &str, new_rows: Vec<Value>) -> PersistenceResult<()> {
        self.with_table(table, |rows| {
            for new_row in new_rows {
                match rows.iter_mut().find(|row| row_id(row).is_some() && row_id(row) == row_id(&new_row)) {
                    Some(Value::Object(existing)) => {
                        if let Value::Object(fields) = new_row {
                            existing.extend(fields);
                        }
                    }
                    _ => rows.push(new_row),
                }
            }
        })
    }
}
