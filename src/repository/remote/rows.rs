//! Remote Table Rows
//!
//! Row shapes of the `todos` and `todo_history` tables and their mapping to
//! domain entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{HistoryAction, HistoryEntry, Priority, Todo};

/// Row of `todos(id, text, completed, priority, created_at, updated_at?)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoRow {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Todo> for TodoRow {
    fn from(todo: &Todo) -> Self {
        Self {
            id: todo.id.clone(),
            text: todo.text.clone(),
            completed: todo.completed,
            priority: Some(todo.priority.as_str().to_string()),
            created_at: Some(todo.created_at),
            updated_at: todo.updated_at,
        }
    }
}

impl From<TodoRow> for Todo {
    fn from(row: TodoRow) -> Self {
        Todo {
            id: row.id,
            text: row.text,
            completed: row.completed,
            priority: parse_priority(row.priority.as_deref()),
            created_at: row.created_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            updated_at: row.updated_at,
        }
    }
}

/// Row of `todo_history`
///
/// Only the changed fields are stored, so snapshots rebuilt from a row are
/// partial: creation time falls back to the entry timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub id: String,
    pub todo_id: String,
    pub action: String,
    #[serde(default)]
    pub previous_text: Option<String>,
    #[serde(default)]
    pub new_text: Option<String>,
    #[serde(default)]
    pub previous_priority: Option<String>,
    #[serde(default)]
    pub new_priority: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(rename = "timeStamp")]
    pub time_stamp: DateTime<Utc>,
    /// Server-assigned; never sent on insert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&HistoryEntry> for HistoryRow {
    fn from(entry: &HistoryEntry) -> Self {
        let before = entry.snapshot_before.as_ref();
        Self {
            id: entry.id.clone(),
            todo_id: entry.subject_id.clone(),
            action: entry.action.as_str().to_string(),
            previous_text: before.map(|t| t.text.clone()),
            new_text: Some(entry.snapshot_after.text.clone()),
            previous_priority: before.map(|t| t.priority.as_str().to_string()),
            new_priority: Some(entry.snapshot_after.priority.as_str().to_string()),
            completed: Some(entry.snapshot_after.completed),
            time_stamp: entry.timestamp,
            created_at: None,
        }
    }
}

impl From<HistoryRow> for HistoryEntry {
    fn from(row: HistoryRow) -> Self {
        let action = HistoryAction::parse_lenient(&row.action).unwrap_or(if row.previous_text.is_some() {
            HistoryAction::Updated
        } else {
            HistoryAction::Added
        });

        let completed = row.completed.unwrap_or(false);
        let after = Todo {
            id: row.todo_id.clone(),
            text: row
                .new_text
                .clone()
                .or_else(|| row.previous_text.clone())
                .unwrap_or_default(),
            completed,
            priority: parse_priority(row.new_priority.as_deref()),
            created_at: row.time_stamp,
            updated_at: (action == HistoryAction::Updated).then_some(row.time_stamp),
        };

        let before = (action == HistoryAction::Updated).then(|| Todo {
            id: row.todo_id.clone(),
            text: row.previous_text.clone().unwrap_or_else(|| after.text.clone()),
            completed,
            priority: parse_priority(row.previous_priority.as_deref()),
            created_at: row.time_stamp,
            updated_at: None,
        });

        HistoryEntry {
            id: row.id,
            action,
            timestamp: row.time_stamp,
            subject_id: row.todo_id,
            snapshot_after: after,
            snapshot_before: before,
            recorded_at: row.created_at,
        }
    }
}

fn parse_priority(raw: Option<&str>) -> Priority {
    raw.and_then(|p| p.parse().ok()).unwrap_or_default()
}
