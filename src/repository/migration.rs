//! Stored Blob Schema and Legacy Normalization
//!
//! Local blobs are written as `{"schema_version": N, "items": [...]}`.
//! Earlier revisions wrote bare JSON arrays with camelCase fields, optional
//! priority and free-form history actions; those are normalized on load.

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use super::error::{PersistenceError, PersistenceResult};
use crate::domain::{HistoryAction, HistoryEntry, Priority, Todo};

/// Current schema version of local blobs
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    schema_version: u32,
    items: &'a [T],
}

/// Either shape a blob can take on disk
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredBlob {
    Versioned { schema_version: u32, items: Value },
    Legacy(Vec<Value>),
}

/// Fields as written by the first revisions (no version tag)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyTodo {
    id: Value,
    text: String,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default, alias = "created_at")]
    created_at: Option<Value>,
    #[serde(default, alias = "updated_at")]
    updated_at: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyHistory {
    action: String,
    #[serde(default, alias = "timestamp")]
    time_stamp: Option<Value>,
    todo: LegacyTodo,
    #[serde(default)]
    previous_todo: Option<LegacyTodo>,
}

pub fn encode_todos(todos: &[Todo]) -> PersistenceResult<String> {
    encode(todos)
}

pub fn encode_history(history: &[HistoryEntry]) -> PersistenceResult<String> {
    encode(history)
}

fn encode<T: Serialize>(items: &[T]) -> PersistenceResult<String> {
    Ok(serde_json::to_string(&EnvelopeRef {
        schema_version: SCHEMA_VERSION,
        items,
    })?)
}

/// Decode a todo blob. Todos with blank text are dropped and repeated ids
/// keep only their first occurrence.
pub fn decode_todos(key: &str, raw: &str) -> PersistenceResult<Vec<Todo>> {
    let todos = decode(key, raw, |value| {
        let legacy: LegacyTodo = serde_json::from_value(value)?;
        Ok(normalize_todo(legacy))
    })?;
    Ok(dedupe_todos(key, todos))
}

fn dedupe_todos(key: &str, todos: Vec<Todo>) -> Vec<Todo> {
    let mut seen = HashSet::with_capacity(todos.len());
    let total = todos.len();
    let kept: Vec<Todo> = todos
        .into_iter()
        .filter(|todo| !todo.text.trim().is_empty() && seen.insert(todo.id.clone()))
        .collect();

    if kept.len() < total {
        tracing::warn!(
            "Dropped {} todos with blank text or repeated ids from '{}'",
            total - kept.len(),
            key
        );
    }
    kept
}

pub fn decode_history(key: &str, raw: &str) -> PersistenceResult<Vec<HistoryEntry>> {
    decode(key, raw, |value| {
        let legacy: LegacyHistory = serde_json::from_value(value)?;
        Ok(normalize_history(legacy))
    })
}

fn decode<T, F>(key: &str, raw: &str, legacy: F) -> PersistenceResult<Vec<T>>
where
    T: DeserializeOwned,
    F: Fn(Value) -> PersistenceResult<T>,
{
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str::<StoredBlob>(raw)? {
        StoredBlob::Versioned { schema_version, items } => {
            if schema_version > SCHEMA_VERSION {
                return Err(PersistenceError::UnsupportedSchema {
                    key: key.to_string(),
                    found: schema_version,
                    supported: SCHEMA_VERSION,
                });
            }
            Ok(serde_json::from_value(items)?)
        }
        StoredBlob::Legacy(values) => {
            tracing::info!("Migrating {} legacy records in '{}'", values.len(), key);
            values.into_iter().map(legacy).collect()
        }
    }
}

fn normalize_todo(legacy: LegacyTodo) -> Todo {
    let id = match legacy.id {
        Value::String(s) => s,
        other => other.to_string(),
    };

    let priority = legacy
        .priority
        .as_deref()
        .and_then(|p| p.parse::<Priority>().ok())
        .unwrap_or_default();

    // Early ids were millisecond timestamps, which is the best creation time we have.
    let created_at = legacy
        .created_at
        .as_ref()
        .and_then(parse_timestamp)
        .or_else(|| id.parse::<i64>().ok().and_then(millis_to_datetime))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    Todo {
        id,
        text: legacy.text.trim().to_string(),
        completed: legacy.completed,
        priority,
        created_at,
        updated_at: legacy.updated_at.as_ref().and_then(parse_timestamp),
    }
}

fn normalize_history(legacy: LegacyHistory) -> HistoryEntry {
    let after = normalize_todo(legacy.todo);
    let before = legacy.previous_todo.map(normalize_todo);

    let action = HistoryAction::parse_lenient(&legacy.action).unwrap_or(if before.is_some() {
        HistoryAction::Updated
    } else {
        HistoryAction::Added
    });

    let timestamp = legacy
        .time_stamp
        .as_ref()
        .and_then(parse_timestamp)
        .unwrap_or(after.created_at);

    let mut entry = HistoryEntry::new(action, &after, timestamp);
    if action == HistoryAction::Updated {
        entry.snapshot_before = before;
    }
    entry
}

/// Accepts RFC 3339 strings, plain `YYYY-MM-DD HH:MM:SS` and epoch milliseconds
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
            .or_else(|| s.parse::<i64>().ok().and_then(millis_to_datetime)),
        Value::Number(n) => n.as_i64().and_then(millis_to_datetime),
        _ => None,
    }
}

fn millis_to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    // Anything before 2000 is not a plausible creation time
    if ms < 946_684_800_000 {
        return None;
    }
    Utc.timestamp_millis_opt(ms).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_todos_are_normalized() {
        let raw = r#"[
            {"id": "1700000000000", "text": " Buy milk ", "completed": true},
            {"id": "abc", "text": "Call", "completed": false, "priority": "High",
             "createdAt": "2024-03-01T10:00:00.000Z", "updatedAt": "2024-03-02T10:00:00Z"}
        ]"#;

        let todos = decode_todos("todos", raw).unwrap();
        assert_eq!(todos.len(), 2);

        assert_eq!(todos[0].text, "Buy milk");
        assert_eq!(todos[0].priority, Priority::None);
        assert_eq!(todos[0].created_at.timestamp_millis(), 1_700_000_000_000);
        assert!(todos[0].completed);

        assert_eq!(todos[1].priority, Priority::High);
        assert_eq!(todos[1].created_at.to_rfc3339(), "2024-03-01T10:00:00+00:00");
        assert!(todos[1].updated_at.is_some());
    }

    #[test]
    fn test_blank_and_repeated_todos_are_dropped() {
        let raw = r#"[{"id": "1", "text": "  "}, {"id": "1", "text": "x"}, {"id": "2", "text": "y"}, {"id": "2", "text": "z"}]"#;
        let todos = decode_todos("todos", raw).unwrap();
        let pairs: Vec<_> = todos.iter().map(|t| (t.id.as_str(), t.text.as_str())).collect();
        assert_eq!(pairs, vec![("1", "x"), ("2", "y")]);

        let mut blank = Todo::new("a", "A", Priority::None, Utc::now());
        blank.text = String::new();
        let versioned = encode_todos(&[blank, Todo::new("b", "B", Priority::None, Utc::now())]).unwrap();
        let todos = decode_todos("todos", &versioned).unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].id, "b");
    }

    #[test]
    fn test_legacy_numeric_id_and_unknown_time() {
        let raw = r#"[{"id": 42, "text": "x", "createdAt": "3/1/2024, 10:00:00 AM"}]"#;
        let todos = decode_todos("todos", raw).unwrap();
        assert_eq!(todos[0].id, "42");
        assert_eq!(todos[0].created_at, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_legacy_history_is_normalized() {
        let raw = r#"[
            {"action": "Added", "timeStamp": "2024-03-01T10:00:00Z",
             "todo": {"id": "a", "text": "A", "completed": false}},
            {"action": "Edited", "timeStamp": "2024-03-01T11:00:00Z",
             "todo": {"id": "a", "text": "B", "completed": false, "priority": "Low"},
             "previousTodo": {"id": "a", "text": "A", "completed": false}}
        ]"#;

        let history = decode_history("history", raw).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].action, HistoryAction::Added);
        assert!(history[0].snapshot_before.is_none());
        assert_eq!(history[1].action, HistoryAction::Updated);
        assert_eq!(history[1].subject_id, "a");
        assert_eq!(history[1].text_change(), Some(("A", "B")));
        assert_ne!(history[0].id, history[1].id);
    }

    #[test]
    fn test_versioned_blob_round_trip() {
        let todos = vec![Todo::new("a", "A", Priority::Medium, Utc::now())];
        let raw = encode_todos(&todos).unwrap();
        assert!(raw.starts_with(r#"{"schema_version":1"#));
        assert_eq!(decode_todos("todos", &raw).unwrap(), todos);
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let raw = r#"{"schema_version": 99, "items": []}"#;
        let err = decode_todos("todos", raw).unwrap_err();
        assert!(matches!(err, PersistenceError::UnsupportedSchema { found: 99, .. }));
    }

    #[test]
    fn test_empty_blob_is_empty_collection() {
        assert!(decode_history("history", "").unwrap().is_empty());
        assert!(decode_history("history", "[]").unwrap().is_empty());
    }
}
