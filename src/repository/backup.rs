//! JSON Backup
//!
//! Whole-state export used to move a list between backends or keep a copy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::error::PersistenceResult;
use crate::domain::{HistoryEntry, Todo};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    pub exported_at: DateTime<Utc>,
    pub todos: Vec<Todo>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl Backup {
    pub fn new(todos: Vec<Todo>, history: Vec<HistoryEntry>) -> Self {
        Self {
            exported_at: Utc::now(),
            todos,
            history,
        }
    }

    pub fn write_to(&self, path: &Path) -> PersistenceResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> PersistenceResult<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Priority;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("backup.json");

        let todo = Todo::new("a", "A", Priority::Low, Utc::now());
        let backup = Backup::new(vec![todo.clone()], vec![HistoryEntry::added(&todo, Utc::now())]);
        backup.write_to(&path).unwrap();

        assert_eq!(Backup::read_from(&path).unwrap(), backup);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = Backup::read_from(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, crate::repository::PersistenceError::Io(_)));
    }
}
