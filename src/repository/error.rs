//! Persistence Errors
//!
//! Raised by durable-store reads and writes. By the time a write error is seen
//! the in-memory change has already happened.

use thiserror::Error;

pub type PersistenceResult<T> = Result<T, PersistenceError>;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Remote table service failure (transport, status code or payload)
    #[error("Remote error on '{table}': {message}")]
    Remote { table: String, message: String },

    /// The `todos` write went through but the `todo_history` insert did not.
    /// Nothing reconciles the two tables afterwards.
    #[error("Partial write: '{written}' was written but '{failed}' failed: {message}")]
    PartialWrite {
        written: String,
        failed: String,
        message: String,
    },

    #[error("Unsupported schema version {found} for '{key}' (latest known is {supported})")]
    UnsupportedSchema { key: String, found: u32, supported: u32 },

    #[error("Lock poisoned: {0}")]
    Lock(String),
}

impl PersistenceError {
    pub fn remote(table: impl Into<String>, message: impl ToString) -> Self {
        PersistenceError::Remote {
            table: table.into(),
            message: message.to_string(),
        }
    }

    pub fn is_partial_write(&self) -> bool {
        matches!(self, PersistenceError::PartialWrite { .. })
    }
}

impl From<reqwest::Error> for PersistenceError {
    fn from(e: reqwest::Error) -> Self {
        let table = e
            .url()
            .and_then(|url| url.path_segments())
            .and_then(|segments| segments.last().map(str::to_string))
            .unwrap_or_default();
        PersistenceError::Remote {
            table,
            message: e.to_string(),
        }
    }
}
