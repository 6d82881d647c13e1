//! Repository Layer - Core Traits
//!
//! Defines the abstract persistence interface used by the todo store.
//! Implementations can use a key-value store, a remote table service, etc.

use async_trait::async_trait;

use super::error::PersistenceResult;
use crate::domain::{HistoryEntry, Todo};

/// Backend acknowledgement of a committed mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit {
    /// The change is durable; local bookkeeping stays authoritative
    Saved,
    /// The change is durable and the backend returned its own copy of the log
    Resynced(Vec<HistoryEntry>),
}

/// Persistence contract shared by every backend
///
/// All operations are async to support remote services.
#[async_trait]
pub trait TodoPersistence: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Load the whole todo collection
    async fn load_todos(&self) -> PersistenceResult<Vec<Todo>>;

    /// Load the whole history log in chronological order
    async fn load_history(&self) -> PersistenceResult<Vec<HistoryEntry>>;

    /// Replace the stored collection
    async fn save_todos(&self, todos: &[Todo]) -> PersistenceResult<()>;

    /// Replace the stored history log
    async fn save_history(&self, history: &[HistoryEntry]) -> PersistenceResult<()>;

    /// Durably record one mutation.
    ///
    /// `todos` and `history` are the in-memory state after the change, with
    /// `entry` already appended to `history`. The default rewrites both wholesale.
    async fn commit(
        &self,
        _entry: &HistoryEntry,
        todos: &[Todo],
        history: &[HistoryEntry],
    ) -> PersistenceResult<Commit> {
        self.save_todos(todos).await?;
        self.save_history(history).await?;
        Ok(Commit::Saved)
    }
}
