//! Todo Store
//!
//! Explicit state container holding the todo collection, the history log and
//! the current search query. Every mutation is applied in memory first, then
//! handed to the persistence backend; the result tells the caller whether the
//! change also became durable.

mod history_log;
mod query;


pub use history_log::HistoryLog;
pub use query::{StatusFilter, TodoQuery};

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;

use crate::domain::{DomainError, DomainResult, Entity, HistoryEntry, Priority, Todo};
use crate::repository::{Backup, Commit, PersistenceError, PersistenceResult, TodoPersistence};

/// Durability of a change that has been applied in memory
#[derive(Debug)]
pub enum SyncStatus {
    Persisted,
    /// The backend rejected the write; memory and storage now differ
    Unpersisted(PersistenceError),
}

/// Outcome of a successful mutation
#[derive(Debug)]
pub struct Applied<T> {
    pub value: T,
    pub sync: SyncStatus,
}

impl<T> Applied<T> {
    pub fn is_persisted(&self) -> bool {
        matches!(self.sync, SyncStatus::Persisted)
    }

    pub fn persistence_error(&self) -> Option<&PersistenceError> {
        match &self.sync {
            SyncStatus::Persisted => None,
            SyncStatus::Unpersisted(e) => Some(e),
        }
    }

    /// Treat a persistence failure as an error (the in-memory change stays applied)
    pub fn into_durable(self) -> PersistenceResult<T> {
        match self.sync {
            SyncStatus::Persisted => Ok(self.value),
            SyncStatus::Unpersisted(e) => Err(e),
        }
    }
}

/// Snapshot published to subscribers after every state change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreView {
    /// Increments on every change
    pub revision: u64,
    pub todos: Vec<Todo>,
    pub history: Vec<HistoryEntry>,
    pub search_query: String,
}

pub struct TodoStore {
    todos: Vec<Todo>,
    history: HistoryLog,
    search_query: String,
    revision: u64,
    backend: Arc<dyn TodoPersistence>,
    view_tx: watch::Sender<StoreView>,
}

impl TodoStore {
    /// Empty store on top of `backend`
    pub fn new(backend: Arc<dyn TodoPersistence>) -> Self {
        Self::with_state(backend, Vec::new(), HistoryLog::new())
    }

    /// Load the collection and the log from `backend`
    pub async fn hydrate(backend: Arc<dyn TodoPersistence>) -> PersistenceResult<Self> {
        let todos = backend.load_todos().await?;
        let history = backend.load_history().await?;
        tracing::info!(
            "Hydrated {} todos and {} history entries from {} backend",
            todos.len(),
            history.len(),
            backend.name()
        );
        Ok(Self::with_state(backend, todos, HistoryLog::from_entries(history)))
    }

    fn with_state(backend: Arc<dyn TodoPersistence>, todos: Vec<Todo>, history: HistoryLog) -> Self {
        let view = StoreView {
            revision: 0,
            todos: todos.clone(),
            history: history.entries().to_vec(),
            search_query: String::new(),
        };
        let (view_tx, _) = watch::channel(view);
        Self {
            todos,
            history,
            search_query: String::new(),
            revision: 0,
            backend,
            view_tx,
        }
    }

    // ========================
    // Mutations
    // ========================

    /// Create a todo from non-blank text
    pub async fn add(&mut self, text: &str, priority: Priority) -> DomainResult<Applied<Todo>> {
        let text = validate_text(text)?;

        let todo = Todo::new(self.fresh_id(), text, priority, Utc::now());
        self.todos.push(todo.clone());
        tracing::debug!("Added todo {}", todo.id);

        let sync = self.record(HistoryEntry::added(&todo, todo.created_at)).await;
        Ok(Applied { value: todo, sync })
    }

    /// Replace the text and priority of an existing todo
    pub async fn edit(&mut self, id: &str, new_text: &str, new_priority: Priority) -> DomainResult<Applied<Todo>> {
        let index = self.position(id)?;
        let text = validate_text(new_text)?;

        let now = Utc::now();
        let before = self.todos[index].clone();
        let todo = &mut self.todos[index];
        todo.text = text;
        todo.priority = new_priority;
        todo.updated_at = Some(now);
        let after = todo.clone();
        tracing::debug!("Edited todo {}", id);

        let sync = self.record(HistoryEntry::updated(&before, &after, now)).await;
        Ok(Applied { value: after, sync })
    }

    /// Flip the completion flag
    pub async fn toggle_complete(&mut self, id: &str) -> DomainResult<Applied<Todo>> {
        let index = self.position(id)?;

        let todo = &mut self.todos[index];
        todo.completed = !todo.completed;
        let after = todo.clone();
        tracing::debug!("Toggled todo {} to completed={}", id, after.completed);

        let sync = self.record(HistoryEntry::toggled(&after, Utc::now())).await;
        Ok(Applied { value: after, sync })
    }

    /// Delete a todo, returning it
    pub async fn remove(&mut self, id: &str) -> DomainResult<Applied<Todo>> {
        let index = self.position(id)?;

        let removed = self.todos.remove(index);
        tracing::debug!("Removed todo {}", id);

        let sync = self.record(HistoryEntry::removed(&removed, Utc::now())).await;
        Ok(Applied { value: removed, sync })
    }

    /// Empty the history log (the collection is untouched). Returns the cleared count.
    pub async fn reset_history(&mut self) -> Applied<usize> {
        let cleared = self.history.reset();
        self.publish();
        tracing::debug!("Reset history ({} entries)", cleared);

        let sync = match self.backend.save_history(&[]).await {
            Ok(()) => SyncStatus::Persisted,
            Err(e) => self.unpersisted("reset history", e),
        };
        Applied { value: cleared, sync }
    }

    /// Replace collection and log wholesale. No history entry is written.
    ///
    /// A backup with blank text or duplicate ids is rejected before anything changes.
    pub async fn restore(&mut self, backup: Backup) -> DomainResult<Applied<usize>> {
        check_collection(&backup.todos)?;

        self.todos = backup.todos;
        self.history = HistoryLog::from_entries(backup.history);
        self.publish();

        let sync = match self.save_all().await {
            Ok(()) => SyncStatus::Persisted,
            Err(e) => self.unpersisted("restore", e),
        };
        Ok(Applied {
            value: self.todos.len(),
            sync,
        })
    }

    /// Set the search text used by `list`. Not persisted, not recorded.
    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
        self.publish();
    }

    // ========================
    // Reads
    // ========================

    /// Todos matching the search query and `filter`, in insertion order
    pub fn list(&self, filter: StatusFilter) -> TodoQuery<'_> {
        TodoQuery::new(&self.todos, &self.search_query, filter)
    }

    /// History, most recent first
    pub fn history(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> + Clone + '_ {
        self.history.iter_recent()
    }

    pub fn history_log(&self) -> &HistoryLog {
        &self.history
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn get(&self, id: &str) -> Option<&Todo> {
        self.todos.iter().find(|todo| todo.id() == id)
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Current view; the receiver is notified on every change
    pub fn subscribe(&self) -> watch::Receiver<StoreView> {
        self.view_tx.subscribe()
    }

    pub fn view(&self) -> StoreView {
        self.view_tx.borrow().clone()
    }

    pub fn backup(&self) -> Backup {
        Backup::new(self.todos.clone(), self.history.entries().to_vec())
    }

    // ========================
    // Internals
    // ========================

    fn position(&self, id: &str) -> DomainResult<usize> {
        self.todos
            .iter()
            .position(|todo| todo.id() == id)
            .ok_or_else(|| DomainError::todo_not_found(id))
    }

    fn fresh_id(&self) -> String {
        loop {
            let id = uuid::Uuid::new_v4().to_string();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    /// Append the entry, publish, then persist
    async fn record(&mut self, entry: HistoryEntry) -> SyncStatus {
        self.history.append(entry.clone());
        self.publish();

        let result = self
            .backend
            .commit(&entry, &self.todos, self.history.entries())
            .await;

        match result {
            Ok(Commit::Saved) => SyncStatus::Persisted,
            Ok(Commit::Resynced(server_history)) => {
                self.history.resync(server_history);
                self.publish();
                SyncStatus::Persisted
            }
            Err(e) => self.unpersisted(entry.action.label(), e),
        }
    }

    async fn save_all(&self) -> PersistenceResult<()> {
        self.backend.save_todos(&self.todos).await?;
        self.backend.save_history(self.history.entries()).await
    }

    fn unpersisted(&self, operation: &str, e: PersistenceError) -> SyncStatus {
        tracing::warn!(
            "{} applied in memory but not persisted to {} backend: {}",
            operation,
            self.backend.name(),
            e
        );
        SyncStatus::Unpersisted(e)
    }

    fn publish(&mut self) {
        self.revision += 1;
        let view = StoreView {
            revision: self.revision,
            todos: self.todos.clone(),
            history: self.history.entries().to_vec(),
            search_query: self.search_query.clone(),
        };
        self.view_tx.send_replace(view);
    }
}

fn check_collection(todos: &[Todo]) -> DomainResult<()> {
    let mut seen = HashSet::with_capacity(todos.len());
    for todo in todos {
        if todo.text.trim().is_empty() {
            return Err(DomainError::InvalidInput(format!("todo '{}' has empty text", todo.id)));
        }
        if !seen.insert(todo.id()) {
            return Err(DomainError::InvalidInput(format!("duplicate todo id '{}'", todo.id)));
        }
    }
    Ok(())
}

fn validate_text(text: &str) -> DomainResult<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DomainError::InvalidInput("todo text cannot be empty".to_string()));
    }
    Ok(trimmed.to_string())
}
