//! Todo Ledger
//!
//! Layered architecture:
//! - domain: Todo and history entities, domain errors
//! - store: in-memory state container, history log and query view
//! - repository: persistence contract and its local/remote implementations
//! - config: backend selection

pub mod config;
pub mod domain;
pub mod repository;
pub mod store;

pub use domain::{
    DomainError, DomainResult, Entity, HistoryAction, HistoryEntry, Priority, Todo,
};
pub use repository::{Commit, PersistenceError, PersistenceResult, TodoPersistence};
pub use store::{Applied, StatusFilter, StoreView, SyncStatus, TodoStore};
