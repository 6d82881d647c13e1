//! Domain Layer
//!
//! Contains the todo and history entities and the errors raised by store operations.
//! This layer has NO storage dependencies (serde and chrono only).

mod entity;
mod history;
mod todo;

pub use entity::{DomainError, DomainResult, Entity};
pub use history::{HistoryAction, HistoryEntry};
pub use todo::{Priority, Todo};
