//! Domain Layer - Core Entity Trait
//!
//! This trait defines the basic contract for all domain entities.
//! All entities must have a unique ID and be thread-safe.

use thiserror::Error;

/// Core trait for all domain entities
pub trait Entity: Sized + Send + Sync + Clone {
    /// The type of the entity's unique identifier
    type Id: Clone + Eq + std::hash::Hash + Send + Sync;

    /// Returns the entity's unique identifier
    fn id(&self) -> &Self::Id;
}

/// Common result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level errors
///
/// Both variants are raised before any state change happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The operation targets an id that is not in the collection
    #[error("Not found: {0}")]
    NotFound(String),
    /// Empty or otherwise invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl DomainError {
    pub fn todo_not_found(id: &str) -> Self {
        DomainError::NotFound(format!("todo '{}'", id))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DomainError::NotFound(_))
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, DomainError::InvalidInput(_))
    }
}
