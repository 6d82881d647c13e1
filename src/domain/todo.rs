//! Todo Entity
//!
//! Represents a single task with a completion flag and a display priority.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::entity::{DomainError, Entity};

/// Priority attached to a todo (display only, no scheduling effect)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum Priority {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::None, Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::None => "None",
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Priority::None),
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(DomainError::InvalidInput(format!("unknown priority '{}'", other))),
        }
    }
}

/// A todo item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    /// Opaque unique identifier, never changes
    pub id: String,
    /// Task text (trimmed, never empty)
    pub text: String,
    /// Completion status
    pub completed: bool,
    /// Display priority
    #[serde(default)]
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    /// Set by the first edit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Todo {
    /// Create a new pending todo. Text is taken as given; validation is the store's job.
    pub fn new(id: impl Into<String>, text: impl Into<String>, priority: Priority, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            completed: false,
            priority,
            created_at,
            updated_at: None,
        }
    }

    /// Case-insensitive substring match on the text.
    /// `needle` must already be lowercased.
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        needle.is_empty() || self.text.to_lowercase().contains(needle)
    }

    pub fn was_edited(&self) -> bool {
        self.updated_at.is_some()
    }
}

impl Entity for Todo {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
