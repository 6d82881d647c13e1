//! History Entry Entity
//!
//! Immutable audit record describing one mutation applied to a todo.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::entity::Entity;
use super::todo::{Priority, Todo};

/// Kind of mutation recorded by a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryAction {
    Added,
    Updated,
    ToggledCompletion,
    Removed,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Added => "Added",
            HistoryAction::Updated => "Updated",
            HistoryAction::ToggledCompletion => "ToggledCompletion",
            HistoryAction::Removed => "Removed",
        }
    }

    /// Human-facing label
    pub fn label(&self) -> &'static str {
        match self {
            HistoryAction::ToggledCompletion => "Toggled Completion",
            other => other.as_str(),
        }
    }

    /// Lenient parse used for stored and remote data.
    pub fn parse_lenient(s: &str) -> Option<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "added" | "add" | "created" => Some(HistoryAction::Added),
            "updated" | "update" | "edited" | "edit" => Some(HistoryAction::Updated),
            "toggledcompletion" | "toggled" | "toggle" | "completed" | "togglecomplete" => {
                Some(HistoryAction::ToggledCompletion)
            }
            "removed" | "remove" | "deleted" | "delete" => Some(HistoryAction::Removed),
            _ => None,
        }
    }
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One entry of the history log
///
/// Snapshots are owned copies, so later changes to the live todo never reach them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub action: HistoryAction,
    pub timestamp: DateTime<Utc>,
    /// Id of the todo this entry is about (the todo may no longer exist)
    pub subject_id: String,
    pub snapshot_after: Todo,
    /// Only present for `Updated`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_before: Option<Todo>,
    /// Assigned by the remote table on insert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl HistoryEntry {
    pub fn new(action: HistoryAction, after: &Todo, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            action,
            timestamp,
            subject_id: after.id.clone(),
            snapshot_after: after.clone(),
            snapshot_before: None,
            recorded_at: None,
        }
    }

    pub fn added(todo: &Todo, at: DateTime<Utc>) -> Self {
        Self::new(HistoryAction::Added, todo, at)
    }

    pub fn updated(before: &Todo, after: &Todo, at: DateTime<Utc>) -> Self {
        let mut entry = Self::new(HistoryAction::Updated, after, at);
        entry.snapshot_before = Some(before.clone());
        entry
    }

    pub fn toggled(todo: &Todo, at: DateTime<Utc>) -> Self {
        Self::new(HistoryAction::ToggledCompletion, todo, at)
    }

    pub fn removed(todo: &Todo, at: DateTime<Utc>) -> Self {
        Self::new(HistoryAction::Removed, todo, at)
    }

    /// `(before, after)` text when an update changed it
    pub fn text_change(&self) -> Option<(&str, &str)> {
        let before = self.snapshot_before.as_ref()?;
        (before.text != self.snapshot_after.text)
            .then(|| (before.text.as_str(), self.snapshot_after.text.as_str()))
    }

    /// `(before, after)` priority when an update changed it
    pub fn priority_change(&self) -> Option<(Priority, Priority)> {
        let before = self.snapshot_before.as_ref()?;
        (before.priority != self.snapshot_after.priority)
            .then_some((before.priority, self.snapshot_after.priority))
    }
}

impl Entity for HistoryEntry {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} - Todo: {}",
            self.action,
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.snapshot_after.text
        )?;

        let mut details = Vec::new();
        if let Some((before, _)) = self.text_change() {
            details.push(format!("before: {}", before));
        }
        if let Some((from, to)) = self.priority_change() {
            details.push(format!("priority {} -> {}", from, to));
        }
        if !details.is_empty() {
            write!(f, " ({})", details.join("; "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn todo(text: &str, priority: Priority) -> Todo {
        Todo::new("t1", text, priority, Utc::now())
    }

    #[test]
    fn test_updated_entry_keeps_before_snapshot() {
        let before = todo("A", Priority::None);
        let after = todo("B", Priority::Low);
        let entry = HistoryEntry::updated(&before, &after, Utc::now());

        assert_eq!(entry.action, HistoryAction::Updated);
        assert_eq!(entry.subject_id, "t1");
        assert_eq!(entry.text_change(), Some(("A", "B")));
        assert_eq!(entry.priority_change(), Some((Priority::None, Priority::Low)));
    }

    #[test]
    fn test_non_update_entries_have_no_changes() {
        let entry = HistoryEntry::toggled(&todo("A", Priority::High), Utc::now());
        assert!(entry.snapshot_before.is_none());
        assert_eq!(entry.text_change(), None);
        assert_eq!(entry.priority_change(), None);
    }

    #[test]
    fn test_entry_ids_are_unique() {
        let t = todo("A", Priority::None);
        assert_ne!(HistoryEntry::added(&t, Utc::now()).id, HistoryEntry::added(&t, Utc::now()).id);
    }

    #[test]
    fn test_display_mentions_priority_change() {
        let before = todo("A", Priority::Low);
        let after = todo("A", Priority::High);
        let line = HistoryEntry::updated(&before, &after, Utc::now()).to_string();
        assert!(line.starts_with("Updated - "));
        assert!(line.contains("priority Low -> High"));
        assert!(!line.contains("before:"));
    }

    #[test]
    fn test_lenient_action_parsing() {
        assert_eq!(HistoryAction::parse_lenient("Toggled Completion"), Some(HistoryAction::ToggledCompletion));
        assert_eq!(HistoryAction::parse_lenient("deleted"), Some(HistoryAction::Removed));
        assert_eq!(HistoryAction::parse_lenient("Edited"), Some(HistoryAction::Updated));
        assert_eq!(HistoryAction::parse_lenient("renamed"), None);
    }
}
