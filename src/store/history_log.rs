//! History Log
//!
//! Append-only audit trail owned by the store.

use std::collections::HashMap;

use crate::domain::{Entity, HistoryEntry};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        Self { entries }
    }

    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    /// Empty the log, returning how many entries were dropped
    pub fn reset(&mut self) -> usize {
        let cleared = self.entries.len();
        self.entries.clear();
        cleared
    }

    /// Chronological (insertion) order
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Most recent first
    pub fn iter_recent(&self) -> std::iter::Rev<std::slice::Iter<'_, HistoryEntry>> {
        self.entries.iter().rev()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace the log with the authoritative copy read back from the server.
    ///
    /// Server rows only carry the changed fields, so entries this log already
    /// knows keep their local snapshots and take over the server `recorded_at`.
    pub fn resync(&mut self, server_entries: Vec<HistoryEntry>) {
        let mut local: HashMap<String, HistoryEntry> = self
            .entries
            .drain(..)
            .map(|entry| (entry.id().clone(), entry))
            .collect();

        self.entries = server_entries
            .into_iter()
            .map(|server| match local.remove(server.id()) {
                Some(mut known) => {
                    known.recorded_at = server.recorded_at.or(known.recorded_at);
                    known
                }
                None => server,
            })
            .collect();
    }
}
