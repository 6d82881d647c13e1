//! Local Backend
//!
//! Whole-blob persistence on top of a key-value store. Every mutation rewrites
//! both the `todos` and the `history` blob.

use async_trait::async_trait;

use super::error::PersistenceResult;
use super::kv::KeyValueStore;
use super::migration;
use super::traits::TodoPersistence;
use crate::domain::{HistoryEntry, Todo};

pub const TODOS_KEY: &str = "todos";
pub const HISTORY_KEY: &str = "history";

pub struct LocalBackend<K> {
    kv: K,
}

impl<K: KeyValueStore> LocalBackend<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    pub fn store(&self) -> &K {
        &self.kv
    }
}

#[async_trait]
impl<K: KeyValueStore> TodoPersistence for LocalBackend<K> {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn load_todos(&self) -> PersistenceResult<Vec<Todo>> {
        match self.kv.get(TODOS_KEY)? {
            Some(raw) => migration::decode_todos(TODOS_KEY, &raw),
            None => Ok(Vec::new()),
        }
    }

    async fn load_history(&self) -> PersistenceResult<Vec<HistoryEntry>> {
        match self.kv.get(HISTORY_KEY)? {
            Some(raw) => migration::decode_history(HISTORY_KEY, &raw),
            None => Ok(Vec::new()),
        }
    }

    async fn save_todos(&self, todos: &[Todo]) -> PersistenceResult<()> {
        let raw = migration::encode_todos(todos)?;
        self.kv.set(TODOS_KEY, &raw)
    }

    async fn save_history(&self, history: &[HistoryEntry]) -> PersistenceResult<()> {
        let raw = migration::encode_history(history)?;
        self.kv.set(HISTORY_KEY, &raw)
    }
}
