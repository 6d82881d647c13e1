//! Repository Layer
//!
//! Persistence abstractions and implementations.

mod backup;
mod error;
mod kv;
mod local;
pub mod migration;
pub mod remote;
mod sqlite_kv;
mod traits;

#[cfg(test)]
mod tests;

pub use backup::Backup;
pub use error::{PersistenceError, PersistenceResult};
pub use kv::{FileKv, KeyValueStore, MemoryKv};
pub use local::{LocalBackend, HISTORY_KEY, TODOS_KEY};
pub use remote::{MemoryTables, RemoteBackend, RestTableClient, TableClient};
pub use sqlite_kv::SqliteKv;
pub use traits::{Commit, TodoPersistence};
