//! Commands Layer
//!
//! Command handlers that bridge the command line to the todo store.

mod backup_cmd;
mod history_cmd;
mod todo_cmd;

pub use backup_cmd::*;
pub use history_cmd::*;
pub use todo_cmd::*;

use tokio::sync::Mutex;
use todo_ledger::TodoStore;

use crate::output::OutputMode;

pub struct AppState {
    pub store: Mutex<TodoStore>,
    pub output: OutputMode,
}

impl AppState {
    pub fn new(store: TodoStore, output: OutputMode) -> Self {
        Self {
            store: Mutex::new(store),
            output,
        }
    }
}

#[cfg(test)]
pub(crate) fn memory_state(output: OutputMode) -> AppState {
    use todo_ledger::config::{open_backend, BackendConfig};

    let backend = open_backend(&BackendConfig::Memory).expect("memory backend");
    AppState::new(TodoStore::new(backend), output)
}
