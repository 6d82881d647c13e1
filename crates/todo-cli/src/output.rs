//! Output layer shared by every command: human text or JSON.

use serde::Serialize;
use std::io::{self, Write};
use todo_ledger::{Applied, Todo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Render `value` as pretty JSON or through the `human` closure
pub fn render<T, F>(w: &mut dyn Write, mode: OutputMode, value: &T, human: F) -> io::Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce(&T, &mut dyn Write) -> io::Result<()>,
{
    if mode.is_json() {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        writeln!(w, "{}", json)
    } else {
        human(value, w)
    }
}

/// One todo as a single line: `[x] text (priority) id`
pub fn todo_line(w: &mut dyn Write, todo: &Todo) -> io::Result<()> {
    let mark = if todo.completed { "x" } else { " " };
    writeln!(w, "[{}] {} ({}) {}", mark, todo.text, todo.priority, todo.id)
}

/// Warn on stderr when a change stayed in memory only
pub fn report_sync<T>(applied: &Applied<T>) {
    if let Some(e) = applied.persistence_error() {
        eprintln!("warning: change applied but not saved: {}", e);
    }
}

/// JSON shape of a todo mutation: the todo plus whether it was saved
#[derive(Serialize)]
pub struct MutationOutput<'a> {
    #[serde(flatten)]
    pub todo: &'a Todo,
    pub persisted: bool,
}

impl<'a> MutationOutput<'a> {
    pub fn new(applied: &'a Applied<Todo>) -> Self {
        Self {
            todo: &applied.value,
            persisted: applied.is_persisted(),
        }
    }
}
