//! Export / import of the whole ledger as a JSON backup file

use clap::Args;
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;
use todo_ledger::repository::Backup;

use super::AppState;
use crate::output::{render, report_sync};

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Destination file
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Backup file written by `export`
    pub path: PathBuf,
}

pub async fn run_export(state: &AppState, args: &ExportArgs, w: &mut dyn Write) -> anyhow::Result<()> {
    let backup = state.store.lock().await.backup();
    backup.write_to(&args.path)?;
    tracing::info!("Exported {} todos to {:?}", backup.todos.len(), args.path);

    let summary = json!({
        "path": args.path,
        "todos": backup.todos.len(),
        "history": backup.history.len(),
    });
    render(w, state.output, &summary, |_, w| {
        writeln!(
            w,
            "Exported {} todos and {} history entries to {}",
            backup.todos.len(),
            backup.history.len(),
            args.path.display()
        )
    })?;
    Ok(())
}

/// Replaces the current todos and history with the backup contents
pub async fn run_import(state: &AppState, args: &ImportArgs, w: &mut dyn Write) -> anyhow::Result<()> {
    let backup = Backup::read_from(&args.path)?;
    let history = backup.history.len();

    let mut store = state.store.lock().await;
    let applied = store.restore(backup).await?;
    report_sync(&applied);
    tracing::info!("Imported {} todos from {:?}", applied.value, args.path);

    let summary = json!({
        "todos": applied.value,
        "history": history,
        "persisted": applied.is_persisted(),
    });
    render(w, state.output, &summary, |_, w| {
        writeln!(w, "Imported {} todos and {} history entries", applied.value, history)
    })?;
    Ok(())
}
