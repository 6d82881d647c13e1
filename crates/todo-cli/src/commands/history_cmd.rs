//! History commands

use clap::Args;
use serde_json::json;
use std::io::Write;

use super::AppState;
use crate::output::{render, report_sync};

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Show at most this many entries
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

/// Most recent first
pub async fn run_history(state: &AppState, args: &HistoryArgs, w: &mut dyn Write) -> anyhow::Result<()> {
    let store = state.store.lock().await;
    let entries: Vec<_> = store
        .history()
        .take(args.limit.unwrap_or(usize::MAX))
        .collect();

    render(w, state.output, &entries, |entries, w| {
        if entries.is_empty() {
            return writeln!(w, "No history");
        }
        for entry in entries {
            writeln!(w, "{}", entry)?;
        }
        Ok(())
    })?;
    Ok(())
}

pub async fn run_reset_history(state: &AppState, w: &mut dyn Write) -> anyhow::Result<()> {
    let mut store = state.store.lock().await;
    let applied = store.reset_history().await;
    report_sync(&applied);

    let summary = json!({ "cleared": applied.value, "persisted": applied.is_persisted() });
    render(w, state.output, &summary, |_, w| {
        writeln!(w, "Cleared {} history entries", applied.value)
    })?;
    Ok(())
}
