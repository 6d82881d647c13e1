mod commands;
mod output;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use todo_ledger::config::{open_backend, LedgerConfig};
use todo_ledger::TodoStore;

use commands::AppState;
use output::OutputMode;

#[derive(Parser, Debug)]
#[command(author, version, about = "Todo list with a change history", long_about = None)]
struct Cli {
    /// Emit JSON output instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    /// Config file (defaults to ledger_config.json in the data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add a todo
    Add(commands::AddArgs),
    /// Change the text (and optionally the priority) of a todo
    Edit(commands::EditArgs),
    /// Flip a todo between completed and pending
    Toggle(commands::IdArgs),
    /// Delete a todo
    Remove(commands::IdArgs),
    /// List todos
    List(commands::ListArgs),
    /// Show the change history, newest first
    History(commands::HistoryArgs),
    /// Clear the change history (todos are kept)
    ResetHistory,
    /// Write todos and history to a JSON file
    Export(commands::ExportArgs),
    /// Replace todos and history with the contents of a JSON file
    Import(commands::ImportArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = LedgerConfig::resolve(cli.config.as_deref()).context("loading configuration")?;
    match config.log_dir() {
        Ok(dir) => {
            if let Err(e) = rolling_logger::init_logger(dir, "todo") {
                eprintln!("warning: file logging disabled: {}", e);
            }
        }
        Err(e) => eprintln!("warning: file logging disabled: {}", e),
    }

    let backend = open_backend(&config.backend).context("opening storage")?;
    let store = TodoStore::hydrate(backend).await.context("loading todos")?;
    let state = AppState::new(store, cli.output_mode());

    let mut stdout = io::stdout().lock();
    let result = match &cli.command {
        Commands::Add(args) => commands::run_add(&state, args, &mut stdout).await,
        Commands::Edit(args) => commands::run_edit(&state, args, &mut stdout).await,
        Commands::Toggle(args) => commands::run_toggle(&state, args, &mut stdout).await,
        Commands::Remove(args) => commands::run_remove(&state, args, &mut stdout).await,
        Commands::List(args) => commands::run_list(&state, args, &mut stdout).await,
        Commands::History(args) => commands::run_history(&state, args, &mut stdout).await,
        Commands::ResetHistory => commands::run_reset_history(&state, &mut stdout).await,
        Commands::Export(args) => commands::run_export(&state, args, &mut stdout).await,
        Commands::Import(args) => commands::run_import(&state, args, &mut stdout).await,
    };

    if let Err(e) = &result {
        let _ = rolling_logger::error(&format!("{:?} failed: {:#}", cli.command, e));
    }
    result
}
