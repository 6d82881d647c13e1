//! Todo CRUD and listing commands

use clap::Args;
use std::io::Write;
use todo_ledger::{Priority, StatusFilter};

use super::AppState;
use crate::output::{render, report_sync, todo_line, MutationOutput};

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Todo text
    pub text: String,

    /// none, low, medium or high
    #[arg(short, long, default_value = "none")]
    pub priority: Priority,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    pub id: String,

    /// New text
    pub text: String,

    /// New priority; keeps the current one when omitted
    #[arg(short, long)]
    pub priority: Option<Priority>,
}

#[derive(Args, Debug)]
pub struct IdArgs {
    pub id: String,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Case-insensitive substring to match
    #[arg(short, long)]
    pub search: Option<String>,

    /// all, completed or pending
    #[arg(long, default_value = "all")]
    pub status: StatusFilter,
}

pub async fn run_add(state: &AppState, args: &AddArgs, w: &mut dyn Write) -> anyhow::Result<()> {
    let mut store = state.store.lock().await;
    let applied = store.add(&args.text, args.priority).await?;
    report_sync(&applied);

    render(w, state.output, &MutationOutput::new(&applied), |out, w| {
        write!(w, "Added ")?;
        todo_line(w, out.todo)
    })?;
    Ok(())
}

pub async fn run_edit(state: &AppState, args: &EditArgs, w: &mut dyn Write) -> anyhow::Result<()> {
    let mut store = state.store.lock().await;
    let priority = match args.priority {
        Some(p) => p,
        None => store
            .get(&args.id)
            .map(|todo| todo.priority)
            .unwrap_or_default(),
    };
    let applied = store.edit(&args.id, &args.text, priority).await?;
    report_sync(&applied);

    render(w, state.output, &MutationOutput::new(&applied), |out, w| {
        write!(w, "Updated ")?;
        todo_line(w, out.todo)
    })?;
    Ok(())
}

pub async fn run_toggle(state: &AppState, args: &IdArgs, w: &mut dyn Write) -> anyhow::Result<()> {
    let mut store = state.store.lock().await;
    let applied = store.toggle_complete(&args.id).await?;
    report_sync(&applied);

    render(w, state.output, &MutationOutput::new(&applied), |out, w| todo_line(w, out.todo))?;
    Ok(())
}

pub async fn run_remove(state: &AppState, args: &IdArgs, w: &mut dyn Write) -> anyhow::Result<()> {
    let mut store = state.store.lock().await;
    let applied = store.remove(&args.id).await?;
    report_sync(&applied);

    render(w, state.output, &MutationOutput::new(&applied), |out, w| {
        writeln!(w, "Removed '{}'", out.todo.text)
    })?;
    Ok(())
}

pub async fn run_list(state: &AppState, args: &ListArgs, w: &mut dyn Write) -> anyhow::Result<()> {
    let mut store = state.store.lock().await;
    if let Some(search) = &args.search {
        store.set_search_query(search.as_str());
    }

    let todos: Vec<_> = store.list(args.status).collect();
    render(w, state.output, &todos, |todos, w| {
        if todos.is_empty() {
            return writeln!(w, "No todos");
        }
        for todo in todos {
            todo_line(w, todo)?;
        }
        Ok(())
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::memory_state;
    use crate::output::OutputMode;
    use clap::Parser;

    #[derive(Parser)]
    struct AddWrapper {
        #[command(flatten)]
        args: AddArgs,
    }

    #[derive(Parser)]
    struct ListWrapper {
        #[command(flatten)]
        args: ListArgs,
    }

    #[test]
    fn add_args_parse_priority() {
        let w = AddWrapper::parse_from(["test", "Buy milk", "--priority", "HIGH"]);
        assert_eq!(w.args.text, "Buy milk");
        assert_eq!(w.args.priority, Priority::High);

        assert!(AddWrapper::try_parse_from(["test", "x", "-p", "urgent"]).is_err());
    }

    #[test]
    fn list_args_default_to_all() {
        let w = ListWrapper::parse_from(["test"]);
        assert_eq!(w.args.status, StatusFilter::All);
        assert!(w.args.search.is_none());
    }

    #[tokio::test]
    async fn add_then_list() {
        let state = memory_state(OutputMode::Human);
        let mut out = Vec::new();

        run_add(&state, &AddArgs { text: "Buy milk".into(), priority: Priority::Low }, &mut out)
            .await
            .unwrap();
        run_add(&state, &AddArgs { text: "Walk dog".into(), priority: Priority::None }, &mut out)
            .await
            .unwrap();

        let mut listed = Vec::new();
        let args = ListArgs { search: Some("MILK".into()), status: StatusFilter::All };
        run_list(&state, &args, &mut listed).await.unwrap();

        let text = String::from_utf8(listed).unwrap();
        assert!(text.starts_with("[ ] Buy milk (Low)"));
        assert_eq!(text.lines().count(), 1);
    }

    #[tokio::test]
    async fn edit_keeps_priority_when_omitted() {
        let state = memory_state(OutputMode::Json);
        let mut out = Vec::new();
        run_add(&state, &AddArgs { text: "A".into(), priority: Priority::High }, &mut out)
            .await
            .unwrap();
        let id = state.store.lock().await.todos()[0].id.clone();

        let mut edited = Vec::new();
        let args = EditArgs { id, text: "B".into(), priority: None };
        run_edit(&state, &args, &mut edited).await.unwrap();

        let json: serde_json::Value = serde_json::from_slice(&edited).unwrap();
        assert_eq!(json["text"], "B");
        assert_eq!(json["priority"], "High");
        assert_eq!(json["persisted"], true);
    }

    #[tokio::test]
    async fn unknown_id_is_an_error() {
        let state = memory_state(OutputMode::Human);
        let mut out = Vec::new();
        let err = run_toggle(&state, &IdArgs { id: "nope".into() }, &mut out)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
