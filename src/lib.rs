pub mod application;
pub mod domain;
pub mod infrastructure;

use application::commands::{
    delete_task_impl, list_focus_tasks_impl, load_tasks_impl, pause_timer_impl,
    reset_timer_impl, select_task_impl, selected_task_impl, start_timer_impl, timer_status_impl,
    toggle_timer_impl, AppState, TimerStatusResponse,
};
use domain::models::TaskId;
use infrastructure::console_view::{format_row, ConsoleView};
use infrastructure::error::InfraError;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const USAGE: &str = "commands: list | select <id> | start [id] | pause [id] | reset [id] | \
toggle <id> | delete <id> | status <id> | reload | help | quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    List,
    Select(TaskId),
    Start(Option<TaskId>),
    Pause(Option<TaskId>),
    Reset(Option<TaskId>),
    Toggle(TaskId),
    Delete(TaskId),
    Status(TaskId),
    Reload,
    Help,
    Quit,
}

impl ConsoleCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::List => "list_focus_tasks",
            Self::Select(_) => "select_task",
            Self::Start(_) => "start_timer",
            Self::Pause(_) => "pause_timer",
            Self::Reset(_) => "reset_timer",
            Self::Toggle(_) => "toggle_timer",
            Self::Delete(_) => "delete_task",
            Self::Status(_) => "timer_status",
            Self::Reload => "load_tasks",
            Self::Help => "help",
            Self::Quit => "quit",
        }
    }
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut parts = input.split_whitespace();
        let Some(verb) = parts.next() else {
            return Err("empty command".to_string());
        };
        let argument = parts.next();
        if let Some(extra) = parts.next() {
            return Err(format!("unexpected argument '{extra}'"));
        }

        let command = match verb.to_ascii_lowercase().as_str() {
            "list" | "ls" => no_argument(verb, argument, Self::List)?,
            "select" => Self::Select(required_task_id(verb, argument)?),
            "start" => Self::Start(optional_task_id(argument)?),
            "pause" => Self::Pause(optional_task_id(argument)?),
            "reset" => Self::Reset(optional_task_id(argument)?),
            "toggle" => Self::Toggle(required_task_id(verb, argument)?),
            "delete" | "rm" => Self::Delete(required_task_id(verb, argument)?),
            "status" => Self::Status(required_task_id(verb, argument)?),
            "reload" => no_argument(verb, argument, Self::Reload)?,
            "help" | "?" => no_argument(verb, argument, Self::Help)?,
            "quit" | "exit" => no_argument(verb, argument, Self::Quit)?,
            other => return Err(format!("unknown command '{other}'")),
        };
        Ok(command)
    }
}

fn no_argument(
    verb: &str,
    argument: Option<&str>,
    command: ConsoleCommand,
) -> Result<ConsoleCommand, String> {
    match argument {
        Some(value) => Err(format!("{verb} takes no argument, got '{value}'")),
        None => Ok(command),
    }
}

fn optional_task_id(argument: Option<&str>) -> Result<Option<TaskId>, String> {
    argument.map(parse_task_id).transpose()
}

fn required_task_id(verb: &str, argument: Option<&str>) -> Result<TaskId, String> {
    match argument {
        Some(raw) => parse_task_id(raw),
        None => Err(format!("{verb} needs a task id")),
    }
}

fn parse_task_id(raw: &str) -> Result<TaskId, String> {
    let trimmed = raw.trim_start_matches('#');
    match trimmed.parse::<i64>() {
        Ok(value) if value > 0 => Ok(TaskId::new(value)),
        _ => Err(format!("invalid task id '{raw}'")),
    }
}

/// Runs the console front end against the workspace at `workspace_root` until `quit` or EOF.
pub async fn run(workspace_root: PathBuf) -> Result<(), InfraError> {
    let console = Arc::new(ConsoleView::new());
    let state = Arc::new(AppState::connect(
        workspace_root,
        console.clone(),
        console,
    )?);
    println!(
        "{} ready (config: {}). {USAGE}",
        state.app_name(),
        state.config_dir().display()
    );

    if let Err(error) = load_tasks_impl(&state).await {
        eprintln!("! {}", state.command_error("load_tasks", &error));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let command = match trimmed.parse::<ConsoleCommand>() {
            Ok(command) => command,
            Err(message) => {
                eprintln!("! {message}");
                continue;
            }
        };
        if command == ConsoleCommand::Quit {
            break;
        }
        if let Err(error) = dispatch(&state, command).await {
            eprintln!("! {}", state.command_error(command.name(), &error));
        }
    }
    Ok(())
}

async fn dispatch(state: &Arc<AppState>, command: ConsoleCommand) -> Result<(), InfraError> {
    match command {
        ConsoleCommand::List => {
            let rows = list_focus_tasks_impl(state)?;
            if rows.is_empty() {
                println!("no open focus tasks");
            }
            for row in &rows {
                println!("{}", format_row(row));
            }
        }
        ConsoleCommand::Select(task_id) => {
            select_task_impl(state, task_id)?;
        }
        ConsoleCommand::Start(task_id) => {
            if let Some(task_id) = resolve_target(state, task_id)? {
                start_timer_impl(state, task_id)?;
            }
        }
        ConsoleCommand::Pause(task_id) => {
            if let Some(task_id) = resolve_target(state, task_id)? {
                pause_timer_impl(state, task_id)?;
            }
        }
        ConsoleCommand::Reset(task_id) => {
            if let Some(task_id) = resolve_target(state, task_id)? {
                reset_timer_impl(state, task_id)?;
            }
        }
        ConsoleCommand::Toggle(task_id) => {
            toggle_timer_impl(state, task_id)?;
        }
        ConsoleCommand::Delete(task_id) => {
            if delete_task_impl(state, task_id).await?.deleted {
                println!("deleted #{task_id}");
            }
        }
        ConsoleCommand::Status(task_id) => {
            print_status(&timer_status_impl(state, task_id)?);
        }
        ConsoleCommand::Reload => {
            let loaded = load_tasks_impl(state).await?;
            println!("{} tasks loaded, {} focus tasks open", loaded.total, loaded.visible);
        }
        ConsoleCommand::Help => println!("{USAGE}"),
        ConsoleCommand::Quit => {}
    }
    Ok(())
}

fn resolve_target(
    state: &AppState,
    task_id: Option<TaskId>,
) -> Result<Option<TaskId>, InfraError> {
    match task_id {
        Some(task_id) => Ok(Some(task_id)),
        None => {
            let selected = selected_task_impl(state)?;
            if selected.is_none() {
                eprintln!("! no task selected; use `select <id>` or pass an id");
            }
            Ok(selected)
        }
    }
}

fn print_status(status: &TimerStatusResponse) {
    let selected = if status.is_selected { " (selected)" } else { "" };
    println!(
        "#{}{selected}: {} | {} left | {} sessions completed | {}",
        status.task_id,
        status.phase.caption(),
        status.clock,
        status.completed_session_count,
        status.status_text
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_and_without_ids() {
        assert_eq!("list".parse::<ConsoleCommand>(), Ok(ConsoleCommand::List));
        assert_eq!(
            "select 4".parse::<ConsoleCommand>(),
            Ok(ConsoleCommand::Select(TaskId::new(4)))
        );
        assert_eq!(
            "start".parse::<ConsoleCommand>(),
            Ok(ConsoleCommand::Start(None))
        );
        assert_eq!(
            "START #12".parse::<ConsoleCommand>(),
            Ok(ConsoleCommand::Start(Some(TaskId::new(12))))
        );
        assert_eq!(
            "  delete   3 ".parse::<ConsoleCommand>(),
            Ok(ConsoleCommand::Delete(TaskId::new(3)))
        );
        assert_eq!("exit".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Quit));
    }

    #[test]
    fn rejects_malformed_commands() {
        assert!("toggle".parse::<ConsoleCommand>().is_err());
        assert!("status abc".parse::<ConsoleCommand>().is_err());
        assert!("select 0".parse::<ConsoleCommand>().is_err());
        assert!("pause 1 2".parse::<ConsoleCommand>().is_err());
        assert!("list 5".parse::<ConsoleCommand>().is_err());
        assert!("dance".parse::<ConsoleCommand>().is_err());
        assert!("".parse::<ConsoleCommand>().is_err());
    }

    #[test]
    fn command_names_match_command_log_entries() {
        assert_eq!(ConsoleCommand::Reload.name(), "load_tasks");
        assert_eq!(ConsoleCommand::Toggle(TaskId::new(1)).name(), "toggle_timer");
    }
}
