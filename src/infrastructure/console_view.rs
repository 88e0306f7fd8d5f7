use crate::application::engine::{Notice, NoticeKind};
use crate::application::view_sync::{MainDisplayView, Notifier, TaskRowView, TimerView};
use crate::domain::models::TaskId;

const PROGRESS_WIDTH: usize = 20;

/// Prints rows, the main display and notices to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleView;

impl ConsoleView {
    pub fn new() -> Self {
        Self
    }
}

impl TimerView for ConsoleView {
    fn render_row(&self, row: &TaskRowView) {
        println!("{}", format_row(row));
    }

    fn remove_row(&self, task_id: TaskId) {
        println!("  - #{task_id} removed");
    }

    fn render_main(&self, display: &MainDisplayView) {
        println!("{}", format_main(display));
    }

    fn clear_main(&self) {
        println!("[no task selected]");
    }
}

impl Notifier for ConsoleView {
    fn notify(&self, notice: &Notice) {
        match notice.kind {
            NoticeKind::DeleteFailed => eprintln!("! {}", notice.message),
            _ => println!("* #{} {}", notice.task_id, notice.message),
        }
    }
}

pub fn format_row(row: &TaskRowView) -> String {
    let marker = if row.is_selected { '>' } else { ' ' };
    let glyph = if row.is_running { "||" } else { "|>" };
    format!(
        "{marker} #{:<5} [{}] {} {:<40} {}",
        row.task_id, row.priority_label, glyph, row.title, row.status_text
    )
}

pub fn format_main(display: &MainDisplayView) -> String {
    let filled = (display.progress.clamp(0.0, 1.0) * PROGRESS_WIDTH as f64).round() as usize;
    let bar = format!(
        "{}{}",
        "#".repeat(filled),
        ".".repeat(PROGRESS_WIDTH - filled)
    );
    let action = if display.is_running { "pause" } else { "start" };
    format!(
        "[#{}] {} {} | {} | [{bar}] ({action})",
        display.task_id, display.clock, display.phase_caption, display.session_label
    )
}
