use crate::domain::cycle::Phase;
use serde::Serialize;

/// Countdown and cycle position of one task. Session state only, never sent to the backend.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TimerState {
    pub time_left_seconds: u32,
    pub phase: Phase,
    pub is_running: bool,
    pub is_paused: bool,
    pub completed_session_count: u32,
}

impl Default for TimerState {
    fn default() -> Self {
        Self {
            time_left_seconds: Phase::Working.duration_seconds(),
            phase: Phase::Working,
            is_running: false,
            is_paused: false,
            completed_session_count: 0,
        }
    }
}

impl TimerState {
    pub fn status_text(&self) -> String {
        if self.is_running {
            format!("{} {}", self.phase.as_str(), format_clock(self.time_left_seconds))
        } else if self.completed_session_count > 0 {
            format!("{} completed", self.completed_session_count)
        } else {
            "not started".to_string()
        }
    }

    pub fn clock(&self) -> String {
        format_clock(self.time_left_seconds)
    }

    /// Elapsed share of the current phase in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        let total = self.phase.duration_seconds();
        if total == 0 {
            return 0.0;
        }
        let remaining = self.time_left_seconds.min(total);
        f64::from(total - remaining) / f64::from(total)
    }

    /// 1-based number of the work session in progress or next up.
    pub fn session_ordinal(&self) -> u32 {
        self.completed_session_count.saturating_add(1)
    }
}

pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
