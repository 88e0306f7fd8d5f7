use serde::{Deserialize, Serialize};

pub const WORK_SECONDS: u32 = 25 * 60;
pub const SHORT_BREAK_SECONDS: u32 = 5 * 60;
pub const LONG_BREAK_SECONDS: u32 = 15 * 60;
/// Every n-th completed work session is followed by a long break.
pub const SESSIONS_PER_LONG_BREAK: u32 = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Working,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub fn duration_seconds(self) -> u32 {
        match self {
            Self::Working => WORK_SECONDS,
            Self::ShortBreak => SHORT_BREAK_SECONDS,
            Self::LongBreak => LONG_BREAK_SECONDS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Working => "work",
            Self::ShortBreak => "short break",
            Self::LongBreak => "long break",
        }
    }

    pub fn caption(self) -> &'static str {
        match self {
            Self::Working => "Work time",
            Self::ShortBreak => "Short break",
            Self::LongBreak => "Long break",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleStep {
    pub phase: Phase,
    pub duration_seconds: u32,
    pub completed_sessions: u32,
}

pub fn next_phase(current: Phase, completed_sessions: u32) -> CycleStep {
    match current {
        Phase::Working => {
            let completed_sessions = completed_sessions.saturating_add(1);
            let phase = if completed_sessions % SESSIONS_PER_LONG_BREAK == 0 {
                Phase::LongBreak
            } else {
                Phase::ShortBreak
            };
            CycleStep {
                phase,
                duration_seconds: phase.duration_seconds(),
                completed_sessions,
            }
        }
        Phase::ShortBreak | Phase::LongBreak => CycleStep {
            phase: Phase::Working,
            duration_seconds: WORK_SECONDS,
            completed_sessions,
        },
    }
}
