use crate::domain::cycle::{next_phase, Phase, LONG_BREAK_SECONDS, SHORT_BREAK_SECONDS};
use crate::domain::models::TaskId;
use crate::domain::timer_state::TimerState;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, trace};

/// The task the countdown driver is bound to. A new generation is issued on every install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverTarget {
    pub task_id: TaskId,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    SessionComplete,
    LongBreak,
    BreakOver,
    Reset,
    DeleteFailed,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub task_id: TaskId,
    pub message: String,
}

impl Notice {
    pub fn delete_failed(task_id: TaskId, cause: &str) -> Self {
        Self {
            kind: NoticeKind::DeleteFailed,
            task_id,
            message: format!("Could not delete task: {cause}"),
        }
    }
}

/// What an engine operation changed. Views are refreshed from this, never from the engine directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineUpdate {
    pub changed: Vec<(TaskId, TimerState)>,
    pub removed: Vec<TaskId>,
    pub selection_changed: bool,
    pub notices: Vec<Notice>,
}

impl EngineUpdate {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
            && self.removed.is_empty()
            && !self.selection_changed
            && self.notices.is_empty()
    }

    pub fn state_of(&self, task_id: TaskId) -> Option<&TimerState> {
        self.changed
            .iter()
            .find(|(candidate, _)| *candidate == task_id)
            .map(|(_, state)| state)
    }

    pub fn merge(&mut self, other: EngineUpdate) {
        for (task_id, state) in other.changed {
            self.record(task_id, state);
        }
        for task_id in other.removed {
            self.changed.retain(|(candidate, _)| *candidate != task_id);
            if !self.removed.contains(&task_id) {
                self.removed.push(task_id);
            }
        }
        self.selection_changed |= other.selection_changed;
        self.notices.extend(other.notices);
    }

    fn record(&mut self, task_id: TaskId, state: TimerState) {
        match self
            .changed
            .iter_mut()
            .find(|(candidate, _)| *candidate == task_id)
        {
            Some(entry) => entry.1 = state,
            None => self.changed.push((task_id, state)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TimerEngine {
    timers: HashMap<TaskId, TimerState>,
    selected: Option<TaskId>,
    driver: Option<DriverTarget>,
    next_generation: u64,
}

impl TimerEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure(&mut self, task_id: TaskId) -> &TimerState {
        self.timers.entry(task_id).or_default()
    }

    pub fn get(&self, task_id: TaskId) -> Option<&TimerState> {
        self.timers.get(&task_id)
    }

    pub fn selected(&self) -> Option<TaskId> {
        self.selected
    }

    pub fn driver(&self) -> Option<DriverTarget> {
        self.driver
    }

    pub fn tracked_tasks(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.timers.keys().copied()
    }

    pub fn running_count(&self) -> usize {
        self.timers.values().filter(|state| state.is_running).count()
    }

    pub fn status_text(&self, task_id: TaskId) -> String {
        self.timers
            .get(&task_id)
            .map(TimerState::status_text)
            .unwrap_or_else(|| TimerState::default().status_text())
    }

    pub fn select(&mut self, task_id: TaskId) -> EngineUpdate {
        let mut update = EngineUpdate {
            selection_changed: true,
            ..EngineUpdate::default()
        };
        if let Some(previous) = self.selected.filter(|previous| *previous != task_id) {
            if let Some(state) = self.timers.get(&previous) {
                update.record(previous, state.clone());
            }
        }
        self.selected = Some(task_id);
        let state = self.ensure(task_id).clone();
        update.record(task_id, state);
        debug!(task_id = %task_id, "selected task for main display");
        update
    }

    pub fn start(&mut self, task_id: TaskId) -> EngineUpdate {
        let mut update = EngineUpdate::default();
        if let Some(current) = self.driver {
            if current.task_id == task_id {
                let state = self.ensure(task_id).clone();
                update.record(task_id, state);
                return update;
            }
            self.driver = None;
            if let Some(preempted) = self.timers.get_mut(&current.task_id) {
                preempted.is_running = false;
                preempted.is_paused = true;
                update.record(current.task_id, preempted.clone());
            }
            debug!(task_id = %current.task_id, "preempted running timer");
        }

        let state = self.timers.entry(task_id).or_default();
        if state.time_left_seconds == 0 {
            state.time_left_seconds = state.phase.duration_seconds();
        }
        state.is_running = true;
        state.is_paused = false;
        let snapshot = state.clone();

        self.next_generation = self.next_generation.wrapping_add(1);
        self.driver = Some(DriverTarget {
            task_id,
            generation: self.next_generation,
        });
        info!(
            task_id = %task_id,
            phase = snapshot.phase.as_str(),
            time_left = snapshot.time_left_seconds,
            "started timer"
        );
        update.record(task_id, snapshot);
        update
    }

    pub fn pause(&mut self, task_id: TaskId) -> EngineUpdate {
        let mut update = EngineUpdate::default();
        if self.driver.map(|target| target.task_id) != Some(task_id) {
            return update;
        }
        let Some(state) = self.timers.get_mut(&task_id) else {
            return update;
        };
        if !state.is_running {
            return update;
        }
        self.driver = None;
        state.is_running = false;
        state.is_paused = true;
        info!(task_id = %task_id, time_left = state.time_left_seconds, "paused timer");
        update.record(task_id, state.clone());
        update
    }

    pub fn toggle(&mut self, task_id: TaskId) -> EngineUpdate {
        if self.ensure(task_id).is_running {
            self.pause(task_id)
        } else {
            self.start(task_id)
        }
    }

    pub fn reset(&mut self, task_id: TaskId) -> EngineUpdate {
        self.stop_driver_for(task_id);
        let state = self.timers.entry(task_id).or_default();
        state.phase = Phase::Working;
        state.time_left_seconds = Phase::Working.duration_seconds();
        state.is_running = false;
        state.is_paused = false;
        let snapshot = state.clone();
        info!(task_id = %task_id, "reset timer");

        let mut update = EngineUpdate::default();
        update.record(task_id, snapshot);
        update.notices.push(Notice {
            kind: NoticeKind::Reset,
            task_id,
            message: "Timer reset.".to_string(),
        });
        update
    }

    /// Advances the driver target by one second. No-op when no driver is installed.
    pub fn tick(&mut self) -> EngineUpdate {
        match self.driver {
            Some(target) => self.advance(target),
            None => EngineUpdate::default(),
        }
    }

    /// Like [`TimerEngine::tick`], but only for the given driver generation.
    /// Returns `None` when that driver has been cancelled or replaced.
    pub fn tick_generation(&mut self, generation: u64) -> Option<EngineUpdate> {
        let target = self.driver.filter(|target| target.generation == generation)?;
        Some(self.advance(target))
    }

    pub fn complete(&mut self, task_id: TaskId) -> EngineUpdate {
        self.stop_driver_for(task_id);
        let state = self.timers.entry(task_id).or_default();
        let outgoing = state.phase;
        let step = next_phase(outgoing, state.completed_session_count);
        state.phase = step.phase;
        state.time_left_seconds = step.duration_seconds;
        state.completed_session_count = step.completed_sessions;
        state.is_running = false;
        state.is_paused = false;
        let snapshot = state.clone();
        debug!(
            task_id = %task_id,
            from = outgoing.as_str(),
            to = step.phase.as_str(),
            completed = step.completed_sessions,
            "phase transition"
        );

        let mut update = EngineUpdate::default();
        update.record(task_id, snapshot);
        update.notices.push(transition_notice(task_id, step.phase, step.completed_sessions));
        update
    }

    pub fn remove(&mut self, task_id: TaskId) -> EngineUpdate {
        self.stop_driver_for(task_id);
        self.timers.remove(&task_id);
        let mut update = EngineUpdate {
            removed: vec![task_id],
            ..EngineUpdate::default()
        };
        if self.selected == Some(task_id) {
            self.selected = None;
            update.selection_changed = true;
        }
        info!(task_id = %task_id, "removed timer state");
        update
    }

    /// Drops timer state for every task not in `existing`.
    pub fn retain_tasks(&mut self, existing: &HashSet<TaskId>) -> EngineUpdate {
        let stale = self
            .timers
            .keys()
            .copied()
            .chain(self.selected)
            .filter(|task_id| !existing.contains(task_id))
            .collect::<HashSet<_>>();
        let mut update = EngineUpdate::default();
        for task_id in stale {
            update.merge(self.remove(task_id));
        }
        update
    }

    fn advance(&mut self, target: DriverTarget) -> EngineUpdate {
        let state = self.timers.entry(target.task_id).or_default();
        if state.time_left_seconds == 0 {
            return self.complete(target.task_id);
        }
        state.time_left_seconds -= 1;
        trace!(task_id = %target.task_id, time_left = state.time_left_seconds, "tick");
        if state.time_left_seconds == 0 {
            return self.complete(target.task_id);
        }
        let mut update = EngineUpdate::default();
        update.record(target.task_id, state.clone());
        update
    }

    fn stop_driver_for(&mut self, task_id: TaskId) {
        if self.driver.map(|target| target.task_id) == Some(task_id) {
            self.driver = None;
        }
    }
}

fn transition_notice(task_id: TaskId, phase: Phase, completed_sessions: u32) -> Notice {
    let (kind, message) = match phase {
        Phase::ShortBreak => (
            NoticeKind::SessionComplete,
            format!(
                "Pomodoro complete! Take a {} minute break.",
                SHORT_BREAK_SECONDS / 60
            ),
        ),
        Phase::LongBreak => (
            NoticeKind::LongBreak,
            format!(
                "{completed_sessions} pomodoros done! Enjoy a {} minute long break.",
                LONG_BREAK_SECONDS / 60
            ),
        ),
        Phase::Working => (
            NoticeKind::BreakOver,
            "Break over! Ready for a new work session.".to_string(),
        ),
    };
    Notice {
        kind,
        task_id,
        message,
    }
}
