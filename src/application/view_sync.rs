use crate::application::engine::{EngineUpdate, Notice, TimerEngine};
use crate::application::task_store::TaskStore;
use crate::domain::models::{Task, TaskId};
use crate::domain::timer_state::TimerState;
use serde::Serialize;

/// Presentation surface for the task list and the main timer display.
pub trait TimerView: Send + Sync {
    fn render_row(&self, row: &TaskRowView);
    fn remove_row(&self, task_id: TaskId);
    fn render_main(&self, display: &MainDisplayView);
    fn clear_main(&self);
}

/// Receives phase transitions, reset confirmations and failures for display to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TaskRowView {
    pub task_id: TaskId,
    pub title: String,
    pub priority_label: &'static str,
    pub status_text: String,
    pub is_selected: bool,
    pub is_running: bool,
}

impl TaskRowView {
    pub fn build(task: &Task, state: &TimerState, is_selected: bool) -> Self {
        Self {
            task_id: task.id,
            title: task.display_title().to_string(),
            priority_label: task.priority.label(),
            status_text: state.status_text(),
            is_selected,
            is_running: state.is_running,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MainDisplayView {
    pub task_id: TaskId,
    pub clock: String,
    pub phase_caption: &'static str,
    pub session_label: String,
    pub is_running: bool,
    pub progress: f64,
}

impl MainDisplayView {
    pub fn build(task_id: TaskId, state: &TimerState) -> Self {
        Self {
            task_id,
            clock: state.clock(),
            phase_caption: state.phase.caption(),
            session_label: format!("Session {}", state.session_ordinal()),
            is_running: state.is_running,
            progress: state.progress(),
        }
    }
}

/// Pushes engine updates into a [`TimerView`] and a [`Notifier`].
pub struct ViewSynchronizer<'a> {
    view: &'a dyn TimerView,
    notifier: &'a dyn Notifier,
}

impl<'a> ViewSynchronizer<'a> {
    pub fn new(view: &'a dyn TimerView, notifier: &'a dyn Notifier) -> Self {
        Self { view, notifier }
    }

    pub fn apply(&self, update: &EngineUpdate, store: &TaskStore, engine: &TimerEngine) {
        let selected = engine.selected();
        for task_id in &update.removed {
            self.view.remove_row(*task_id);
        }
        for (task_id, state) in &update.changed {
            if let Some(task) = store.visible(*task_id) {
                self.view
                    .render_row(&TaskRowView::build(task, state, selected == Some(*task_id)));
            }
        }

        let selected_changed = selected
            .map(|task_id| update.state_of(task_id).is_some())
            .unwrap_or(false);
        if update.selection_changed || selected_changed {
            self.refresh_main(engine);
        }

        for notice in &update.notices {
            self.notifier.notify(notice);
        }
    }

    /// Full re-render of the visible task list and the main display.
    pub fn render_all(&self, store: &TaskStore, engine: &TimerEngine) {
        let selected = engine.selected();
        let default_state = TimerState::default();
        for task in store.focus_tasks() {
            let state = engine.get(task.id).unwrap_or(&default_state);
            self.view
                .render_row(&TaskRowView::build(task, state, selected == Some(task.id)));
        }
        self.refresh_main(engine);
    }

    pub fn notify(&self, notice: &Notice) {
        self.notifier.notify(notice);
    }

    fn refresh_main(&self, engine: &TimerEngine) {
        match engine
            .selected()
            .and_then(|task_id| engine.get(task_id).map(|state| (task_id, state)))
        {
            Some((task_id, state)) => self
                .view
                .render_main(&MainDisplayView::build(task_id, state)),
            None => self.view.clear_main(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{RecordingNotifier, RecordingView, ViewEvent};
    use super::*;
    use crate::application::engine::NoticeKind;
    use crate::domain::models::{Priority, TaskKind};

    fn focus_task(id: i64) -> Task {
        Task {
            id: TaskId::new(id),
            title: format!("focus {id}"),
            description: None,
            priority: Priority::High,
            completed: false,
            kind: TaskKind::FocusTask,
            created_at: None,
            updated_at: None,
        }
    }

    fn store_with(ids: &[i64]) -> TaskStore {
        let mut store = TaskStore::default();
        store.replace_all(ids.iter().copied().map(focus_task).collect());
        store
    }

    fn rows(events: &[ViewEvent]) -> Vec<&TaskRowView> {
        events
            .iter()
            .filter_map(|event| match event {
                ViewEvent::Row(row) => Some(row),
                _ => None,
            })
            .collect()
    }

    fn mains(events: &[ViewEvent]) -> Vec<&MainDisplayView> {
        events
            .iter()
            .filter_map(|event| match event {
                ViewEvent::Main(main) => Some(main),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn tick_of_selected_task_refreshes_row_and_main() {
        let view = RecordingView::default();
        let notifier = RecordingNotifier::default();
        let sync = ViewSynchronizer::new(&view, &notifier);
        let store = store_with(&[1]);
        let mut engine = TimerEngine::new();
        engine.select(TaskId::new(1));
        engine.start(TaskId::new(1));

        let update = engine.tick();
        sync.apply(&update, &store, &engine);
        let events = view.take();

        let rows = rows(&events);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status_text, "work 24:59");
        assert!(rows[0].is_selected);
        assert_eq!(rows[0].priority_label, "P0");
        let mains = mains(&events);
        assert_eq!(mains.len(), 1);
        assert_eq!(mains[0].clock, "24:59");
        assert!(mains[0].is_running);
    }

    #[test]
    fn tick_of_unselected_task_leaves_main_display_alone() {
        let view = RecordingView::default();
        let notifier = RecordingNotifier::default();
        let sync = ViewSynchronizer::new(&view, &notifier);
        let store = store_with(&[1, 2]);
        let mut engine = TimerEngine::new();
        engine.start(TaskId::new(1));
        engine.select(TaskId::new(2));

        sync.apply(&engine.tick(), &store, &engine);
        let events = view.take();

        assert_eq!(rows(&events).len(), 1);
        assert!(mains(&events).is_empty());
    }

    #[test]
    fn selection_peek_shows_idle_state() {
        let view = RecordingView::default();
        let notifier = RecordingNotifier::default();
        let sync = ViewSynchronizer::new(&view, &notifier);
        let store = store_with(&[1]);
        let mut engine = TimerEngine::new();

        sync.apply(&engine.select(TaskId::new(1)), &store, &engine);
        let events = view.take();

        let mains = mains(&events);
        assert_eq!(mains.len(), 1);
        assert_eq!(mains[0].clock, "25:00");
        assert_eq!(mains[0].phase_caption, "Work time");
        assert_eq!(mains[0].session_label, "Session 1");
        assert!(!mains[0].is_running);
        assert_eq!(mains[0].progress, 0.0);
    }

    #[test]
    fn removing_selected_task_clears_main_and_row() {
        let view = RecordingView::default();
        let notifier = RecordingNotifier::default();
        let sync = ViewSynchronizer::new(&view, &notifier);
        let mut store = store_with(&[1]);
        let mut engine = TimerEngine::new();
        engine.select(TaskId::new(1));

        let update = engine.remove(TaskId::new(1));
        store.remove(TaskId::new(1));
        sync.apply(&update, &store, &engine);

        assert_eq!(
            view.take(),
            vec![ViewEvent::RemoveRow(TaskId::new(1)), ViewEvent::ClearMain]
        );
    }

    #[test]
    fn notices_reach_the_notifier() {
        let view = RecordingView::default();
        let notifier = RecordingNotifier::default();
        let sync = ViewSynchronizer::new(&view, &notifier);
        let store = store_with(&[1]);
        let mut engine = TimerEngine::new();

        sync.apply(&engine.reset(TaskId::new(1)), &store, &engine);
        let notices = notifier.take();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NoticeKind::Reset);
    }

    #[test]
    fn rows_are_not_rendered_for_hidden_tasks() {
        let view = RecordingView::default();
        let notifier = RecordingNotifier::default();
        let sync = ViewSynchronizer::new(&view, &notifier);
        let mut store = TaskStore::default();
        let mut hidden = focus_task(1);
        hidden.kind = TaskKind::PlainTodo;
        store.replace_all(vec![hidden]);
        let mut engine = TimerEngine::new();

        sync.apply(&engine.start(TaskId::new(1)), &store, &engine);
        assert!(rows(&view.take()).is_empty());
    }

    #[test]
    fn render_all_draws_every_visible_row() {
        let view = RecordingView::default();
        let notifier = RecordingNotifier::default();
        let sync = ViewSynchronizer::new(&view, &notifier);
        let store = store_with(&[1, 2, 3]);
        let engine = TimerEngine::new();

        sync.render_all(&store, &engine);
        let events = view.take();
        assert_eq!(rows(&events).len(), 3);
        assert_eq!(events.last(), Some(&ViewEvent::ClearMain));
    }
}
