use crate::application::bootstrap::{bootstrap_workspace, BootstrapResult};
use crate::application::engine::{DriverTarget, EngineUpdate, Notice, TimerEngine};
use crate::application::task_store::{RetryPolicy, TaskLoader, TaskStore};
use crate::application::view_sync::{Notifier, TaskRowView, TimerView, ViewSynchronizer};
use crate::domain::cycle::Phase;
use crate::domain::models::TaskId;
use crate::domain::timer_state::TimerState;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::task_client::{ReqwestTaskService, TaskService};
use chrono::Utc;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

const TICK_INTERVAL: Duration = Duration::from_secs(1);

pub struct AppState {
    config_dir: PathBuf,
    logs_dir: PathBuf,
    app_name: String,
    retry_policy: RetryPolicy,
    service: Arc<dyn TaskService>,
    view: Arc<dyn TimerView>,
    notifier: Arc<dyn Notifier>,
    runtime: Mutex<RuntimeState>,
    log_guard: Mutex<()>,
}

impl AppState {
    pub fn new(
        workspace_root: PathBuf,
        service: Arc<dyn TaskService>,
        view: Arc<dyn TimerView>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        Ok(Self::from_bootstrap(bootstrap, service, view, notifier))
    }

    /// Builds the state against the HTTP task service named in `config/app.json`.
    pub fn connect(
        workspace_root: PathBuf,
        view: Arc<dyn TimerView>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let service = ReqwestTaskService::new(
            bootstrap.config.api_base_url.clone(),
            bootstrap.config.request_timeout,
        )?;
        Ok(Self::from_bootstrap(bootstrap, Arc::new(service), view, notifier))
    }

    fn from_bootstrap(
        bootstrap: BootstrapResult,
        service: Arc<dyn TaskService>,
        view: Arc<dyn TimerView>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config_dir: bootstrap.config_dir,
            logs_dir: bootstrap.logs_dir,
            app_name: bootstrap.config.app_name,
            retry_policy: bootstrap.config.retry_policy,
            service,
            view,
            notifier,
            runtime: Mutex::new(RuntimeState::default()),
            log_guard: Mutex::new(()),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }

    fn synchronizer(&self) -> ViewSynchronizer<'_> {
        ViewSynchronizer::new(self.view.as_ref(), self.notifier.as_ref())
    }
}

#[derive(Debug, Default)]
struct RuntimeState {
    store: TaskStore,
    engine: TimerEngine,
    ticker: Option<RunningTicker>,
}

/// The tokio task currently driving the engine's countdown.
#[derive(Debug)]
struct RunningTicker {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LoadTasksResponse {
    pub total: usize,
    pub visible: usize,
    pub dropped_timers: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TimerStatusResponse {
    pub task_id: TaskId,
    pub phase: Phase,
    pub time_left_seconds: u32,
    pub clock: String,
    pub is_running: bool,
    pub is_paused: bool,
    pub completed_session_count: u32,
    pub status_text: String,
    pub is_selected: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeleteTaskResponse {
    pub task_id: TaskId,
    pub deleted: bool,
}

pub async fn load_tasks_impl(state: &Arc<AppState>) -> Result<LoadTasksResponse, InfraError> {
    let loader =
        TaskLoader::new(Arc::clone(&state.service)).with_retry_policy(state.retry_policy.clone());
    let tasks = loader.load().await?;

    let mut runtime = lock_runtime(state)?;
    let response = {
        let RuntimeState { store, engine, .. } = &mut *runtime;
        store.replace_all(tasks);
        let update = engine.retain_tasks(&store.ids());
        let visible = store.focus_tasks().map(|task| task.id).collect::<Vec<_>>();
        for task_id in &visible {
            engine.ensure(*task_id);
        }

        let synchronizer = state.synchronizer();
        synchronizer.apply(&update, store, engine);
        synchronizer.render_all(store, engine);

        LoadTasksResponse {
            total: store.all().len(),
            visible: visible.len(),
            dropped_timers: update.removed.len(),
        }
    };
    reconcile_driver(state, &mut runtime)?;

    state.log_info(
        "load_tasks",
        &format!(
            "loaded {} tasks ({} focus tasks, {} timers dropped)",
            response.total, response.visible, response.dropped_timers
        ),
    );
    Ok(response)
}

pub fn list_focus_tasks_impl(state: &AppState) -> Result<Vec<TaskRowView>, InfraError> {
    let runtime = lock_runtime(state)?;
    let selected = runtime.engine.selected();
    let default_state = TimerState::default();
    Ok(runtime
        .store
        .focus_tasks()
        .map(|task| {
            let timer = runtime.engine.get(task.id).unwrap_or(&default_state);
            TaskRowView::build(task, timer, selected == Some(task.id))
        })
        .collect())
}

pub fn selected_task_impl(state: &AppState) -> Result<Option<TaskId>, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(runtime.engine.selected())
}

pub fn select_task_impl(
    state: &Arc<AppState>,
    task_id: TaskId,
) -> Result<TimerStatusResponse, InfraError> {
    run_timer_command(state, "select_task", task_id, TimerEngine::select)
}

pub fn start_timer_impl(
    state: &Arc<AppState>,
    task_id: TaskId,
) -> Result<TimerStatusResponse, InfraError> {
    run_timer_command(state, "start_timer", task_id, TimerEngine::start)
}

pub fn pause_timer_impl(
    state: &Arc<AppState>,
    task_id: TaskId,
) -> Result<TimerStatusResponse, InfraError> {
    run_timer_command(state, "pause_timer", task_id, TimerEngine::pause)
}

pub fn reset_timer_impl(
    state: &Arc<AppState>,
    task_id: TaskId,
) -> Result<TimerStatusResponse, InfraError> {
    run_timer_command(state, "reset_timer", task_id, TimerEngine::reset)
}

pub fn toggle_timer_impl(
    state: &Arc<AppState>,
    task_id: TaskId,
) -> Result<TimerStatusResponse, InfraError> {
    run_timer_command(state, "toggle_timer", task_id, TimerEngine::toggle)
}

pub fn timer_status_impl(state: &AppState, task_id: TaskId) -> Result<TimerStatusResponse, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(to_timer_status_response(&runtime.engine, task_id))
}

pub async fn delete_task_impl(
    state: &Arc<AppState>,
    task_id: TaskId,
) -> Result<DeleteTaskResponse, InfraError> {
    if let Err(error) = state.service.delete_task(task_id).await {
        state.log_error(
            "delete_task",
            &format!("remote delete failed for task_id={task_id}: {error}"),
        );
        let _runtime = lock_runtime(state)?;
        state
            .synchronizer()
            .notify(&Notice::delete_failed(task_id, &error.to_string()));
        return Ok(DeleteTaskResponse {
            task_id,
            deleted: false,
        });
    }

    let mut runtime = lock_runtime(state)?;
    let update = runtime.engine.remove(task_id);
    runtime.store.remove(task_id);
    state
        .synchronizer()
        .apply(&update, &runtime.store, &runtime.engine);
    reconcile_driver(state, &mut runtime)?;

    state.log_info("delete_task", &format!("deleted task_id={task_id}"));
    Ok(DeleteTaskResponse {
        task_id,
        deleted: true,
    })
}

fn run_timer_command<F>(
    state: &Arc<AppState>,
    command: &str,
    task_id: TaskId,
    operation: F,
) -> Result<TimerStatusResponse, InfraError>
where
    F: FnOnce(&mut TimerEngine, TaskId) -> EngineUpdate,
{
    let mut guard = lock_runtime(state)?;
    let runtime = &mut *guard;
    if !runtime.store.contains(task_id) {
        runtime.engine.ensure(task_id);
        tracing::warn!(task_id = %task_id, command, "ignoring command for unknown task");
        state.log_error(command, &format!("unknown task_id={task_id}; ignored"));
        return Ok(to_timer_status_response(&runtime.engine, task_id));
    }

    // Views only see the update once the ticker matches the engine.
    let previous = runtime.engine.clone();
    let update = operation(&mut runtime.engine, task_id);
    if let Err(error) = reconcile_driver(state, runtime) {
        runtime.engine = previous;
        return Err(error);
    }
    state
        .synchronizer()
        .apply(&update, &runtime.store, &runtime.engine);

    let response = to_timer_status_response(&runtime.engine, task_id);
    state.log_info(
        command,
        &format!("task_id={task_id} status=\"{}\"", response.status_text),
    );
    Ok(response)
}

fn tick_impl(state: &Arc<AppState>, generation: u64) -> Result<bool, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let Some(update) = runtime.engine.tick_generation(generation) else {
        return Ok(false);
    };
    state
        .synchronizer()
        .apply(&update, &runtime.store, &runtime.engine);
    for notice in &update.notices {
        state.log_info("tick", &format!("task_id={} {}", notice.task_id, notice.message));
    }

    let still_driving = runtime.engine.driver().map(|target| target.generation) == Some(generation);
    if !still_driving
        && runtime.ticker.as_ref().map(|ticker| ticker.generation) == Some(generation)
    {
        // Exhausted countdown: the loop exits on its own, so release the slot without aborting.
        runtime.ticker = None;
    }
    Ok(still_driving)
}

/// Makes the single running tokio ticker match the engine's driver field.
/// On error the previous ticker is left running.
fn reconcile_driver(state: &Arc<AppState>, runtime: &mut RuntimeState) -> Result<(), InfraError> {
    let target = runtime.engine.driver();
    let running = runtime.ticker.as_ref().map(|ticker| ticker.generation);
    if running == target.map(|target| target.generation) {
        return Ok(());
    }

    let replacement = match target {
        Some(target) => Some(RunningTicker {
            generation: target.generation,
            handle: spawn_ticker(state, target)?,
        }),
        None => None,
    };
    if let Some(previous) = std::mem::replace(&mut runtime.ticker, replacement) {
        previous.handle.abort();
    }
    Ok(())
}

fn spawn_ticker(state: &Arc<AppState>, target: DriverTarget) -> Result<JoinHandle<()>, InfraError> {
    let handle = Handle::try_current().map_err(|error| {
        InfraError::State(format!("countdown driver requires an async runtime: {error}"))
    })?;
    let state = Arc::clone(state);

    Ok(handle.spawn(async move {
        let mut interval = time::interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match tick_impl(&state, target.generation) {
                Ok(true) => {}
                Ok(false) => break,
                Err(error) => {
                    state.command_error("tick", &error);
                    break;
                }
            }
        }
    }))
}

fn lock_runtime(state: &AppState) -> Result<MutexGuard<'_, RuntimeState>, InfraError> {
    state
        .runtime
        .lock()
        .map_err(|error| InfraError::State(format!("runtime lock poisoned: {error}")))
}

fn to_timer_status_response(engine: &TimerEngine, task_id: TaskId) -> TimerStatusResponse {
    let default_state = TimerState::default();
    let timer = engine.get(task_id).unwrap_or(&default_state);
    TimerStatusResponse {
        task_id,
        phase: timer.phase,
        time_left_seconds: timer.time_left_seconds,
        clock: timer.clock(),
        is_running: timer.is_running,
        is_paused: timer.is_paused,
        completed_session_count: timer.completed_session_count,
        status_text: timer.status_text(),
        is_selected: engine.selected() == Some(task_id),
    }
}
