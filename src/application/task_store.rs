use crate::domain::models::{Task, TaskId};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::task_client::TaskService;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::{sleep, Duration as TokioDuration};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
        }
    }
}

/// Task records as last fetched from the backend, in backend order.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        let mut seen = HashSet::new();
        self.tasks = tasks
            .into_iter()
            .filter(|task| seen.insert(task.id))
            .collect();
    }

    pub fn get(&self, task_id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    pub fn contains(&self, task_id: TaskId) -> bool {
        self.get(task_id).is_some()
    }

    pub fn remove(&mut self, task_id: TaskId) -> Option<Task> {
        let index = self.tasks.iter().position(|task| task.id == task_id)?;
        Some(self.tasks.remove(index))
    }

    pub fn ids(&self) -> HashSet<TaskId> {
        self.tasks.iter().map(|task| task.id).collect()
    }

    pub fn all(&self) -> &[Task] {
        &self.tasks
    }

    /// Tasks surfaced in the timer view: open focus tasks.
    pub fn focus_tasks(&self) -> impl Iterator<Item = &Task> + '_ {
        self.tasks
            .iter()
            .filter(|task| task.is_focus_task() && !task.completed)
    }

    pub fn visible(&self, task_id: TaskId) -> Option<&Task> {
        self.focus_tasks().find(|task| task.id == task_id)
    }
}

/// Fetches the task list, retrying transient transport failures with exponential backoff.
pub struct TaskLoader<S>
where
    S: TaskService + ?Sized,
{
    service: Arc<S>,
    retry_policy: RetryPolicy,
}

impl<S> TaskLoader<S>
where
    S: TaskService + ?Sized,
{
    pub fn new(service: Arc<S>) -> Self {
        Self {
            service,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub async fn load(&self) -> Result<Vec<Task>, InfraError> {
        let max_attempts = self.retry_policy.max_attempts.max(1);
        let mut attempt: u8 = 0;

        loop {
            match self.service.list_tasks().await {
                Ok(tasks) => {
                    return Ok(tasks
                        .into_iter()
                        .filter(|task| match task.validate() {
                            Ok(()) => true,
                            Err(reason) => {
                                tracing::warn!(task_id = %task.id, %reason, "skipping invalid task record");
                                false
                            }
                        })
                        .collect());
                }
                Err(error) if should_retry(&error) && attempt + 1 < max_attempts => {
                    let delay = self
                        .retry_policy
                        .base_delay_ms
                        .saturating_mul(2u64.saturating_pow(attempt as u32));
                    tracing::debug!(attempt, delay_ms = delay, "retrying task list fetch");
                    sleep(TokioDuration::from_millis(delay)).await;
                    attempt = attempt.saturating_add(1);
                }
                Err(error) => return Err(error),
            }
        }
    }
}

fn should_retry(error: &InfraError) -> bool {
    match error {
        InfraError::Api(message) => {
            let message = message.to_ascii_lowercase();
            message.contains("network error")
                || message.contains("timeout")
                || message.contains("timed out")
                || message.contains("connection reset")
                || message.contains("http 503")
        }
        _ => false,
    }
}
