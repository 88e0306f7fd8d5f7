use crate::domain::models::{Task, TaskId};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

const TODOS_PATH: [&str; 2] = ["api", "todos"];

/// Task-record service backing the task store.
#[async_trait]
pub trait TaskService: Send + Sync {
    async fn list_tasks(&self) -> Result<Vec<Task>, InfraError>;

    async fn delete_task(&self, task_id: TaskId) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTaskService {
    client: Client,
    base_url: Url,
}

impl ReqwestTaskService {
    pub fn new(base_url: Url, request_timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|error| InfraError::Api(format!("failed to build http client: {error}")))?;
        Ok(Self { client, base_url })
    }

    fn api_http_error(status: reqwest::StatusCode, body: &str) -> InfraError {
        let message = if body.trim().is_empty() {
            format!("task service error: http {}", status.as_u16())
        } else {
            format!("task service error: http {}; body={body}", status.as_u16())
        };
        InfraError::Api(message)
    }

    fn transport_error(action: &str, error: reqwest::Error) -> InfraError {
        if error.is_timeout() {
            InfraError::Api(format!("timeout while {action}: {error}"))
        } else {
            InfraError::Api(format!("network error while {action}: {error}"))
        }
    }

    fn todos_endpoint(&self) -> Result<Url, InfraError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                InfraError::InvalidConfig("api base URL cannot be a base".to_string())
            })?;
            segments.pop_if_empty();
            segments.extend(TODOS_PATH);
        }
        Ok(url)
    }

    fn todo_endpoint(&self, task_id: TaskId) -> Result<Url, InfraError> {
        let mut url = self.todos_endpoint()?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                InfraError::InvalidConfig("todos URL cannot be a base".to_string())
            })?;
            segments.push(&task_id.to_string());
        }
        Ok(url)
    }
}

#[async_trait]
impl TaskService for ReqwestTaskService {
    async fn list_tasks(&self) -> Result<Vec<Task>, InfraError> {
        let endpoint = self.todos_endpoint()?;
        let response = self
            .client
            .get(endpoint)
            .send()
            .await
            .map_err(|error| Self::transport_error("listing tasks", error))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| Self::transport_error("reading task list response", error))?;

        if !status.is_success() {
            return Err(Self::api_http_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|error| {
            InfraError::Api(format!("invalid task list payload: {error}; body={body}"))
        })
    }

    async fn delete_task(&self, task_id: TaskId) -> Result<(), InfraError> {
        let endpoint = self.todo_endpoint(task_id)?;
        let response = self
            .client
            .delete(endpoint)
            .send()
            .await
            .map_err(|error| Self::transport_error("deleting task", error))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| Self::transport_error("reading task delete response", error))?;

        if !status.is_success() {
            return Err(Self::api_http_error(status, &body));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(base: &str) -> ReqwestTaskService {
        ReqwestTaskService::new(
            Url::parse(base).expect("valid base url"),
            Duration::from_secs(1),
        )
        .expect("build service")
    }

    #[test]
    fn todos_endpoint_appends_api_path() {
        let endpoint = service("http://127.0.0.1:5000").todos_endpoint().expect("endpoint");
        assert_eq!(endpoint.as_str(), "http://127.0.0.1:5000/api/todos");
    }

    #[test]
    fn todos_endpoint_respects_base_path_prefix() {
        let endpoint = service("http://localhost:8080/board/")
            .todos_endpoint()
            .expect("endpoint");
        assert_eq!(endpoint.as_str(), "http://localhost:8080/board/api/todos");
    }

    #[test]
    fn todo_endpoint_includes_task_id() {
        let endpoint = service("http://127.0.0.1:5000")
            .todo_endpoint(TaskId::new(42))
            .expect("endpoint");
        assert_eq!(endpoint.as_str(), "http://127.0.0.1:5000/api/todos/42");
    }

    #[test]
    fn http_errors_carry_status_and_body() {
        let error =
            ReqwestTaskService::api_http_error(reqwest::StatusCode::NOT_FOUND, "missing");
        assert_eq!(
            error.to_string(),
            "Task service error: task service error: http 404; body=missing"
        );
    }
}
