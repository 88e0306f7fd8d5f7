use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(i64);

impl TaskId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

impl From<i64> for TaskId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    P1,
    Low,
    #[default]
    #[serde(other)]
    Medium,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Self::High => "P0",
            Self::P1 => "P1",
            Self::Medium => "P2",
            Self::Low => "P3",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TaskKind {
    #[default]
    #[serde(rename = "todo")]
    PlainTodo,
    #[serde(rename = "pomodoro")]
    FocusTask,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    #[serde(rename = "type", default, deserialize_with = "kind_or_default")]
    pub kind: TaskKind,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

impl Task {
    pub fn validate(&self) -> Result<(), String> {
        if self.id.value() <= 0 {
            return Err("task.id must be positive".to_string());
        }
        if let (Some(created_at), Some(updated_at)) = (self.created_at, self.updated_at) {
            if updated_at < created_at {
                return Err("task.updated_at must be >= task.created_at".to_string());
            }
        }
        Ok(())
    }

    pub fn is_focus_task(&self) -> bool {
        self.kind == TaskKind::FocusTask
    }

    pub fn display_title(&self) -> &str {
        let title = self.title.trim();
        if title.is_empty() { "Untitled task" } else { title }
    }
}

// The backend stores `type` as a nullable column; null and unknown values are plain to-dos.
fn kind_or_default<'de, D>(deserializer: D) -> Result<TaskKind, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(match raw.as_deref().map(str::trim) {
        Some("pomodoro") => TaskKind::FocusTask,
        _ => TaskKind::PlainTodo,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> Task {
        Task {
            id: TaskId::new(7),
            title: "Write report".to_string(),
            description: Some("quarterly numbers".to_string()),
            priority: Priority::P1,
            completed: false,
            kind: TaskKind::FocusTask,
            created_at: Some(
                NaiveDateTime::parse_from_str("2026-02-16T08:00:00", "%Y-%m-%dT%H:%M:%S")
                    .expect("valid datetime"),
            ),
            updated_at: None,
        }
    }

    #[test]
    fn task_validate_accepts_valid_task() {
        assert!(sample_task().validate().is_ok());
    }

    #[test]
    fn task_validate_rejects_non_positive_id() {
        let mut task = sample_task();
        task.id = TaskId::new(0);
        assert!(task.validate().is_err());
    }

    #[test]
    fn task_validate_rejects_update_before_creation() {
        let mut task = sample_task();
        task.updated_at = Some(
            NaiveDateTime::parse_from_str("2026-02-15T08:00:00", "%Y-%m-%dT%H:%M:%S")
                .expect("valid datetime"),
        );
        assert!(task.validate().is_err());
    }

    #[test]
    fn backend_record_deserializes_with_kind_and_timestamps() {
        let raw = r#"{
            "id": 3,
            "title": "Focus",
            "description": "",
            "priority": "high",
            "completed": false,
            "type": "pomodoro",
            "createdAt": "2026-02-16T08:00:00.123456",
            "updatedAt": "2026-02-16T09:30:00.000001"
        }"#;
        let task: Task = serde_json::from_str(raw).expect("deserialize task");

        assert_eq!(task.id, TaskId::new(3));
        assert_eq!(task.priority, Priority::High);
        assert!(task.is_focus_task());
        assert!(task.created_at.is_some());
        assert!(task.validate().is_ok());
    }

    #[test]
    fn missing_or_null_type_is_plain_todo() {
        let missing: Task = serde_json::from_str(r#"{"id": 1, "title": "a"}"#).expect("missing type");
        let null: Task =
            serde_json::from_str(r#"{"id": 2, "title": "b", "type": null}"#).expect("null type");

        assert_eq!(missing.kind, TaskKind::PlainTodo);
        assert_eq!(null.kind, TaskKind::PlainTodo);
        assert_eq!(missing.priority, Priority::Medium);
    }

    #[test]
    fn unknown_priority_falls_back_to_medium() {
        let task: Task =
            serde_json::from_str(r#"{"id": 1, "priority": "urgent"}"#).expect("unknown priority");
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.priority.label(), "P2");
    }

    #[test]
    fn named_priorities_deserialize_and_serialize_by_name() {
        for (raw, expected) in [
            ("high", Priority::High),
            ("p1", Priority::P1),
            ("medium", Priority::Medium),
            ("low", Priority::Low),
        ] {
            let payload = format!(r#"{{"id": 3, "priority": "{raw}"}}"#);
            let task: Task = serde_json::from_str(&payload).expect("named priority");
            assert_eq!(task.priority, expected);
            assert_eq!(
                serde_json::to_value(expected).expect("serialize priority"),
                serde_json::json!(raw)
            );
        }
    }

    #[test]
    fn priority_labels_follow_board_ranking() {
        assert_eq!(Priority::High.label(), "P0");
        assert_eq!(Priority::P1.label(), "P1");
        assert_eq!(Priority::Medium.label(), "P2");
        assert_eq!(Priority::Low.label(), "P3");
    }

    #[test]
    fn blank_title_uses_placeholder() {
        let mut task = sample_task();
        task.title = "   ".to_string();
        assert_eq!(task.display_title(), "Untitled task");
    }
}
