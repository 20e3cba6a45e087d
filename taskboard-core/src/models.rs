use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when a task is created. New tasks always start incomplete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTask {
    pub title: String,
    pub description: String,
}

/// Full replacement of a task's mutable fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskUpdate {
    pub title: String,
    pub description: String,
    pub completed: bool,
}

impl TaskUpdate {
    /// The update that leaves `task` as it is apart from `completed`.
    pub fn toggled(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            completed: !task.completed,
        }
    }
}

/// Returns the title if it contains anything besides whitespace.
pub fn required_title(raw: Option<&str>) -> Option<&str> {
    raw.filter(|title| !title.trim().is_empty())
}
