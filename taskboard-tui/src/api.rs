use anyhow::{Result, anyhow};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use taskboard_core::{NewTask, Task, TaskUpdate};

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api/tasks";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Thin client for the task collection endpoint.
#[derive(Debug, Clone)]
pub struct TaskClient {
    http: Client,
    base_url: String,
}

impl TaskClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: Client::new(),
            base_url,
        }
    }

    fn task_url(&self, task_id: i64) -> String {
        format!("{}/{}", self.base_url, task_id)
    }

    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        let res = self.http.get(&self.base_url).send().await?;
        decode(res, "load tasks").await
    }

    pub async fn get_task(&self, task_id: i64) -> Result<Task> {
        let res = self.http.get(self.task_url(task_id)).send().await?;
        decode(res, "load task").await
    }

    pub async fn create_task(&self, task: &NewTask) -> Result<Task> {
        let res = self.http.post(&self.base_url).json(task).send().await?;
        decode(res, "add task").await
    }

    pub async fn update_task(&self, task_id: i64, update: &TaskUpdate) -> Result<Task> {
        let res = self
            .http
            .put(self.task_url(task_id))
            .json(update)
            .send()
            .await?;
        decode(res, "update task").await
    }

    pub async fn delete_task(&self, task_id: i64) -> Result<()> {
        let res = self.http.delete(self.task_url(task_id)).send().await?;
        decode::<serde_json::Value>(res, "delete task").await?;
        Ok(())
    }
}

async fn decode<T: DeserializeOwned>(res: Response, action: &str) -> Result<T> {
    let status = res.status();
    if status.is_success() {
        return Ok(res.json::<T>().await?);
    }

    let text = res.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);
    Err(anyhow!("Failed to {action}: {message} ({status})"))
}
