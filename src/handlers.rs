use axum::body::{Body, to_bytes};
use axum::extract::rejection::PathRejection;
use axum::extract::{FromRequest, Path, Request, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use taskboard_core::view::{TaskListView, render_html};
use taskboard_core::{NewTask, Task, TaskUpdate, required_title};

use crate::error::ApiError;
use crate::state::AppState;

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// JSON request body where an empty payload reads as `{}`.
pub(crate) struct JsonBody<T>(pub(crate) T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();
        let bytes = to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|err| ApiError::Validation(format!("Failed to read request body: {err}")))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(T::default()));
        }

        let request = Request::from_parts(parts, Body::from(bytes));
        let Json(value) = Json::<T>::from_request(request, state).await?;
        Ok(Self(value))
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CreateTaskRequest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl CreateTaskRequest {
    fn validate(self) -> Result<NewTask, ApiError> {
        let title = required_title(self.title.as_deref()).ok_or_else(ApiError::title_required)?;
        Ok(NewTask {
            title: title.to_string(),
            description: self.description.unwrap_or_default(),
        })
    }
}

/// Body of a full replacement. Omitted fields reset to their empty values.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct UpdateTaskRequest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    completed: Option<bool>,
}

impl UpdateTaskRequest {
    fn validate(self) -> Result<TaskUpdate, ApiError> {
        let title = required_title(self.title.as_deref()).ok_or_else(ApiError::title_required)?;
        Ok(TaskUpdate {
            title: title.to_string(),
            description: self.description.unwrap_or_default(),
            completed: self.completed.unwrap_or(false),
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct MessageResponse {
    message: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
    message: &'static str,
    timestamp: DateTime<Utc>,
    uptime: f64,
    environment: &'static str,
}

pub(crate) async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = state.db.list_tasks().await?;
    Ok(Json(tasks))
}

pub(crate) async fn get_task(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Task>, ApiError> {
    let Path(id) = id?;
    let task = state.db.get_task(id).await?.ok_or(ApiError::TaskNotFound)?;
    Ok(Json(task))
}

pub(crate) async fn create_task(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let new_task = request.validate()?;

    let task = state.db.create_task(&new_task).await?;
    tracing::info!(task_id = task.id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

pub(crate) async fn update_task(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    JsonBody(request): JsonBody<UpdateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    let Path(id) = id?;
    let update = request.validate()?;

    let task = state
        .db
        .update_task(id, &update)
        .await?
        .ok_or(ApiError::TaskNotFound)?;
    Ok(Json(task))
}

/// Succeeds whether or not the task existed.
pub(crate) async fn delete_task(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(id) = id?;
    if !state.db.delete_task(id).await? {
        tracing::debug!(task_id = id, "delete requested for a task that does not exist");
    }
    Ok(Json(MessageResponse {
        message: "Task deleted successfully",
    }))
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: "Server is running",
        timestamp: Utc::now(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        environment: state.options.mode.as_str(),
    })
}

pub(crate) async fn index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let tasks = state.db.list_tasks().await?;
    let body = render_html(&TaskListView::from_tasks(&tasks));
    Ok(Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Taskboard</title>\n</head>\n<body>\n<h1>Taskboard</h1>\n{body}\n</body>\n</html>\n"
    )))
}

pub(crate) async fn route_not_found() -> ApiError {
    ApiError::RouteNotFound
}
