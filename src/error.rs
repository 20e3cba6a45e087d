use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub(crate) const GENERIC_INTERNAL_ERROR: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("Task not found")]
    TaskNotFound,
    #[error("Route not found")]
    RouteNotFound,
    #[error("Too many requests, please try again later.")]
    RateLimited { retry_after_secs: u64 },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Full message of an internal error, attached to the response so the error
/// handler can log it and decide whether the client may see it.
#[derive(Debug, Clone)]
pub(crate) struct InternalErrorDetail(pub(crate) String);

impl ApiError {
    pub(crate) fn title_required() -> Self {
        ApiError::Validation("Title is required".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::TaskNotFound | ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        ApiError::Validation("Invalid task id".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Internal(err) => {
                let mut response =
                    (status, Json(json!({ "error": GENERIC_INTERNAL_ERROR }))).into_response();
                response
                    .extensions_mut()
                    .insert(InternalErrorDetail(format!("{err:#}")));
                response
            }
            ApiError::RateLimited { retry_after_secs } => {
                let message = self.to_string();
                let mut response = (status, Json(json!({ "error": message }))).into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                response
            }
            other => (status, Json(json!({ "error": other.to_string() }))).into_response(),
        }
    }
}
