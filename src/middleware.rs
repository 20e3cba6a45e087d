use std::any::Any;
use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::{ApiError, InternalErrorDetail};
use crate::rate_limit::{RateLimiter, retry_after_secs};
use crate::state::AppState;

const ANONYMOUS_CLIENT: &str = "unknown";

/// First `x-forwarded-for` hop, else the peer address.
pub(crate) fn client_key(request: &Request) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| ANONYMOUS_CLIENT.to_string())
}

pub(crate) fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Takes owned values: the request must not be borrowed across the await.
async fn enforce(limiter: &RateLimiter, key: String, path: String) -> Result<(), ApiError> {
    limiter.acquire(&key).await.map_err(|wait| {
        tracing::warn!(client = %key, %path, "rate limit exceeded");
        ApiError::RateLimited {
            retry_after_secs: retry_after_secs(wait),
        }
    })
}

pub(crate) async fn limit_requests(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(limiters) = &state.limiters {
        let key = client_key(&request);
        let path = request.uri().path().to_owned();
        enforce(&limiters.requests, key, path).await?;
    }
    Ok(next.run(request).await)
}

/// Stricter budget applied to task routes for writes only.
pub(crate) async fn limit_mutations(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(limiters) = &state.limiters {
        if is_mutating(request.method()) {
            let key = client_key(&request);
            let path = request.uri().path().to_owned();
            enforce(&limiters.mutations, key, path).await?;
        }
    }
    Ok(next.run(request).await)
}

pub(crate) async fn probe_slow_requests(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let elapsed = started.elapsed();
    if elapsed > state.options.slow_request_threshold {
        tracing::warn!(
            %method,
            %path,
            elapsed_ms = elapsed.as_millis() as u64,
            "slow request"
        );
    }
    response
}

/// Logs internal failures and strips their detail from the body unless the
/// server runs in development mode.
pub(crate) async fn handle_errors(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let mut response = next.run(request).await;

    let Some(InternalErrorDetail(detail)) =
        response.extensions_mut().remove::<InternalErrorDetail>()
    else {
        return response;
    };

    tracing::error!(%method, %path, error = %detail, "request failed");
    if state.options.mode.exposes_error_details() {
        return (response.status(), Json(json!({ "error": detail }))).into_response();
    }
    response
}

pub(crate) fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    ApiError::Internal(anyhow::anyhow!("handler panicked: {message}")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with(headers: &[(&str, &str)]) -> Request {
        let mut builder = Request::builder().uri("/api/tasks");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).expect("request")
    }

    #[test]
    fn client_key_prefers_forwarded_for() {
        let request = request_with(&[("x-forwarded-for", "203.0.113.7, 10.0.0.1")]);
        assert_eq!(client_key(&request), "203.0.113.7");
    }

    #[test]
    fn client_key_falls_back_to_peer_address() {
        let mut request = request_with(&[]);
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 20], 51000))));
        assert_eq!(client_key(&request), "192.168.1.20");
    }

    #[test]
    fn client_key_without_any_source() {
        assert_eq!(client_key(&request_with(&[])), ANONYMOUS_CLIENT);
    }

    #[test]
    fn only_writes_are_mutating() {
        assert!(is_mutating(&Method::POST));
        assert!(is_mutating(&Method::PUT));
        assert!(is_mutating(&Method::DELETE));
        assert!(!is_mutating(&Method::GET));
        assert!(!is_mutating(&Method::OPTIONS));
    }

    #[test]
    fn panics_become_internal_errors() {
        let response = panic_response(Box::new("index out of bounds"));
        assert_eq!(response.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        let detail = response
            .extensions()
            .get::<InternalErrorDetail>()
            .expect("detail");
        assert_eq!(detail.0, "handler panicked: index out of bounds");
    }
}
