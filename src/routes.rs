use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::CorsPolicy;
use crate::handlers;
use crate::middleware::{
    handle_errors, limit_mutations, limit_requests, panic_response, probe_slow_requests,
};
use crate::state::AppState;

fn security_headers() -> [(HeaderName, HeaderValue); 6] {
    [
        (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        (header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN")),
        (header::REFERRER_POLICY, HeaderValue::from_static("no-referrer")),
        (header::X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("off")),
        (
            HeaderName::from_static("cross-origin-opener-policy"),
            HeaderValue::from_static("same-origin"),
        ),
        (
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'self'"),
        ),
    ]
}

fn task_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/tasks",
            get(handlers::list_tasks)
                .post(handlers::create_task)
                .fallback(handlers::route_not_found),
        )
        .route(
            "/api/tasks/{id}",
            get(handlers::get_task)
                .put(handlers::update_task)
                .delete(handlers::delete_task)
                .fallback(handlers::route_not_found),
        )
        .route_layer(from_fn_with_state(state, limit_mutations))
}

fn cors_layer(policy: &CorsPolicy) -> CorsLayer {
    match policy {
        CorsPolicy::AllowAll => CorsLayer::permissive(),
        CorsPolicy::Origins(origins) => {
            let allowed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(err) => {
                        tracing::warn!("ignoring invalid CORS origin '{origin}': {err}");
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(allowed))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE])
        }
    }
}

/// The full application. Layers are listed innermost first; requests pass
/// CORS, security headers, rate limiting, logging, the slow-request probe and
/// the error handler before reaching a route.
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .merge(task_routes(state.clone()))
        .route(
            "/api/health",
            get(handlers::health).fallback(handlers::route_not_found),
        )
        .route("/", get(handlers::index).fallback(handlers::route_not_found))
        .fallback(handlers::route_not_found)
        .with_state(state.clone())
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn_with_state(state.clone(), handle_errors))
        .layer(from_fn_with_state(state.clone(), probe_slow_requests))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(from_fn_with_state(state.clone(), limit_requests));

    for (name, value) in security_headers() {
        router = router.layer(SetResponseHeaderLayer::if_not_present(name, value));
    }

    router.layer(cors_layer(&state.options.cors_policy))
}
