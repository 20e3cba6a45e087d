use std::time::Duration;

use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use axum::Router;
use serde_json::{Value, json};
use taskboard::{AppState, RateLimitPolicy, ServerOptions, build_router};
use taskboard_core::Database;
use tower::ServiceExt;

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("json body")
    }
}

fn unlimited() -> ServerOptions {
    ServerOptions {
        rate_limit: None,
        ..ServerOptions::development()
    }
}

async fn app_with(options: ServerOptions) -> (Router, Database) {
    let db = Database::in_memory().await.expect("in-memory database");
    let app = build_router(AppState::new(db.clone(), options));
    (app, db)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Reply {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", "198.51.100.4");
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&value).expect("encode"))
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).expect("request"))
        .await
        .expect("response");

    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes")
        .to_vec();
    Reply {
        status,
        headers,
        body,
    }
}

async fn create(app: &Router, title: &str, description: &str) -> Value {
    let reply = send(
        app,
        Method::POST,
        "/api/tasks",
        Some(json!({ "title": title, "description": description })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    reply.json()
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _db) = app_with(unlimited()).await;
    let reply = send(&app, Method::GET, "/api/health", None).await;

    assert_eq!(reply.status, StatusCode::OK);
    let body = reply.json();
    assert_eq!(body["status"], "OK");
    assert_eq!(body["message"], "Server is running");
    assert_eq!(body["environment"], "development");
    assert!(body["uptime"].as_f64().expect("uptime") >= 0.0);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn list_starts_empty() {
    let (app, _db) = app_with(unlimited()).await;
    let reply = send(&app, Method::GET, "/api/tasks", None).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!([]));
}

#[tokio::test]
async fn create_echoes_payload_with_defaults() {
    let (app, _db) = app_with(unlimited()).await;
    let task = create(&app, "Test Task 1", "This is a test task").await;

    assert_eq!(task["title"], "Test Task 1");
    assert_eq!(task["description"], "This is a test task");
    assert_eq!(task["completed"], false);
    assert!(task["id"].as_i64().expect("id") > 0);
    assert!(task["created_at"].is_string());
    assert!(task["updated_at"].is_string());
}

#[tokio::test]
async fn create_without_description_stores_empty_text() {
    let (app, _db) = app_with(unlimited()).await;
    let reply = send(
        &app,
        Method::POST,
        "/api/tasks",
        Some(json!({ "title": "Only a title" })),
    )
    .await;

    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.json()["description"], "");
}

#[tokio::test]
async fn create_without_title_is_rejected_and_not_persisted() {
    let (app, db) = app_with(unlimited()).await;

    for body in [json!({ "description": "No title" }), json!({ "title": "" })] {
        let reply = send(&app, Method::POST, "/api/tasks", Some(body)).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.json(), json!({ "error": "Title is required" }));
    }

    assert!(db.list_tasks().await.expect("list").is_empty());
}

#[tokio::test]
async fn empty_body_is_treated_as_missing_title() {
    let (app, db) = app_with(unlimited()).await;

    let reply = send(&app, Method::POST, "/api/tasks", None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json(), json!({ "error": "Title is required" }));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/tasks")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body: Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(body, json!({ "error": "Title is required" }));

    let created = create(&app, "Kept", "").await;
    let reply = send(&app, Method::PUT, &format!("/api/tasks/{}", created["id"]), None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json(), json!({ "error": "Title is required" }));

    assert_eq!(db.list_tasks().await.expect("list").len(), 1);
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let (app, _db) = app_with(unlimited()).await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/tasks")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"title\": "))
        .expect("request");

    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body: Value = serde_json::from_slice(&body).expect("json");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn get_returns_created_task_or_404() {
    let (app, _db) = app_with(unlimited()).await;
    let created = create(&app, "Test Task 1", "This is a test task").await;
    let id = created["id"].as_i64().expect("id");

    let reply = send(&app, Method::GET, &format!("/api/tasks/{id}"), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), created);

    let missing = send(&app, Method::GET, "/api/tasks/99999", None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.json(), json!({ "error": "Task not found" }));
}

#[tokio::test]
async fn non_numeric_id_is_rejected() {
    let (app, _db) = app_with(unlimited()).await;
    let reply = send(&app, Method::GET, "/api/tasks/abc", None).await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json(), json!({ "error": "Invalid task id" }));
}

#[tokio::test]
async fn update_replaces_all_fields() {
    let (app, _db) = app_with(unlimited()).await;
    let created = create(&app, "Test Task 1", "This is a test task").await;
    let id = created["id"].as_i64().expect("id");

    let reply = send(
        &app,
        Method::PUT,
        &format!("/api/tasks/{id}"),
        Some(json!({
            "title": "Test Task 1 Updated",
            "description": "Updated description",
            "completed": true
        })),
    )
    .await;

    assert_eq!(reply.status, StatusCode::OK);
    let updated = reply.json();
    assert_eq!(updated["id"], created["id"]);
    assert_eq!(updated["title"], "Test Task 1 Updated");
    assert_eq!(updated["description"], "Updated description");
    assert_eq!(updated["completed"], true);
    assert_eq!(updated["created_at"], created["created_at"]);
}

#[tokio::test]
async fn update_of_missing_task_is_404() {
    let (app, _db) = app_with(unlimited()).await;
    let reply = send(
        &app,
        Method::PUT,
        "/api/tasks/99999",
        Some(json!({ "title": "x", "description": "", "completed": true })),
    )
    .await;

    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.json(), json!({ "error": "Task not found" }));
}

#[tokio::test]
async fn delete_then_fetch_is_404_and_repeat_delete_succeeds() {
    let (app, _db) = app_with(unlimited()).await;
    let created = create(&app, "Test Task 1", "").await;
    let uri = format!("/api/tasks/{}", created["id"]);

    for _ in 0..2 {
        let reply = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(
            reply.json(),
            json!({ "message": "Task deleted successfully" })
        );
    }

    let reply = send(&app, Method::GET, &uri, None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_contains_created_tasks_newest_first() {
    let (app, _db) = app_with(unlimited()).await;
    let older = create(&app, "older", "first").await;
    let newer = create(&app, "newer", "second").await;

    let reply = send(&app, Method::GET, "/api/tasks", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!([newer, older]));
}

#[tokio::test]
async fn unknown_routes_are_404() {
    let (app, _db) = app_with(unlimited()).await;

    let reply = send(&app, Method::GET, "/api/nothing-here", None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.json(), json!({ "error": "Route not found" }));

    for (method, uri) in [
        (Method::PATCH, "/api/tasks/1"),
        (Method::POST, "/api/health"),
        (Method::DELETE, "/"),
    ] {
        let reply = send(&app, method, uri, None).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert_eq!(reply.json(), json!({ "error": "Route not found" }));
    }
}

#[tokio::test]
async fn slow_requests_are_served_unchanged() {
    let (app, _db) = app_with(ServerOptions {
        slow_request_threshold: Duration::ZERO,
        ..unlimited()
    })
    .await;

    let reply = send(&app, Method::GET, "/api/health", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["status"], "OK");

    let created = create(&app, "Still works", "").await;
    assert_eq!(created["title"], "Still works");
}

#[tokio::test]
async fn responses_carry_security_and_cors_headers() {
    let (app, _db) = app_with(unlimited()).await;
    let request = Request::builder()
        .uri("/api/health")
        .header(header::ORIGIN, "http://localhost:8080")
        .body(Body::empty())
        .expect("request");

    let response = app.oneshot(request).await.expect("response");
    let headers = response.headers();
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::X_FRAME_OPTIONS], "SAMEORIGIN");
    assert_eq!(headers[header::CONTENT_SECURITY_POLICY], "default-src 'self'");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn mutations_hit_the_stricter_limit_first() {
    let options = ServerOptions {
        rate_limit: Some(RateLimitPolicy {
            window: Duration::from_secs(60),
            max_requests: 100,
            max_mutations: 2,
        }),
        ..ServerOptions::development()
    };
    let (app, db) = app_with(options).await;

    create(&app, "one", "").await;
    create(&app, "two", "").await;

    let reply = send(
        &app,
        Method::POST,
        "/api/tasks",
        Some(json!({ "title": "three" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::TOO_MANY_REQUESTS);
    assert!(reply.headers.contains_key(header::RETRY_AFTER));
    assert_eq!(
        reply.json(),
        json!({ "error": "Too many requests, please try again later." })
    );
    assert_eq!(db.list_tasks().await.expect("list").len(), 2);

    let reply = send(&app, Method::GET, "/api/tasks", None).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn general_limit_covers_reads() {
    let options = ServerOptions {
        rate_limit: Some(RateLimitPolicy {
            window: Duration::from_secs(60),
            max_requests: 1,
            max_mutations: 1,
        }),
        ..ServerOptions::development()
    };
    let (app, _db) = app_with(options).await;

    assert_eq!(
        send(&app, Method::GET, "/api/health", None).await.status,
        StatusCode::OK
    );
    assert_eq!(
        send(&app, Method::GET, "/api/health", None).await.status,
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn store_failures_show_detail_in_development() {
    let (app, db) = app_with(unlimited()).await;
    db.close().await;

    let reply = send(&app, Method::GET, "/api/tasks", None).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = reply.json()["error"]
        .as_str()
        .expect("error message")
        .to_string();
    assert!(!error.is_empty());
    assert_ne!(error, "Internal server error");
}

#[tokio::test]
async fn store_failures_are_generic_in_production() {
    let options = ServerOptions {
        rate_limit: None,
        ..ServerOptions::production("unused.log")
    };
    let (app, db) = app_with(options).await;
    db.close().await;

    let reply = send(&app, Method::GET, "/api/tasks/1", None).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.json(), json!({ "error": "Internal server error" }));
}

#[tokio::test]
async fn index_page_escapes_task_text() {
    let (app, _db) = app_with(unlimited()).await;
    create(&app, "<b>bold</b>", "fish & chips").await;

    let reply = send(&app, Method::GET, "/", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let html = String::from_utf8(reply.body).expect("utf-8");
    assert!(html.contains("&lt;b&gt;bold&lt;/b&gt;"));
    assert!(html.contains("fish &amp; chips"));
    assert!(html.contains("<span id=\"totalTasks\">1</span>"));
}
