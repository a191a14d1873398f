#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use quiz_challenge_api::{
    config::Config,
    create_router,
    services::{
        quiz_source::{HttpQuizSource, QuizSource, StaticQuizSource},
        results_store::InMemoryResultsStore,
        AppState,
    },
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Test configuration. The countdown is slowed to a minute per tick so
/// timing never interferes with request-driven tests.
pub fn test_config() -> Config {
    Config {
        tick_interval_ms: 60_000,
        ..Config::default()
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// App backed by the bundled quiz and in-memory results.
pub async fn create_test_app() -> Router {
    let upstream: Arc<dyn QuizSource> =
        Arc::new(StaticQuizSource::embedded().expect("embedded quiz parses"));
    create_test_app_with(test_config(), upstream)
}

pub fn create_test_app_with(config: Config, upstream: Arc<dyn QuizSource>) -> Router {
    init_tracing();

    let app_state = Arc::new(
        AppState::from_parts(config, upstream, Arc::new(InMemoryResultsStore::new()))
            .expect("Failed to initialize test app state"),
    );

    create_router(app_state)
}

/// App whose quiz source is an HTTP server on a local port.
pub async fn create_proxy_app(upstream: Router, embedded_fallback: bool) -> Router {
    let url = spawn_upstream(upstream).await;
    let config = Config {
        quiz_source_url: url.clone(),
        embedded_fallback,
        ..test_config()
    };
    let source = HttpQuizSource::new(&url).expect("valid upstream url");
    create_test_app_with(config, Arc::new(source))
}

/// Serves `router` on an ephemeral port and returns the URL of its `/quiz` route.
pub async fn spawn_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind upstream");
    let addr = listener.local_addr().expect("upstream addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    format!("http://{}/quiz", addr)
}

/// Body text exactly as the router wrote it.
pub async fn get_text(app: &Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        // axum's own rejections are plain text
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    (status, json)
}

/// Creates a session and moves it to `playing`; returns its id.
pub async fn start_session(app: &Router) -> String {
    let (status, created) = send(app, "POST", "/api/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, begun) = send(app, "POST", &format!("/api/sessions/{}/begin", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(begun["phase"], "playing");

    id
}

pub async fn answer(app: &Router, id: &str, option_index: Option<usize>) -> Value {
    let (status, body) = send(
        app,
        "POST",
        &format!("/api/sessions/{}/answers", id),
        Some(serde_json::json!({ "option_index": option_index })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}
