// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, Response};
use shelter_community::config::Config;
use shelter_community::routes::create_router;
use shelter_community::AppState;
use std::sync::Arc;
use tempfile::TempDir;

/// Admin token configured for test apps.
#[allow(dead_code)]
pub const ADMIN_TOKEN: &str = "test_admin_token";

/// Create a test app backed by a fresh filesystem store.
/// Returns the router, the shared state, and the store directory guard.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, TempDir) {
    create_test_app_with(|_| {})
}

/// Like `create_test_app`, with a hook to adjust the config first.
#[allow(dead_code)]
pub fn create_test_app_with(
    adjust: impl FnOnce(&mut Config),
) -> (axum::Router, Arc<AppState>, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp store root");
    let mut config = Config {
        store_root: dir.path().to_path_buf(),
        admin_token: ADMIN_TOKEN.to_string(),
        ..Config::default()
    };
    adjust(&mut config);

    let state = Arc::new(AppState::new(config));
    (create_router(state.clone()), state, dir)
}

/// Build a JSON request.
#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "203.0.113.10")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Build a bodiless request.
#[allow(dead_code)]
pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", "203.0.113.10")
        .body(Body::empty())
        .unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}
