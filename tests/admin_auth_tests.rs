// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin route authorization tests.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{body_json, ADMIN_TOKEN};

fn admin_request(method: &str, uri: &str, token: Option<&str>, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
    builder.body(body).unwrap()
}

#[tokio::test]
async fn test_admin_requires_token() {
    let (app, _state, _dir) = common::create_test_app();

    let response = app
        .oneshot(admin_request("GET", "/api/admin/state", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "FORBIDDEN");
}

#[tokio::test]
async fn test_admin_rejects_wrong_token() {
    let (app, _state, _dir) = common::create_test_app();

    let response = app
        .oneshot(admin_request("GET", "/api/admin/state", Some("not-the-token"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_disabled_without_configured_token() {
    let (app, _state, _dir) = common::create_test_app_with(|config| {
        config.admin_token = String::new();
    });

    let response = app
        .oneshot(admin_request("GET", "/api/admin/state", Some(""), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_banner_roundtrip() {
    let (app, _state, _dir) = common::create_test_app();

    let response = app
        .clone()
        .oneshot(admin_request(
            "PUT",
            "/api/admin/banner",
            Some(ADMIN_TOKEN),
            Some(json!({"banner": "給水所は第二体育館に移動しました"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(admin_request("GET", "/api/banner", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["banner"],
        "給水所は第二体育館に移動しました"
    );
}

#[tokio::test]
async fn test_admin_policy_validation() {
    let (app, _state, _dir) = common::create_test_app();

    let response = app
        .clone()
        .oneshot(admin_request(
            "PUT",
            "/api/admin/moderation-policy",
            Some(ADMIN_TOKEN),
            Some(json!({"reportCautionThreshold": 0, "reportHideThreshold": 2})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(admin_request(
            "PUT",
            "/api/admin/moderation-policy",
            Some(ADMIN_TOKEN),
            Some(json!({"reportCautionThreshold": 2, "reportHideThreshold": 4})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["moderationPolicy"]["reportHideThreshold"], 4);
}

#[tokio::test]
async fn test_moderation_target_must_be_unambiguous() {
    let (app, _state, _dir) = common::create_test_app();

    let response = app
        .oneshot(admin_request(
            "POST",
            "/api/admin/moderation",
            Some(ADMIN_TOKEN),
            Some(json!({"action": "hide", "shelterId": "s1", "pinId": "p1"})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
