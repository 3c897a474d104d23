// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Report thresholds and admin overrides through the HTTP API.

use axum::http::{header, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;
use common::{body_json, empty_request, json_request, ADMIN_TOKEN};

async fn post_comment(app: &Router, device: &str, text: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/shelters/s1/comments",
            json!({"deviceId": device, "text": text}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_str().unwrap().to_string()
}

async fn report(app: &Router, comment_id: &str, reporter: &str) -> Value {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/shelters/s1/comments/{}/report", comment_id),
            json!({"deviceId": reporter}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

async fn community(app: &Router) -> Value {
    let response = app
        .clone()
        .oneshot(empty_request("GET", "/api/shelters/s1/community"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

async fn moderate(app: &Router, action: &str, comment_id: &str) -> Value {
    let mut request = json_request(
        "POST",
        "/api/admin/moderation",
        json!({"action": action, "shelterId": "s1", "commentId": comment_id}),
    );
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {}", ADMIN_TOKEN).parse().unwrap(),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

fn test_app() -> (Router, tempfile::TempDir) {
    let (app, _state, dir) = common::create_test_app_with(|config| {
        config.route_budgets.report = 100;
        config.route_budgets.write = 100;
    });
    (app, dir)
}

#[tokio::test]
async fn test_reporting_is_idempotent_per_reporter() {
    let (app, _dir) = test_app();
    let id = post_comment(&app, "author", "トイレが使えません").await;

    for _ in 0..5 {
        let state = report(&app, &id, "same-reporter").await;
        assert_eq!(state["state"], "VISIBLE");
    }

    let view = community(&app).await;
    assert_eq!(view["commentCount"], 1);
    assert_eq!(view["comments"][0]["cautioned"], false);
}

#[tokio::test]
async fn test_threshold_transitions() {
    let (app, _dir) = test_app();
    let id = post_comment(&app, "author", "spam").await;
    post_comment(&app, "someone", "毛布の配布あり").await;

    for i in 0..2 {
        report(&app, &id, &format!("r{}", i)).await;
    }
    // One below the caution threshold: listed, not flagged.
    let view = community(&app).await;
    assert_eq!(view["commentCount"], 2);
    assert_eq!(view["hiddenCount"], 0);

    assert_eq!(report(&app, &id, "r2").await["state"], "CAUTIONED");
    let view = community(&app).await;
    let flagged: Vec<bool> = view["comments"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|c| c["id"] == id.as_str())
        .map(|c| c["cautioned"].as_bool().unwrap())
        .collect();
    assert_eq!(flagged, vec![true]);

    for i in 3..6 {
        report(&app, &id, &format!("r{}", i)).await;
    }
    let view = community(&app).await;
    assert_eq!(view["hiddenCount"], 1);
    assert_eq!(view["commentCount"], 1);
    // The pile-on collapses the whole list.
    assert_eq!(view["commentsCollapsed"], true);
    assert_eq!(view["comments"], json!([]));

    // Clearing reports on the hidden comment reopens the list.
    moderate(&app, "clearReports", &id).await;
    let view = community(&app).await;
    assert_eq!(view["commentsCollapsed"], false);
    assert_eq!(view["commentCount"], 2);
}

#[tokio::test]
async fn test_admin_hide_survives_report_reset() {
    let (app, _dir) = test_app();
    let id = post_comment(&app, "author", "デマ情報").await;
    report(&app, &id, "r1").await;

    let outcome = moderate(&app, "hide", &id).await;
    assert_eq!(outcome["state"], json!({"state": "HIDDEN", "by": "ADMIN"}));

    let outcome = moderate(&app, "clearReports", &id).await;
    assert_eq!(outcome["state"]["state"], "HIDDEN");

    let view = community(&app).await;
    assert_eq!(view["hiddenCount"], 1);
    assert_eq!(view["commentCount"], 0);
}

#[tokio::test]
async fn test_admin_hide_sticks_after_delete_and_resubmit() {
    let (app, _dir) = test_app();
    let id = post_comment(&app, "author", "spam").await;
    moderate(&app, "hide", &id).await;

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", "/api/shelters/s1/community/author"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["commentsRemoved"], 1);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/shelters/s1/comments",
            json!({"deviceId": "author", "text": "spam again"}),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["hidden"], true);

    let view = community(&app).await;
    assert_eq!(view["commentCount"], 0);
    assert_eq!(view["hiddenCount"], 1);
}

#[tokio::test]
async fn test_admin_delete_removes_comment() {
    let (app, _dir) = test_app();
    let id = post_comment(&app, "author", "hello").await;

    let outcome = moderate(&app, "delete", &id).await;
    assert_eq!(outcome["state"], Value::Null);

    let view = community(&app).await;
    assert_eq!(view["commentCount"], 0);
    assert_eq!(view["hiddenCount"], 0);
}
