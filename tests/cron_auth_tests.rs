// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cron endpoint authentication tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

mod common;

fn cron_request(auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("GET")
        .uri("/cron/daily-sync?date=2024-03-01");
    if let Some(value) = auth {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_cron_requires_bearer() {
    let (app, state) = common::create_test_app();

    let response = app.clone().oneshot(cron_request(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(cron_request(Some("Bearer wrong_secret")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A user session is not a cron credential.
    let session = common::session_token(&state);
    let response = app
        .oneshot(cron_request(Some(&format!("Bearer {}", session))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cron_with_secret_runs_daily_sync() {
    let app = common::spawn_app().await;

    let response = app
        .router
        .oneshot(cron_request(Some("Bearer test_cron_secret")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["summary"]["date"], "2024-03-01");
    assert!(body.get("wearableError").is_none());
    assert_eq!(app.db.summary_count(), 1);
}

#[tokio::test]
async fn test_cron_without_configured_secret() {
    let whoop = common::FakeWhoop::start().await;
    let mut config = common::test_config(&whoop);
    config.cron_secret = None;
    let app = common::spawn_app_with_config(whoop, config);

    let response = app
        .router
        .oneshot(cron_request(Some("Bearer test_cron_secret")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "configuration_error");
    assert_eq!(app.db.summary_count(), 0);
}
