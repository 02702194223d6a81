// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily summary aggregation and route tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::NaiveDate;
use health_tracker::db::Store;
use health_tracker::models::{
    DailyWearable, HabitLog, NutritionLog, SupplementKind, SupplementLog,
};
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;
use common::{connect_whoop, cycle, spawn_app, workout, TestApp, TEST_USER};

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

fn seed_logs(app: &TestApp) {
    for (id, calories, protein, carbs, fat) in
        [("n1", 500.0, 30.0, 50.0, 10.0), ("n2", 300.0, 20.0, 20.0, 5.0)]
    {
        app.db.insert_nutrition_log(NutritionLog {
            id: id.to_string(),
            date: date(1),
            calories,
            protein,
            carbs,
            fat,
        });
    }
    app.db.insert_habit_log(HabitLog {
        id: "h1".to_string(),
        date: date(1),
        habit: "meditate".to_string(),
        completed: true,
    });
    app.db.insert_supplement_log(
        SupplementKind::Creatine,
        SupplementLog {
            id: "c1".to_string(),
            date: date(1),
            name: Some("creatine".to_string()),
            dose: Some(5.0),
            taken: true,
        },
    );
}

async fn send(app: &TestApp, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let token = common::session_token(&app.state);
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));
    let body = match body {
        Some(value) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .router
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, common::body_json(response).await)
}

#[tokio::test]
async fn test_nutrition_example_day() {
    let app = spawn_app().await;
    seed_logs(&app);

    let (status, body) = send(&app, "POST", "/daily-summary", Some(json!({ "date": "2024-03-01" }))).await;

    assert_eq!(status, StatusCode::OK);
    let summary = &body["summary"];
    assert_eq!(summary["date"], "2024-03-01");
    assert_eq!(summary["total_calories"], 800.0);
    assert_eq!(summary["total_protein"], 50.0);
    assert_eq!(summary["total_carbs"], 70.0);
    assert_eq!(summary["total_fat"], 15.0);
    assert_eq!(summary["nutrition_entries"], 2);
    assert_eq!(summary["all_habits_completed"], true);
    assert_eq!(summary["creatine_taken"], true);
}

#[tokio::test]
async fn test_regeneration_is_idempotent() {
    let app = spawn_app().await;
    seed_logs(&app);
    let mut day = DailyWearable::new(TEST_USER, date(1));
    day.recovery_score = Some(64.0);
    day.sleep_duration_minutes = Some(431.5);
    app.db.upsert_daily_wearables(&[day]).await.unwrap();

    let first = app.state.aggregator.sync_daily_summary(date(1)).await.unwrap();
    let second = app.state.aggregator.sync_daily_summary(date(1)).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.recovery_score, Some(64.0));
    assert_eq!(app.db.summary_count(), 1);
    assert_eq!(
        app.db.get_daily_summary(date(1)).await.unwrap(),
        Some(second)
    );
}

#[tokio::test]
async fn test_day_without_logs_is_zero() {
    let app = spawn_app().await;

    let summary = app.state.aggregator.sync_daily_summary(date(9)).await.unwrap();

    assert_eq!(summary.total_calories, 0.0);
    assert_eq!(summary.nutrition_entries, 0);
    assert_eq!(summary.habits_total, 0);
    assert!(!summary.creatine_taken);
    assert!(summary.recovery_score.is_none());
    assert_eq!(summary.whoop_workouts, 0);
}

#[tokio::test]
async fn test_aggregation_never_calls_vendor() {
    let app = spawn_app().await;
    common::connect_whoop(&app.state, 0).await;

    app.state.aggregator.sync_daily_summary(date(1)).await.unwrap();

    assert_eq!(app.whoop.total_calls(), 0);
}

#[tokio::test]
async fn test_get_routes_read_stored_summaries() {
    let app = spawn_app().await;
    seed_logs(&app);

    let (status, body) = send(&app, "GET", "/daily-summary?date=2024-03-01", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["summary"].is_null());

    let (status, body) = send(
        &app,
        "POST",
        "/daily-summary",
        Some(json!({ "startDate": "2024-03-01", "endDate": "2024-03-03" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    assert_eq!(body["summaries"].as_array().unwrap().len(), 3);
    assert!(body["failures"].as_array().unwrap().is_empty());

    let (_, body) = send(&app, "GET", "/daily-summary?date=2024-03-01", None).await;
    assert_eq!(body["summary"]["total_calories"], 800.0);

    let (status, body) = send(
        &app,
        "GET",
        "/daily-summary?startDate=2024-03-02&endDate=2024-03-05",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let app = spawn_app().await;

    let (status, _) = send(&app, "POST", "/daily-summary", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", "/daily-summary", Some(json!({ "date": "03/01/2024" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/daily-summary",
        Some(json!({ "startDate": "2024-01-01", "endDate": "2025-06-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_workouts_counted_on_local_day_with_their_cycle() {
    let app = spawn_app().await;
    connect_whoop(&app.state, 3600).await;

    // 23:30 on March 1st in New York is already March 2nd in UTC.
    let mut evening_cycle = cycle(7, "2024-03-02T04:30:00.000Z", 5.0, 4184.0);
    evening_cycle["timezone_offset"] = json!("-05:00");
    let mut evening_workout = workout(
        "late-run",
        "2024-03-02T04:30:00.000Z",
        "2024-03-02T05:15:00.000Z",
    );
    evening_workout["timezone_offset"] = json!("-05:00");
    app.whoop.set_records("cycle", vec![evening_cycle]);
    app.whoop.set_records("activity/workout", vec![evening_workout]);

    let report = app
        .state
        .sync
        .sync_range(TEST_USER, date(1), date(1))
        .await
        .unwrap();
    assert_eq!(report.imported, 2);

    let first = app.state.aggregator.sync_daily_summary(date(1)).await.unwrap();
    assert_eq!(first.strain, Some(5.0));
    assert_eq!(first.whoop_workouts, 1);

    let second = app.state.aggregator.sync_daily_summary(date(2)).await.unwrap();
    assert_eq!(second.strain, None);
    assert_eq!(second.whoop_workouts, 0);
}
