// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Range aggregation and scheduled daily sync tests.

use chrono::NaiveDate;
use health_tracker::error::AppError;
use health_tracker::models::NutritionLog;
use std::sync::atomic::Ordering;

mod common;
use common::{connect_whoop, cycle, recovery, spawn_app, TEST_USER};

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

#[tokio::test]
async fn test_range_continues_past_failed_day() {
    let app = spawn_app().await;
    for day in 1..=3 {
        app.db.insert_nutrition_log(NutritionLog {
            id: format!("n{}", day),
            date: date(day),
            calories: 100.0 * day as f64,
            protein: 0.0,
            carbs: 0.0,
            fat: 0.0,
        });
    }
    app.db.fail_reads_for(date(2));

    let report = app
        .state
        .orchestrator
        .run_for_range(date(1), date(3))
        .await
        .unwrap();

    assert_eq!(report.count, 3);
    let dates: Vec<NaiveDate> = report.summaries.iter().map(|s| s.date).collect();
    assert_eq!(dates, vec![date(1), date(3)]);
    assert_eq!(report.summaries[1].total_calories, 300.0);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].date, date(2));
    assert_eq!(app.db.summary_count(), 2);
}

#[tokio::test]
async fn test_range_rejects_bad_bounds() {
    let app = spawn_app().await;
    let orchestrator = &app.state.orchestrator;

    assert!(matches!(
        orchestrator.run_for_range(date(5), date(1)).await,
        Err(AppError::BadRequest(_))
    ));

    let far = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
    assert!(matches!(
        orchestrator.run_for_range(date(1), far).await,
        Err(AppError::BadRequest(_))
    ));
    assert_eq!(app.db.summary_count(), 0);
}

#[tokio::test]
async fn test_single_day_range() {
    let app = spawn_app().await;

    let report = app
        .state
        .orchestrator
        .run_for_range(date(4), date(4))
        .await
        .unwrap();

    assert_eq!(report.count, 1);
    assert_eq!(report.summaries.len(), 1);
}

#[tokio::test]
async fn test_daily_sync_pulls_wearable_data_first() {
    let app = spawn_app().await;
    connect_whoop(&app.state, 3600).await;
    app.whoop
        .set_records("cycle", vec![cycle(7, "2024-03-02T05:00:00Z", 9.0, 4184.0)]);
    app.whoop.set_records("recovery", vec![recovery(7, 81.0)]);

    let report = app.state.orchestrator.daily_sync(date(2)).await.unwrap();

    assert!(report.wearable_error.is_none());
    assert_eq!(report.wearable.unwrap().imported, 1);
    assert_eq!(report.summary.recovery_score, Some(81.0));
    assert_eq!(report.summary.strain, Some(9.0));
}

#[tokio::test]
async fn test_daily_sync_survives_vendor_outage() {
    let app = spawn_app().await;
    connect_whoop(&app.state, 3600).await;
    app.whoop
        .state
        .collections_down
        .store(true, Ordering::SeqCst);

    let report = app.state.orchestrator.daily_sync(date(2)).await.unwrap();

    assert!(report.wearable.is_none());
    assert!(report.wearable_error.is_some());
    assert_eq!(report.summary.date, date(2));
    assert_eq!(app.db.summary_count(), 1);
}

#[tokio::test]
async fn test_daily_sync_without_connection_skips_vendor() {
    let app = spawn_app().await;

    let report = app.state.orchestrator.daily_sync(date(2)).await.unwrap();

    assert!(report.wearable.is_none());
    assert!(report.wearable_error.is_none());
    assert_eq!(app.whoop.total_calls(), 0);
}

#[tokio::test]
async fn test_daily_sync_reports_unrefreshable_credential() {
    let app = spawn_app().await;
    app.whoop
        .state
        .token_endpoint_rejects
        .store(true, Ordering::SeqCst);
    connect_whoop(&app.state, 0).await;

    let report = app.state.orchestrator.daily_sync(date(2)).await.unwrap();

    assert!(report.wearable_error.is_some());
    assert_eq!(app.whoop.collection_calls(), 0);
    // Stale credential stays for a later retry.
    assert!(app
        .state
        .whoop
        .get_stored_credential(TEST_USER)
        .await
        .unwrap()
        .is_some());
}
