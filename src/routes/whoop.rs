// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Whoop connection and sync routes for the signed-in user.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::routes::auth::SuccessResponse;
use crate::routes::validation::ValidatedJson;
use crate::services::{ConnectionStatus, SyncReport};
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

const DEFAULT_LOOKBACK_DAYS: u32 = 7;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/whoop/status", get(status))
        .route("/whoop/sync", post(sync_range))
        .route("/whoop/workouts/sync", post(sync_workouts))
        .route("/whoop/disconnect", post(disconnect))
}

async fn status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ConnectionStatus>> {
    Ok(Json(state.whoop.connection_status(&user.user_id).await?))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SyncRangeRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

async fn sync_range(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<SyncRangeRequest>,
) -> Result<Json<SyncReport>> {
    let report = state
        .sync
        .sync_range(&user.user_id, body.start_date, body.end_date)
        .await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize, Validate)]
pub struct WorkoutSyncRequest {
    #[validate(range(min = 1, max = 90, message = "days must be between 1 and 90"))]
    #[serde(default = "default_lookback")]
    pub days: u32,
}

fn default_lookback() -> u32 {
    DEFAULT_LOOKBACK_DAYS
}

async fn sync_workouts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<WorkoutSyncRequest>,
) -> Result<Json<SyncReport>> {
    let report = state
        .sync
        .sync_workouts(&user.user_id, body.days)
        .await?;
    Ok(Json(report))
}

async fn disconnect(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SuccessResponse>> {
    state.whoop.disconnect(&user.user_id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workout_sync_days_default_and_bounds() {
        let body: WorkoutSyncRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(body.days, 7);
        assert!(body.validate().is_ok());

        let zero: WorkoutSyncRequest = serde_json::from_str(r#"{"days":0}"#).unwrap();
        assert!(zero.validate().is_err());

        let too_many: WorkoutSyncRequest = serde_json::from_str(r#"{"days":91}"#).unwrap();
        assert!(too_many.validate().is_err());
    }
}
