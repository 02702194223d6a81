// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scheduled job routes. Authenticated by `require_cron_auth` in
//! routes/mod.rs.

use crate::error::Result;
use crate::services::DailySyncReport;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/cron/daily-sync", get(daily_sync))
}

#[derive(Debug, Deserialize)]
pub struct DailySyncParams {
    /// Defaults to today (UTC)
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

async fn daily_sync(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DailySyncParams>,
) -> Result<Json<DailySyncReport>> {
    let date = params.date.unwrap_or_else(|| Utc::now().date_naive());
    tracing::info!(%date, "Cron daily sync triggered");
    Ok(Json(state.orchestrator.daily_sync(date).await?))
}
