// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily summary routes.

use crate::error::{AppError, Result};
use crate::models::DailySummary;
use crate::routes::validation::ValidatedJson;
use crate::services::sync::validate_range;
use crate::services::RangeReport;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/daily-summary", get(get_summary).post(sync_summary))
}

/// Either `date`, or `startDate` with `endDate`.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    pub date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// What a [`SummaryRequest`] selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSelection {
    Single(NaiveDate),
    Range(NaiveDate, NaiveDate),
}

impl SummaryRequest {
    pub fn selection(&self) -> Result<DateSelection> {
        match (self.date, self.start_date, self.end_date) {
            (Some(date), None, None) => Ok(DateSelection::Single(date)),
            (None, Some(start), Some(end)) => {
                validate_range(start, end)?;
                Ok(DateSelection::Range(start, end))
            }
            _ => Err(AppError::BadRequest(
                "provide either date or startDate and endDate".to_string(),
            )),
        }
    }
}

#[derive(Serialize)]
pub struct SingleSummaryResponse {
    pub summary: Option<DailySummary>,
}

#[derive(Serialize)]
pub struct SummaryListResponse {
    pub count: usize,
    pub summaries: Vec<DailySummary>,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum SummaryResponse {
    Single(SingleSummaryResponse),
    List(SummaryListResponse),
    Range(RangeReport),
}

/// Read stored summaries without recomputing.
async fn get_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SummaryRequest>,
) -> Result<Json<SummaryResponse>> {
    let response = match params.selection()? {
        DateSelection::Single(date) => SummaryResponse::Single(SingleSummaryResponse {
            summary: state.aggregator.get_daily_summary(date).await?,
        }),
        DateSelection::Range(start, end) => {
            let summaries = state.aggregator.get_summaries(start, end).await?;
            SummaryResponse::List(SummaryListResponse {
                count: summaries.len(),
                summaries,
            })
        }
    };
    Ok(Json(response))
}

/// Recompute and store summaries.
async fn sync_summary(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<SummaryRequest>,
) -> Result<Json<SummaryResponse>> {
    let response = match body.selection()? {
        DateSelection::Single(date) => {
            let summary = state.orchestrator.run_for_date(date).await?;
            SummaryResponse::Single(SingleSummaryResponse {
                summary: Some(summary),
            })
        }
        DateSelection::Range(start, end) => {
            SummaryResponse::Range(state.orchestrator.run_for_range(start, end).await?)
        }
    };
    Ok(Json(response))
}
