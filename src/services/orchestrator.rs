// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Drives aggregation over single dates and ranges, and the scheduled
//! daily sync.

use crate::error::{AppError, Result};
use crate::models::DailySummary;
use crate::services::aggregator::DailyAggregator;
use crate::services::sync::{validate_range, SyncReport, WearableSync};
use crate::services::whoop::WhoopService;
use crate::time_utils::dates_inclusive;
use chrono::{Duration, NaiveDate};
use serde::Serialize;

/// A day that could not be aggregated.
#[derive(Debug, Clone, Serialize)]
pub struct DayFailure {
    pub date: NaiveDate,
    pub error: String,
}

/// Result of aggregating a date range.
#[derive(Debug, Clone, Serialize)]
pub struct RangeReport {
    /// Days processed, successful or not
    pub count: usize,
    pub summaries: Vec<DailySummary>,
    pub failures: Vec<DayFailure>,
}

/// Result of the scheduled daily sync.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySyncReport {
    pub summary: DailySummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wearable: Option<SyncReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wearable_error: Option<String>,
}

#[derive(Clone)]
pub struct Orchestrator {
    aggregator: DailyAggregator,
    sync: WearableSync,
    whoop: WhoopService,
    owner_user_id: Option<String>,
}

impl Orchestrator {
    pub fn new(
        aggregator: DailyAggregator,
        sync: WearableSync,
        whoop: WhoopService,
        owner_user_id: Option<String>,
    ) -> Self {
        Self {
            aggregator,
            sync,
            whoop,
            owner_user_id,
        }
    }

    pub async fn run_for_date(&self, date: NaiveDate) -> Result<DailySummary> {
        self.aggregator.sync_daily_summary(date).await
    }

    /// Aggregate every day in `start..=end`, in order.
    ///
    /// A failed day is recorded and the rest of the range still runs.
    pub async fn run_for_range(&self, start: NaiveDate, end: NaiveDate) -> Result<RangeReport> {
        validate_range(start, end)?;

        let mut report = RangeReport {
            count: 0,
            summaries: Vec::new(),
            failures: Vec::new(),
        };
        for date in dates_inclusive(start, end) {
            report.count += 1;
            match self.run_for_date(date).await {
                Ok(summary) => report.summaries.push(summary),
                Err(e) => {
                    tracing::warn!(%date, error = %e, "Daily summary failed, continuing range");
                    report.failures.push(DayFailure {
                        date,
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            %start,
            %end,
            count = report.count,
            failures = report.failures.len(),
            "Range aggregation complete"
        );
        Ok(report)
    }

    /// Scheduled job: refresh the owner's wearable cache for yesterday and
    /// today, then aggregate `date`.
    ///
    /// The wearable step is best effort. Its failure is reported alongside
    /// the summary but never prevents aggregation.
    pub async fn daily_sync(&self, date: NaiveDate) -> Result<DailySyncReport> {
        let (wearable, wearable_error) = match self.sync_owner_wearable(date).await {
            Ok(report) => (report, None),
            Err(e) => {
                tracing::warn!(%date, error = %e, "Wearable sync failed, aggregating cached data");
                (None, Some(e.to_string()))
            }
        };

        let summary = self.run_for_date(date).await?;
        Ok(DailySyncReport {
            summary,
            wearable,
            wearable_error,
        })
    }

    async fn sync_owner_wearable(&self, date: NaiveDate) -> Result<Option<SyncReport>> {
        let Some(user_id) = self.owner_user_id.as_deref() else {
            tracing::debug!("No owner user configured, skipping wearable sync");
            return Ok(None);
        };
        if self.whoop.get_stored_credential(user_id).await?.is_none() {
            tracing::info!(user_id, "Owner has not connected Whoop, skipping wearable sync");
            return Ok(None);
        }

        match self
            .sync
            .sync_range(user_id, date - Duration::days(1), date)
            .await
        {
            Ok(report) => Ok(Some(report)),
            // Stored credential could not be refreshed.
            Err(AppError::Unauthorized) => Err(AppError::UpstreamUnavailable(
                "Whoop credential could not be refreshed".to_string(),
            )),
            Err(e) => Err(e),
        }
    }
}
