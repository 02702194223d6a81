// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Supabase (PostgREST) client implementing [`Store`].
//!
//! Upserts are `POST ?on_conflict=<natural key>` with
//! `Prefer: resolution=merge-duplicates`, which Postgres executes as a single
//! `INSERT ... ON CONFLICT DO UPDATE` statement.

use crate::db::{tables, Store};
use crate::error::AppError;
use crate::models::{
    CachedWorkout, DailySummary, DailyWearable, HabitLog, NutritionLog, SupplementKind,
    SupplementLog, WhoopCredential, WorkoutSession,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

// PostgREST accepts large bodies, but keep requests modest.
const BATCH_SIZE: usize = 400;

/// Query filter pairs in PostgREST syntax, e.g. `("date", "eq.2024-03-01")`.
type Filters = Vec<(&'static str, String)>;

/// Supabase REST client.
#[derive(Clone)]
pub struct SupabaseDb {
    http: reqwest::Client,
    rest_url: String,
    service_key: String,
}

impl SupabaseDb {
    /// Create a client for the project at `supabase_url`.
    pub fn new(
        supabase_url: &str,
        service_key: &str,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Database(format!("Failed to build HTTP client: {}", e)))?;

        tracing::info!(url = supabase_url, "Configured Supabase storage");

        Ok(Self {
            http,
            rest_url: format!("{}/rest/v1", supabase_url.trim_end_matches('/')),
            service_key: service_key.to_string(),
        })
    }

    fn request(&self, method: Method, table: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.rest_url, table))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    /// `GET` rows matching `filters`.
    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        mut filters: Filters,
    ) -> Result<Vec<T>, AppError> {
        filters.push(("select", "*".to_string()));
        let response = self
            .request(Method::GET, table)
            .query(&filters)
            .send()
            .await
            .map_err(|e| AppError::Database(format!("{} select failed: {}", table, e)))?;

        let response = check_response(table, response).await?;
        response
            .json()
            .await
            .map_err(|e| AppError::Database(format!("{} decode failed: {}", table, e)))
    }

    async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        mut filters: Filters,
    ) -> Result<Option<T>, AppError> {
        filters.push(("limit", "1".to_string()));
        Ok(self.select(table, filters).await?.into_iter().next())
    }

    /// Insert-or-replace `rows` keyed on `on_conflict`.
    async fn upsert<T: Serialize + Sync>(
        &self,
        table: &str,
        on_conflict: &str,
        rows: &[T],
    ) -> Result<(), AppError> {
        for chunk in rows.chunks(BATCH_SIZE) {
            let response = self
                .request(Method::POST, table)
                .query(&[("on_conflict", on_conflict)])
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .json(chunk)
                .send()
                .await
                .map_err(|e| AppError::Database(format!("{} upsert failed: {}", table, e)))?;
            check_response(table, response).await?;
        }
        Ok(())
    }

    async fn update(
        &self,
        table: &str,
        filters: Filters,
        patch: serde_json::Value,
    ) -> Result<(), AppError> {
        let response = self
            .request(Method::PATCH, table)
            .query(&filters)
            .header("Prefer", "return=minimal")
            .json(&patch)
            .send()
            .await
            .map_err(|e| AppError::Database(format!("{} update failed: {}", table, e)))?;
        check_response(table, response).await?;
        Ok(())
    }

    async fn delete(&self, table: &str, filters: Filters) -> Result<(), AppError> {
        let response = self
            .request(Method::DELETE, table)
            .query(&filters)
            .send()
            .await
            .map_err(|e| AppError::Database(format!("{} delete failed: {}", table, e)))?;
        check_response(table, response).await?;
        Ok(())
    }
}

/// Map non-2xx responses to database errors.
async fn check_response(
    table: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, AppError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(AppError::Database(format!(
        "{} returned HTTP {}: {}",
        table, status, body
    )))
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{}", value)
}

fn date_range(start: NaiveDate, end: NaiveDate) -> Filters {
    vec![("date", format!("gte.{}", start)), ("date", format!("lte.{}", end))]
}

#[async_trait]
impl Store for SupabaseDb {
    // ─── Credentials ─────────────────────────────────────────────

    async fn get_credential(&self, user_id: &str) -> Result<Option<WhoopCredential>, AppError> {
        self.select_one(tables::WHOOP_TOKENS, vec![("user_id", eq(user_id))])
            .await
    }

    async fn upsert_credential(&self, credential: &WhoopCredential) -> Result<(), AppError> {
        self.upsert(
            tables::WHOOP_TOKENS,
            "user_id",
            std::slice::from_ref(credential),
        )
        .await
    }

    async fn delete_credential(&self, user_id: &str) -> Result<(), AppError> {
        self.delete(tables::WHOOP_TOKENS, vec![("user_id", eq(user_id))])
            .await
    }

    // ─── Wearable Cache ──────────────────────────────────────────

    async fn upsert_workouts(&self, workouts: &[CachedWorkout]) -> Result<(), AppError> {
        self.upsert(tables::WHOOP_WORKOUTS, "user_id,whoop_workout_id", workouts)
            .await
    }

    async fn list_workouts(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CachedWorkout>, AppError> {
        let mut filters = date_range(start, end);
        filters.push(("user_id", eq(user_id)));
        filters.push(("order", "start_time.asc,whoop_workout_id.asc".to_string()));
        self.select(tables::WHOOP_WORKOUTS, filters).await
    }

    async fn upsert_daily_wearables(&self, days: &[DailyWearable]) -> Result<(), AppError> {
        self.upsert(tables::WHOOP_DAILY, "user_id,date", days).await
    }

    async fn list_daily_wearables(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyWearable>, AppError> {
        let mut filters = date_range(start, end);
        filters.push(("user_id", eq(user_id)));
        filters.push(("order", "date.asc".to_string()));
        self.select(tables::WHOOP_DAILY, filters).await
    }

    // ─── Workout Sessions ────────────────────────────────────────

    async fn list_workout_sessions(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<WorkoutSession>, AppError> {
        let mut filters = date_range(start, end);
        filters.push(("user_id", eq(user_id)));
        filters.push(("order", "date.asc,id.asc".to_string()));
        self.select(tables::WORKOUT_SESSIONS, filters).await
    }

    async fn link_workout_session(
        &self,
        session_id: &str,
        whoop_workout_id: &str,
    ) -> Result<(), AppError> {
        self.update(
            tables::WORKOUT_SESSIONS,
            vec![("id", eq(session_id))],
            serde_json::json!({ "whoop_workout_id": whoop_workout_id }),
        )
        .await
    }

    // ─── First-party Logs ────────────────────────────────────────

    async fn list_nutrition_logs(&self, date: NaiveDate) -> Result<Vec<NutritionLog>, AppError> {
        self.select(
            tables::NUTRITION_LOGS,
            vec![("date", eq(date)), ("order", "id.asc".to_string())],
        )
        .await
    }

    async fn list_habit_logs(&self, date: NaiveDate) -> Result<Vec<HabitLog>, AppError> {
        self.select(
            tables::HABIT_LOGS,
            vec![("date", eq(date)), ("order", "id.asc".to_string())],
        )
        .await
    }

    async fn list_supplement_logs(
        &self,
        kind: SupplementKind,
        date: NaiveDate,
    ) -> Result<Vec<SupplementLog>, AppError> {
        self.select(
            kind.table(),
            vec![("date", eq(date)), ("order", "id.asc".to_string())],
        )
        .await
    }

    // ─── Daily Summaries ─────────────────────────────────────────

    async fn get_daily_summary(&self, date: NaiveDate) -> Result<Option<DailySummary>, AppError> {
        self.select_one(tables::DAILY_SUMMARIES, vec![("date", eq(date))])
            .await
    }

    async fn list_daily_summaries(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailySummary>, AppError> {
        let mut filters = date_range(start, end);
        filters.push(("order", "date.asc".to_string()));
        self.select(tables::DAILY_SUMMARIES, filters).await
    }

    async fn upsert_daily_summary(&self, summary: &DailySummary) -> Result<(), AppError> {
        self.upsert(
            tables::DAILY_SUMMARIES,
            "date",
            std::slice::from_ref(summary),
        )
        .await
    }
}
