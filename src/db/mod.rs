// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storage layer.
//!
//! Every write is a single upsert keyed by the table's natural key, so
//! concurrent writers never observe a read-then-write gap.

pub mod memory;
pub mod supabase;

pub use memory::MemoryDb;
pub use supabase::SupabaseDb;

use crate::error::AppError;
use crate::models::{
    CachedWorkout, DailySummary, DailyWearable, HabitLog, NutritionLog, SupplementKind,
    SupplementLog, WhoopCredential, WorkoutSession,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

/// Table names as constants.
pub mod tables {
    pub const WHOOP_TOKENS: &str = "whoop_tokens";
    pub const WHOOP_WORKOUTS: &str = "whoop_workouts";
    /// Per-day cycle/recovery/sleep snapshot
    pub const WHOOP_DAILY: &str = "whoop_daily";
    pub const DAILY_SUMMARIES: &str = "daily_summaries";
    pub const WORKOUT_SESSIONS: &str = "workout_sessions";
    pub const NUTRITION_LOGS: &str = "nutrition_logs";
    pub const HABIT_LOGS: &str = "habit_logs";
    pub const CREATINE_LOGS: &str = "creatine_logs";
    pub const SUPPLEMENT_LOGS: &str = "supplement_logs";
}

/// Shared handle to the active store.
pub type Db = Arc<dyn Store>;

/// Typed operations over the named tables.
#[async_trait]
pub trait Store: Send + Sync {
    // ─── Credentials ─────────────────────────────────────────────

    async fn get_credential(&self, user_id: &str) -> Result<Option<WhoopCredential>, AppError>;

    /// Insert or replace the credential keyed by `user_id`.
    async fn upsert_credential(&self, credential: &WhoopCredential) -> Result<(), AppError>;

    /// Remove the credential. Absent rows are not an error.
    async fn delete_credential(&self, user_id: &str) -> Result<(), AppError>;

    // ─── Wearable Cache ──────────────────────────────────────────

    /// Upsert on `(user_id, whoop_workout_id)` as one operation.
    async fn upsert_workouts(&self, workouts: &[CachedWorkout]) -> Result<(), AppError>;

    /// Cached workouts whose local `date` is in `start..=end`, ordered by start time.
    async fn list_workouts(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CachedWorkout>, AppError>;

    /// Upsert on `(user_id, date)` as one operation.
    async fn upsert_daily_wearables(&self, days: &[DailyWearable]) -> Result<(), AppError>;

    /// Daily rows with `start <= date <= end`, ordered by date.
    async fn list_daily_wearables(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyWearable>, AppError>;

    // ─── Workout Sessions ────────────────────────────────────────

    async fn list_workout_sessions(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<WorkoutSession>, AppError>;

    /// Set the weak back-reference from a session to a cached workout.
    async fn link_workout_session(
        &self,
        session_id: &str,
        whoop_workout_id: &str,
    ) -> Result<(), AppError>;

    // ─── First-party Logs ────────────────────────────────────────

    async fn list_nutrition_logs(&self, date: NaiveDate) -> Result<Vec<NutritionLog>, AppError>;

    async fn list_habit_logs(&self, date: NaiveDate) -> Result<Vec<HabitLog>, AppError>;

    async fn list_supplement_logs(
        &self,
        kind: SupplementKind,
        date: NaiveDate,
    ) -> Result<Vec<SupplementLog>, AppError>;

    // ─── Daily Summaries ─────────────────────────────────────────

    async fn get_daily_summary(&self, date: NaiveDate) -> Result<Option<DailySummary>, AppError>;

    async fn list_daily_summaries(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailySummary>, AppError>;

    /// Replace the row for `summary.date` as one operation.
    async fn upsert_daily_summary(&self, summary: &DailySummary) -> Result<(), AppError>;
}
