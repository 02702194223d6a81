// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process [`Store`] for local development and tests.
//!
//! Each table is a `DashMap` keyed by its natural key, so an upsert is a
//! single map insert. Reads for dates registered with
//! [`MemoryDb::fail_reads_for`] return a database error, which lets callers
//! exercise storage failure paths without a real backend.

use crate::db::Store;
use crate::error::AppError;
use crate::models::{
    CachedWorkout, DailySummary, DailyWearable, HabitLog, NutritionLog, SupplementKind,
    SupplementLog, WhoopCredential, WorkoutSession,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::{DashMap, DashSet};
use std::sync::Arc;

/// In-memory store. Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryDb {
    inner: Arc<Tables>,
}

#[derive(Default)]
struct Tables {
    credentials: DashMap<String, WhoopCredential>,
    workouts: DashMap<(String, String), CachedWorkout>,
    daily: DashMap<(String, NaiveDate), DailyWearable>,
    sessions: DashMap<String, WorkoutSession>,
    nutrition: DashMap<String, NutritionLog>,
    habits: DashMap<String, HabitLog>,
    supplements: DashMap<(SupplementKind, String), SupplementLog>,
    summaries: DashMap<NaiveDate, DailySummary>,
    failing_dates: DashSet<NaiveDate>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Seeding ─────────────────────────────────────────────────

    pub fn insert_nutrition_log(&self, log: NutritionLog) {
        self.inner.nutrition.insert(log.id.clone(), log);
    }

    pub fn insert_habit_log(&self, log: HabitLog) {
        self.inner.habits.insert(log.id.clone(), log);
    }

    pub fn insert_supplement_log(&self, kind: SupplementKind, log: SupplementLog) {
        self.inner.supplements.insert((kind, log.id.clone()), log);
    }

    pub fn insert_workout_session(&self, session: WorkoutSession) {
        self.inner.sessions.insert(session.id.clone(), session);
    }

    pub fn get_workout_session(&self, id: &str) -> Option<WorkoutSession> {
        self.inner.sessions.get(id).map(|s| s.clone())
    }

    /// Drop a cached workout. Sessions referencing it are left untouched.
    pub fn remove_workout(&self, user_id: &str, whoop_workout_id: &str) {
        self.inner
            .workouts
            .remove(&(user_id.to_string(), whoop_workout_id.to_string()));
    }

    /// Number of cached workouts for `user_id`.
    pub fn workout_count(&self, user_id: &str) -> usize {
        self.inner
            .workouts
            .iter()
            .filter(|w| w.key().0 == user_id)
            .count()
    }

    /// Number of stored summaries.
    pub fn summary_count(&self) -> usize {
        self.inner.summaries.len()
    }

    /// Make every per-date read for `date` fail.
    pub fn fail_reads_for(&self, date: NaiveDate) {
        self.inner.failing_dates.insert(date);
    }

    fn check_readable(&self, date: NaiveDate) -> Result<(), AppError> {
        if self.inner.failing_dates.contains(&date) {
            return Err(AppError::Database(format!("read failure injected for {}", date)));
        }
        Ok(())
    }
}

/// Collect matching values, sorted for stable output.
fn collect_sorted<K, V, F, S, O>(map: &DashMap<K, V>, keep: F, sort_key: S) -> Vec<V>
where
    K: std::hash::Hash + Eq,
    V: Clone,
    F: Fn(&V) -> bool,
    S: Fn(&V) -> O,
    O: Ord,
{
    let mut rows: Vec<V> = map
        .iter()
        .filter(|entry| keep(entry.value()))
        .map(|entry| entry.value().clone())
        .collect();
    rows.sort_by_key(|v| sort_key(v));
    rows
}

#[async_trait]
impl Store for MemoryDb {
    async fn get_credential(&self, user_id: &str) -> Result<Option<WhoopCredential>, AppError> {
        Ok(self.inner.credentials.get(user_id).map(|c| c.clone()))
    }

    async fn upsert_credential(&self, credential: &WhoopCredential) -> Result<(), AppError> {
        self.inner
            .credentials
            .insert(credential.user_id.clone(), credential.clone());
        Ok(())
    }

    async fn delete_credential(&self, user_id: &str) -> Result<(), AppError> {
        self.inner.credentials.remove(user_id);
        Ok(())
    }

    async fn upsert_workouts(&self, workouts: &[CachedWorkout]) -> Result<(), AppError> {
        for workout in workouts {
            self.inner.workouts.insert(
                (workout.user_id.clone(), workout.whoop_workout_id.clone()),
                workout.clone(),
            );
        }
        Ok(())
    }

    async fn list_workouts(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CachedWorkout>, AppError> {
        self.check_readable(start)?;
        Ok(collect_sorted(
            &self.inner.workouts,
            |w| w.user_id == user_id && w.date >= start && w.date <= end,
            |w| (w.start_time, w.whoop_workout_id.clone()),
        ))
    }

    async fn upsert_daily_wearables(&self, days: &[DailyWearable]) -> Result<(), AppError> {
        for day in days {
            self.inner
                .daily
                .insert((day.user_id.clone(), day.date), day.clone());
        }
        Ok(())
    }

    async fn list_daily_wearables(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyWearable>, AppError> {
        self.check_readable(start)?;
        Ok(collect_sorted(
            &self.inner.daily,
            |d| d.user_id == user_id && d.date >= start && d.date <= end,
            |d| d.date,
        ))
    }

    async fn list_workout_sessions(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<WorkoutSession>, AppError> {
        Ok(collect_sorted(
            &self.inner.sessions,
            |s| s.user_id == user_id && s.date >= start && s.date <= end,
            |s| (s.date, s.id.clone()),
        ))
    }

    async fn link_workout_session(
        &self,
        session_id: &str,
        whoop_workout_id: &str,
    ) -> Result<(), AppError> {
        if let Some(mut session) = self.inner.sessions.get_mut(session_id) {
            session.whoop_workout_id = Some(whoop_workout_id.to_string());
        }
        Ok(())
    }

    async fn list_nutrition_logs(&self, date: NaiveDate) -> Result<Vec<NutritionLog>, AppError> {
        self.check_readable(date)?;
        Ok(collect_sorted(
            &self.inner.nutrition,
            |l| l.date == date,
            |l| l.id.clone(),
        ))
    }

    async fn list_habit_logs(&self, date: NaiveDate) -> Result<Vec<HabitLog>, AppError> {
        self.check_readable(date)?;
        Ok(collect_sorted(
            &self.inner.habits,
            |l| l.date == date,
            |l| l.id.clone(),
        ))
    }

    async fn list_supplement_logs(
        &self,
        kind: SupplementKind,
        date: NaiveDate,
    ) -> Result<Vec<SupplementLog>, AppError> {
        self.check_readable(date)?;
        let mut rows: Vec<SupplementLog> = self
            .inner
            .supplements
            .iter()
            .filter(|entry| entry.key().0 == kind && entry.value().date == date)
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(rows)
    }

    async fn get_daily_summary(&self, date: NaiveDate) -> Result<Option<DailySummary>, AppError> {
        Ok(self.inner.summaries.get(&date).map(|s| s.clone()))
    }

    async fn list_daily_summaries(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailySummary>, AppError> {
        Ok(collect_sorted(
            &self.inner.summaries,
            |s| s.date >= start && s.date <= end,
            |s| s.date,
        ))
    }

    async fn upsert_daily_summary(&self, summary: &DailySummary) -> Result<(), AppError> {
        self.inner.summaries.insert(summary.date, summary.clone());
        Ok(())
    }
}
