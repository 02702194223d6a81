// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Materialized per-day summary.
//!
//! A summary is a pure function of the logs and wearable cache for its date,
//! so it carries no generation timestamp: recomputing over unchanged inputs
//! yields an identical row.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::{CachedWorkout, DailyWearable, HabitLog, NutritionLog, SupplementLog};

/// One row of `daily_summaries`, keyed by `date`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DailySummary {
    pub date: NaiveDate,

    // ─── Nutrition ───────────────────────────────────────────────
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fat: f64,
    pub nutrition_entries: u32,

    // ─── Habits & Supplements ────────────────────────────────────
    pub habits_completed: u32,
    pub habits_total: u32,
    /// False when no habits were logged
    pub all_habits_completed: bool,
    pub creatine_taken: bool,
    pub supplements_taken: u32,

    // ─── Wearable Snapshot ───────────────────────────────────────
    pub recovery_score: Option<f64>,
    pub hrv_rmssd_ms: Option<f64>,
    pub resting_heart_rate: Option<f64>,
    pub sleep_performance: Option<f64>,
    pub sleep_duration_minutes: Option<f64>,
    pub strain: Option<f64>,
    pub whoop_workouts: u32,
}

/// Everything the aggregator reads for one date.
#[derive(Debug, Clone, Default)]
pub struct DailyInputs {
    pub nutrition: Vec<NutritionLog>,
    pub habits: Vec<HabitLog>,
    pub creatine: Vec<SupplementLog>,
    pub supplements: Vec<SupplementLog>,
    pub wearable: Option<DailyWearable>,
    pub workouts: Vec<CachedWorkout>,
}

impl DailySummary {
    /// Compute the summary for `date` from its inputs.
    ///
    /// Missing inputs mean zero / not tracked, never an error.
    pub fn compute(date: NaiveDate, inputs: &DailyInputs) -> Self {
        let mut summary = DailySummary {
            date,
            ..Default::default()
        };

        for log in inputs.nutrition.iter().filter(|l| l.date == date) {
            summary.total_calories += log.calories;
            summary.total_protein += log.protein;
            summary.total_carbs += log.carbs;
            summary.total_fat += log.fat;
            summary.nutrition_entries += 1;
        }
        summary.total_calories = round2(summary.total_calories);
        summary.total_protein = round2(summary.total_protein);
        summary.total_carbs = round2(summary.total_carbs);
        summary.total_fat = round2(summary.total_fat);

        let habits: Vec<&HabitLog> = inputs.habits.iter().filter(|h| h.date == date).collect();
        summary.habits_total = habits.len() as u32;
        summary.habits_completed = habits.iter().filter(|h| h.completed).count() as u32;
        summary.all_habits_completed =
            summary.habits_total > 0 && summary.habits_completed == summary.habits_total;

        summary.creatine_taken = inputs
            .creatine
            .iter()
            .any(|s| s.date == date && s.taken);
        summary.supplements_taken = inputs
            .supplements
            .iter()
            .filter(|s| s.date == date && s.taken)
            .count() as u32;

        if let Some(day) = inputs.wearable.as_ref().filter(|w| w.date == date) {
            summary.recovery_score = day.recovery_score;
            summary.hrv_rmssd_ms = day.hrv_rmssd_ms;
            summary.resting_heart_rate = day.resting_heart_rate;
            summary.sleep_performance = day.sleep_performance;
            summary.sleep_duration_minutes = day.sleep_duration_minutes;
            summary.strain = day.strain;
        }
        summary.whoop_workouts = inputs
            .workouts
            .iter()
            .filter(|w| w.date == date)
            .count() as u32;

        summary
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
