// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Locally cached Whoop data and first-party workout sessions.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Cached Whoop workout (`whoop_workouts`).
///
/// Natural key: `(user_id, whoop_workout_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CachedWorkout {
    pub user_id: String,
    /// Whoop's workout ID
    pub whoop_workout_id: String,
    /// Local calendar day the workout started on, in Whoop's reported offset
    pub date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub sport_name: Option<String>,
    /// Whoop strain (0-21)
    pub strain: Option<f64>,
    /// Energy burned in kcal
    pub calories: Option<f64>,
    pub average_heart_rate: Option<i32>,
    pub max_heart_rate: Option<i32>,
    pub distance_meters: Option<f64>,
    /// Minutes spent in heart-rate zones 0 through 5
    #[serde(default)]
    pub zone_minutes: [f64; 6],
    pub synced_at: DateTime<Utc>,
}

/// Per-day Whoop snapshot (`whoop_daily`) merged from cycle, recovery and sleep.
///
/// Natural key: `(user_id, date)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DailyWearable {
    pub user_id: String,
    pub date: NaiveDate,
    pub cycle_id: Option<i64>,
    /// Recovery score (0-100)
    pub recovery_score: Option<f64>,
    /// Heart-rate variability (RMSSD) in milliseconds
    pub hrv_rmssd_ms: Option<f64>,
    pub resting_heart_rate: Option<f64>,
    pub spo2_percentage: Option<f64>,
    pub skin_temp_celsius: Option<f64>,
    /// Sleep performance percentage (0-100)
    pub sleep_performance: Option<f64>,
    pub sleep_efficiency: Option<f64>,
    /// Time asleep (in bed minus awake) in minutes
    pub sleep_duration_minutes: Option<f64>,
    /// Day strain (0-21)
    pub strain: Option<f64>,
    /// Energy burned over the cycle in kcal
    pub calories_burned: Option<f64>,
    pub synced_at: Option<DateTime<Utc>>,
}

impl DailyWearable {
    pub fn new(user_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            user_id: user_id.into(),
            date,
            ..Default::default()
        }
    }

    /// Overlay every field `other` has onto `self`.
    pub fn merge_from(&mut self, other: &DailyWearable) {
        fn take<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
            if src.is_some() {
                dst.clone_from(src);
            }
        }
        take(&mut self.cycle_id, &other.cycle_id);
        take(&mut self.recovery_score, &other.recovery_score);
        take(&mut self.hrv_rmssd_ms, &other.hrv_rmssd_ms);
        take(&mut self.resting_heart_rate, &other.resting_heart_rate);
        take(&mut self.spo2_percentage, &other.spo2_percentage);
        take(&mut self.skin_temp_celsius, &other.skin_temp_celsius);
        take(&mut self.sleep_performance, &other.sleep_performance);
        take(&mut self.sleep_efficiency, &other.sleep_efficiency);
        take(&mut self.sleep_duration_minutes, &other.sleep_duration_minutes);
        take(&mut self.strain, &other.strain);
        take(&mut self.calories_burned, &other.calories_burned);
        take(&mut self.synced_at, &other.synced_at);
    }
}

/// First-party workout session (`workout_sessions`).
///
/// `whoop_workout_id` is a weak back-reference to [`CachedWorkout`]; removing
/// the cached workout leaves the session alone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutSession {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub started_at: Option<DateTime<Utc>>,
    pub whoop_workout_id: Option<String>,
}
