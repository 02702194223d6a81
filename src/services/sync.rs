// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wearable sync: pull Whoop collections into the local cache tables.
//!
//! Handles:
//! 1. Token acquisition (never calls Whoop unauthenticated)
//! 2. Paging through cycles, recoveries, sleeps and workouts
//! 3. Normalizing units (kJ to kcal, ms to minutes, local calendar dates)
//! 4. Upserting on natural keys so re-syncs never duplicate rows
//! 5. Linking first-party workout sessions to matching Whoop workouts

use crate::db::Db;
use crate::error::{AppError, Result};
use crate::models::{CachedWorkout, DailyWearable};
use crate::services::whoop::{Collection, WhoopService};
use crate::time_utils::{local_date, start_of_day_utc, MAX_RANGE_DAYS};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Whoop reports energy in kilojoules.
const KJ_PER_KCAL: f64 = 4.184;

/// A session and a Whoop workout starting this close together are the same.
const SESSION_MATCH_WINDOW_MINS: i64 = 30;

/// Longest lookback accepted by [`WearableSync::sync_workouts`].
pub const MAX_LOOKBACK_DAYS: u32 = 90;

const SCORED: &str = "SCORED";

// ─── Whoop Records ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WhoopCycle {
    id: i64,
    start: String,
    #[serde(default)]
    timezone_offset: Option<String>,
    #[serde(default)]
    score_state: Option<String>,
    #[serde(default)]
    score: Option<WhoopCycleScore>,
}

#[derive(Debug, Deserialize)]
struct WhoopCycleScore {
    strain: Option<f64>,
    kilojoule: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WhoopRecovery {
    cycle_id: i64,
    score_state: String,
    #[serde(default)]
    score: Option<WhoopRecoveryScore>,
}

#[derive(Debug, Deserialize)]
struct WhoopRecoveryScore {
    recovery_score: Option<f64>,
    resting_heart_rate: Option<f64>,
    hrv_rmssd_milli: Option<f64>,
    spo2_percentage: Option<f64>,
    skin_temp_celsius: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WhoopSleep {
    end: String,
    #[serde(default)]
    timezone_offset: Option<String>,
    #[serde(default)]
    nap: bool,
    score_state: String,
    #[serde(default)]
    score: Option<WhoopSleepScore>,
}

#[derive(Debug, Deserialize)]
struct WhoopSleepScore {
    stage_summary: Option<WhoopStageSummary>,
    sleep_performance_percentage: Option<f64>,
    sleep_efficiency_percentage: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WhoopStageSummary {
    total_in_bed_time_milli: Option<i64>,
    total_awake_time_milli: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WhoopWorkout {
    id: String,
    start: String,
    end: String,
    #[serde(default)]
    timezone_offset: Option<String>,
    #[serde(default)]
    sport_name: Option<String>,
    #[serde(default)]
    score: Option<WhoopWorkoutScore>,
}

#[derive(Debug, Deserialize)]
struct WhoopWorkoutScore {
    strain: Option<f64>,
    average_heart_rate: Option<i32>,
    max_heart_rate: Option<i32>,
    kilojoule: Option<f64>,
    distance_meter: Option<f64>,
    zone_durations: Option<WhoopZoneDurations>,
}

#[derive(Debug, Deserialize)]
struct WhoopZoneDurations {
    zone_zero_milli: Option<i64>,
    zone_one_milli: Option<i64>,
    zone_two_milli: Option<i64>,
    zone_three_milli: Option<i64>,
    zone_four_milli: Option<i64>,
    zone_five_milli: Option<i64>,
}

// ─── Normalization ───────────────────────────────────────────────────────────

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn kj_to_kcal(kj: f64) -> f64 {
    (kj / KJ_PER_KCAL * 10.0).round() / 10.0
}

fn millis_to_minutes(ms: i64) -> f64 {
    (ms as f64 / 60_000.0 * 10.0).round() / 10.0
}

fn normalize_cycle(user_id: &str, cycle: &WhoopCycle) -> Option<DailyWearable> {
    let start = parse_instant(&cycle.start)?;
    let mut day = DailyWearable::new(user_id, local_date(start, cycle.timezone_offset.as_deref()));
    day.cycle_id = Some(cycle.id);
    if cycle.score_state.as_deref() == Some(SCORED) {
        if let Some(score) = &cycle.score {
            day.strain = score.strain;
            day.calories_burned = score.kilojoule.map(kj_to_kcal);
        }
    }
    Some(day)
}

fn normalize_recovery(
    user_id: &str,
    recovery: &WhoopRecovery,
    cycle_dates: &HashMap<i64, NaiveDate>,
) -> Option<DailyWearable> {
    if recovery.score_state != SCORED {
        return None;
    }
    let date = *cycle_dates.get(&recovery.cycle_id)?;
    let score = recovery.score.as_ref()?;
    let mut day = DailyWearable::new(user_id, date);
    day.cycle_id = Some(recovery.cycle_id);
    day.recovery_score = score.recovery_score;
    day.resting_heart_rate = score.resting_heart_rate;
    day.hrv_rmssd_ms = score.hrv_rmssd_milli;
    day.spo2_percentage = score.spo2_percentage;
    day.skin_temp_celsius = score.skin_temp_celsius;
    Some(day)
}

/// Sleep counts toward the day it ends on.
fn normalize_sleep(user_id: &str, sleep: &WhoopSleep) -> Option<DailyWearable> {
    if sleep.score_state != SCORED {
        return None;
    }
    let end = parse_instant(&sleep.end)?;
    let score = sleep.score.as_ref()?;
    let mut day = DailyWearable::new(user_id, local_date(end, sleep.timezone_offset.as_deref()));
    day.sleep_performance = score.sleep_performance_percentage;
    day.sleep_efficiency = score.sleep_efficiency_percentage;
    day.sleep_duration_minutes = score.stage_summary.as_ref().and_then(|s| {
        let in_bed = s.total_in_bed_time_milli?;
        let awake = s.total_awake_time_milli.unwrap_or(0);
        Some(millis_to_minutes((in_bed - awake).max(0)))
    });
    Some(day)
}

fn normalize_workout(
    user_id: &str,
    workout: &WhoopWorkout,
    synced_at: DateTime<Utc>,
) -> Option<CachedWorkout> {
    if workout.id.trim().is_empty() {
        return None;
    }
    let start_time = parse_instant(&workout.start)?;
    let end_time = parse_instant(&workout.end)?;
    if end_time < start_time {
        return None;
    }

    let score = workout.score.as_ref();
    let zone_minutes = score
        .and_then(|s| s.zone_durations.as_ref())
        .map(|z| {
            [
                z.zone_zero_milli,
                z.zone_one_milli,
                z.zone_two_milli,
                z.zone_three_milli,
                z.zone_four_milli,
                z.zone_five_milli,
            ]
            .map(|ms| millis_to_minutes(ms.unwrap_or(0)))
        })
        .unwrap_or_default();

    Some(CachedWorkout {
        user_id: user_id.to_string(),
        whoop_workout_id: workout.id.clone(),
        date: local_date(start_time, workout.timezone_offset.as_deref()),
        start_time,
        end_time,
        sport_name: workout.sport_name.clone(),
        strain: score.and_then(|s| s.strain),
        calories: score.and_then(|s| s.kilojoule).map(kj_to_kcal),
        average_heart_rate: score.and_then(|s| s.average_heart_rate),
        max_heart_rate: score.and_then(|s| s.max_heart_rate),
        distance_meters: score.and_then(|s| s.distance_meter),
        zone_minutes,
        synced_at,
    })
}

/// Decode each raw record, counting the ones that fail.
fn decode_records<T: DeserializeOwned>(
    collection: Collection,
    raw: Vec<serde_json::Value>,
    skipped: &mut u32,
) -> Vec<T> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<T>(value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(collection = ?collection, error = %e, "Skipping malformed Whoop record");
                *skipped += 1;
                None
            }
        })
        .collect()
}

// ─── Sync Engine ─────────────────────────────────────────────────────────────

/// Outcome of a sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Rows that did not exist before
    pub imported: u32,
    /// Rows already cached and refreshed in place
    pub updated: u32,
    /// Records that failed decoding or normalization, including recoveries
    /// whose cycle was not returned and so cannot be dated
    pub skipped: u32,
    /// Workout sessions newly linked to a Whoop workout
    pub linked: u32,
}

/// Reconciles Whoop data into `whoop_daily` and `whoop_workouts`.
#[derive(Clone)]
pub struct WearableSync {
    whoop: WhoopService,
    db: Db,
}

impl WearableSync {
    pub fn new(whoop: WhoopService, db: Db) -> Self {
        Self { whoop, db }
    }

    /// Sync every collection for `start..=end`.
    pub async fn sync_range(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<SyncReport> {
        validate_range(start, end)?;
        let access_token = self.access_token(user_id).await?;

        let mut report = SyncReport::default();
        self.sync_daily(&access_token, user_id, start, end, &mut report)
            .await?;
        self.sync_workout_window(&access_token, user_id, start, end, &mut report)
            .await?;

        tracing::info!(
            user_id,
            %start,
            %end,
            imported = report.imported,
            updated = report.updated,
            skipped = report.skipped,
            linked = report.linked,
            "Whoop range sync complete"
        );
        Ok(report)
    }

    /// Sync workouts only, for the last `lookback_days` days including today.
    pub async fn sync_workouts(&self, user_id: &str, lookback_days: u32) -> Result<SyncReport> {
        if lookback_days == 0 || lookback_days > MAX_LOOKBACK_DAYS {
            return Err(AppError::BadRequest(format!(
                "days must be between 1 and {}",
                MAX_LOOKBACK_DAYS
            )));
        }
        let end = Utc::now().date_naive();
        let start = end - Duration::days(i64::from(lookback_days) - 1);
        let access_token = self.access_token(user_id).await?;

        let mut report = SyncReport::default();
        self.sync_workout_window(&access_token, user_id, start, end, &mut report)
            .await?;

        tracing::info!(
            user_id,
            lookback_days,
            imported = report.imported,
            updated = report.updated,
            skipped = report.skipped,
            linked = report.linked,
            "Whoop workout sync complete"
        );
        Ok(report)
    }

    async fn access_token(&self, user_id: &str) -> Result<String> {
        self.whoop
            .get_valid_access_token(user_id)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Cycles, recoveries and sleeps merged into one row per local date.
    async fn sync_daily(
        &self,
        access_token: &str,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        report: &mut SyncReport,
    ) -> Result<()> {
        let client = self.whoop.client();
        let (window_start, window_end) = fetch_window(start, end);

        let (cycles, recoveries, sleeps) = tokio::try_join!(
            client.list_all(access_token, Collection::Cycle, window_start, window_end),
            client.list_all(access_token, Collection::Recovery, window_start, window_end),
            client.list_all(access_token, Collection::Sleep, window_start, window_end),
        )?;

        let cycles: Vec<WhoopCycle> = decode_records(Collection::Cycle, cycles, &mut report.skipped);
        let recoveries: Vec<WhoopRecovery> =
            decode_records(Collection::Recovery, recoveries, &mut report.skipped);
        let sleeps: Vec<WhoopSleep> = decode_records(Collection::Sleep, sleeps, &mut report.skipped);

        let mut days: BTreeMap<NaiveDate, DailyWearable> = BTreeMap::new();
        let mut merge = |day: DailyWearable| {
            days.entry(day.date)
                .or_insert_with(|| DailyWearable::new(user_id, day.date))
                .merge_from(&day);
        };

        let mut cycle_dates = HashMap::new();
        for cycle in &cycles {
            match normalize_cycle(user_id, cycle) {
                Some(day) => {
                    cycle_dates.insert(cycle.id, day.date);
                    merge(day);
                }
                None => report.skipped += 1,
            }
        }
        // A recovery is dated by its cycle; without one it is skipped.
        for recovery in &recoveries {
            match normalize_recovery(user_id, recovery, &cycle_dates) {
                Some(day) => merge(day),
                None => report.skipped += 1,
            }
        }
        for sleep in sleeps.iter().filter(|s| !s.nap) {
            match normalize_sleep(user_id, sleep) {
                Some(day) => merge(day),
                None => report.skipped += 1,
            }
        }

        // The fetch window is padded; keep only local dates in range.
        days.retain(|date, _| *date >= start && *date <= end);
        if days.is_empty() {
            return Ok(());
        }

        let existing: HashMap<NaiveDate, DailyWearable> = self
            .db
            .list_daily_wearables(user_id, start, end)
            .await?
            .into_iter()
            .map(|d| (d.date, d))
            .collect();

        let synced_at = Utc::now();
        let rows: Vec<DailyWearable> = days
            .into_values()
            .map(|fresh| match existing.get(&fresh.date) {
                Some(cached) => {
                    report.updated += 1;
                    let mut row = cached.clone();
                    row.merge_from(&fresh);
                    row.synced_at = Some(synced_at);
                    row
                }
                None => {
                    report.imported += 1;
                    let mut row = fresh;
                    row.synced_at = Some(synced_at);
                    row
                }
            })
            .collect();

        self.db.upsert_daily_wearables(&rows).await
    }

    async fn sync_workout_window(
        &self,
        access_token: &str,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        report: &mut SyncReport,
    ) -> Result<()> {
        let (window_start, window_end) = fetch_window(start, end);
        let raw = self
            .whoop
            .client()
            .list_all(access_token, Collection::Workout, window_start, window_end)
            .await?;
        let records: Vec<WhoopWorkout> = decode_records(Collection::Workout, raw, &mut report.skipped);

        let synced_at = Utc::now();
        // Keyed by workout id so a record repeated across pages is written once.
        let mut workouts: BTreeMap<String, CachedWorkout> = BTreeMap::new();
        for record in &records {
            match normalize_workout(user_id, record, synced_at) {
                Some(workout) if workout.date >= start && workout.date <= end => {
                    workouts.insert(workout.whoop_workout_id.clone(), workout);
                }
                Some(_) => {}
                None => report.skipped += 1,
            }
        }
        if workouts.is_empty() {
            return Ok(());
        }

        let cached: HashSet<String> = self
            .db
            .list_workouts(user_id, start, end)
            .await?
            .into_iter()
            .map(|w| w.whoop_workout_id)
            .collect();
        for id in workouts.keys() {
            if cached.contains(id) {
                report.updated += 1;
            } else {
                report.imported += 1;
            }
        }

        let workouts: Vec<CachedWorkout> = workouts.into_values().collect();
        self.db.upsert_workouts(&workouts).await?;

        report.linked += self.link_sessions(user_id, start, end, &workouts).await;
        Ok(())
    }

    /// Point unlinked sessions at the Whoop workout that started alongside them.
    ///
    /// Linking is secondary to caching; a failed link is logged, not raised.
    async fn link_sessions(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        workouts: &[CachedWorkout],
    ) -> u32 {
        let sessions = match self.db.list_workout_sessions(user_id, start, end).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Could not load workout sessions for linking");
                return 0;
            }
        };

        let mut taken: HashSet<String> = sessions
            .iter()
            .filter_map(|s| s.whoop_workout_id.clone())
            .collect();
        let window = Duration::minutes(SESSION_MATCH_WINDOW_MINS);
        let mut linked = 0;

        for session in sessions.iter().filter(|s| s.whoop_workout_id.is_none()) {
            let Some(started_at) = session.started_at else {
                continue;
            };
            let candidate = workouts
                .iter()
                .filter(|w| !taken.contains(&w.whoop_workout_id))
                .filter(|w| (w.start_time - started_at).abs() <= window)
                .min_by_key(|w| (w.start_time - started_at).abs());

            if let Some(workout) = candidate {
                match self
                    .db
                    .link_workout_session(&session.id, &workout.whoop_workout_id)
                    .await
                {
                    Ok(()) => {
                        taken.insert(workout.whoop_workout_id.clone());
                        linked += 1;
                    }
                    Err(e) => tracing::warn!(
                        session_id = %session.id,
                        error = %e,
                        "Failed to link workout session"
                    ),
                }
            }
        }
        linked
    }
}

/// UTC window wide enough to hold every instant whose local date is in
/// `start..=end`. Whoop offsets are within a day of UTC.
fn fetch_window(start: NaiveDate, end: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        start_of_day_utc(start) - Duration::days(1),
        start_of_day_utc(end) + Duration::days(2),
    )
}

pub(crate) fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if end < start {
        return Err(AppError::BadRequest(
            "endDate must not be before startDate".to_string(),
        ));
    }
    if (end - start).num_days() >= MAX_RANGE_DAYS {
        return Err(AppError::BadRequest(format!(
            "range must not exceed {} days",
            MAX_RANGE_DAYS
        )));
    }
    Ok(())
}
