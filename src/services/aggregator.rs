// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily aggregation: fold one day's logs and wearable cache into
//! `daily_summaries`.

use crate::db::Db;
use crate::error::{AppError, Result};
use crate::models::{DailyInputs, DailySummary, SupplementKind};
use chrono::NaiveDate;

/// Materializes [`DailySummary`] rows.
#[derive(Clone)]
pub struct DailyAggregator {
    db: Db,
    /// Whose wearable cache feeds the summary. Summaries are per date, not
    /// per user; without an owner the wearable fields stay empty.
    owner_user_id: Option<String>,
}

impl DailyAggregator {
    pub fn new(db: Db, owner_user_id: Option<String>) -> Self {
        Self { db, owner_user_id }
    }

    /// Recompute and store the summary for `date`.
    ///
    /// All reads must succeed before anything is written; a failed read
    /// leaves the stored row untouched.
    pub async fn sync_daily_summary(&self, date: NaiveDate) -> Result<DailySummary> {
        let inputs = self.load_inputs(date).await.map_err(|e| {
            tracing::error!(%date, error = %e, "Daily summary inputs unavailable");
            AppError::Aggregation(format!("{}: {}", date, e))
        })?;

        let summary = DailySummary::compute(date, &inputs);
        self.db.upsert_daily_summary(&summary).await?;

        tracing::debug!(
            %date,
            calories = summary.total_calories,
            habits_completed = summary.habits_completed,
            whoop_workouts = summary.whoop_workouts,
            "Daily summary stored"
        );
        Ok(summary)
    }

    /// Stored summary for `date`, if one has been computed.
    pub async fn get_daily_summary(&self, date: NaiveDate) -> Result<Option<DailySummary>> {
        self.db.get_daily_summary(date).await
    }

    /// Stored summaries for `start..=end`, ascending by date.
    pub async fn get_summaries(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailySummary>> {
        self.db.list_daily_summaries(start, end).await
    }

    async fn load_inputs(&self, date: NaiveDate) -> Result<DailyInputs> {
        let db = &self.db;
        let (nutrition, habits, creatine, supplements) = tokio::try_join!(
            db.list_nutrition_logs(date),
            db.list_habit_logs(date),
            db.list_supplement_logs(SupplementKind::Creatine, date),
            db.list_supplement_logs(SupplementKind::General, date),
        )?;

        let (wearable, workouts) = match &self.owner_user_id {
            Some(user_id) => {
                let (daily, workouts) = tokio::try_join!(
                    db.list_daily_wearables(user_id, date, date),
                    db.list_workouts(user_id, date, date),
                )?;
                (daily.into_iter().next(), workouts)
            }
            None => (None, Vec::new()),
        };

        Ok(DailyInputs {
            nutrition,
            habits,
            creatine,
            supplements,
            wearable,
            workouts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryDb, Store};
    use crate::models::{CachedWorkout, DailyWearable, HabitLog, NutritionLog};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn aggregator(mem: &MemoryDb, owner: Option<&str>) -> DailyAggregator {
        let db: Db = Arc::new(mem.clone());
        DailyAggregator::new(db, owner.map(String::from))
    }

    #[tokio::test]
    async fn test_summary_includes_owner_wearable_data() {
        let mem = MemoryDb::new();
        mem.insert_nutrition_log(NutritionLog {
            id: "n1".to_string(),
            date: date(1),
            calories: 500.0,
            protein: 30.0,
            carbs: 50.0,
            fat: 10.0,
        });
        let mut day = DailyWearable::new("owner", date(1));
        day.recovery_score = Some(72.0);
        mem.upsert_daily_wearables(&[day]).await.unwrap();
        mem.upsert_workouts(&[CachedWorkout {
            user_id: "owner".to_string(),
            whoop_workout_id: "w1".to_string(),
            date: date(1),
            start_time: Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2024, 3, 1, 19, 0, 0).unwrap(),
            sport_name: None,
            strain: None,
            calories: None,
            average_heart_rate: None,
            max_heart_rate: None,
            distance_meters: None,
            zone_minutes: [0.0; 6],
            synced_at: Utc::now(),
        }])
        .await
        .unwrap();

        let summary = aggregator(&mem, Some("owner"))
            .sync_daily_summary(date(1))
            .await
            .unwrap();
        assert_eq!(summary.total_calories, 500.0);
        assert_eq!(summary.recovery_score, Some(72.0));
        assert_eq!(summary.whoop_workouts, 1);

        let without_owner = aggregator(&mem, None)
            .sync_daily_summary(date(1))
            .await
            .unwrap();
        assert!(without_owner.recovery_score.is_none());
        assert_eq!(without_owner.whoop_workouts, 0);
    }

    #[tokio::test]
    async fn test_failed_read_keeps_previous_row() {
        let mem = MemoryDb::new();
        mem.insert_habit_log(HabitLog {
            id: "h1".to_string(),
            date: date(2),
            habit: "read".to_string(),
            completed: true,
        });
        let agg = aggregator(&mem, None);
        let before = agg.sync_daily_summary(date(2)).await.unwrap();

        mem.insert_habit_log(HabitLog {
            id: "h2".to_string(),
            date: date(2),
            habit: "walk".to_string(),
            completed: false,
        });
        mem.fail_reads_for(date(2));

        let err = agg.sync_daily_summary(date(2)).await.unwrap_err();
        assert!(matches!(err, AppError::Aggregation(_)));
        assert_eq!(agg.get_daily_summary(date(2)).await.unwrap(), Some(before));
    }
}
