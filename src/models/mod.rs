// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod credential;
pub mod logs;
pub mod summary;
pub mod wearable;

pub use credential::WhoopCredential;
pub use logs::{HabitLog, NutritionLog, SupplementKind, SupplementLog};
pub use summary::{DailyInputs, DailySummary};
pub use wearable::{CachedWorkout, DailyWearable, WorkoutSession};
