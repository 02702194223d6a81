// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! First-party log rows read by the daily aggregator.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// One food entry (`nutrition_logs`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NutritionLog {
    pub id: String,
    pub date: NaiveDate,
    #[serde(default, deserialize_with = "default_if_null")]
    pub calories: f64,
    /// Grams
    #[serde(default, deserialize_with = "default_if_null")]
    pub protein: f64,
    /// Grams
    #[serde(default, deserialize_with = "default_if_null")]
    pub carbs: f64,
    /// Grams
    #[serde(default, deserialize_with = "default_if_null")]
    pub fat: f64,
}

/// Habit check-in (`habit_logs`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HabitLog {
    pub id: String,
    pub date: NaiveDate,
    pub habit: String,
    #[serde(default, deserialize_with = "default_if_null")]
    pub completed: bool,
}

/// Kinds of supplement log, each stored in its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplementKind {
    Creatine,
    General,
}

impl SupplementKind {
    /// Storage table backing this kind.
    pub fn table(self) -> &'static str {
        match self {
            SupplementKind::Creatine => crate::db::tables::CREATINE_LOGS,
            SupplementKind::General => crate::db::tables::SUPPLEMENT_LOGS,
        }
    }
}

/// Supplement intake (`creatine_logs` / `supplement_logs`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SupplementLog {
    pub id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub name: Option<String>,
    /// Grams
    #[serde(default)]
    pub dose: Option<f64>,
    #[serde(default = "default_taken", deserialize_with = "taken_if_null")]
    pub taken: bool,
}

fn default_taken() -> bool {
    true
}

/// PostgREST sends `null` for empty nullable columns.
fn default_if_null<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn taken_if_null<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_else(default_taken))
}
