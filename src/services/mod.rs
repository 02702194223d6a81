// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod aggregator;
pub mod oauth_state;
pub mod orchestrator;
pub mod sync;
pub mod whoop;

pub use aggregator::DailyAggregator;
pub use oauth_state::{OAuthStateManager, StateError};
pub use orchestrator::{DailySyncReport, DayFailure, Orchestrator, RangeReport};
pub use sync::{SyncReport, WearableSync};
pub use whoop::{ConnectionStatus, WhoopClient, WhoopError, WhoopService};
