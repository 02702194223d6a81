// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Health tracker: daily summaries and Whoop sync
//!
//! This crate provides the backend API that keeps a cache of Whoop
//! wearable data and folds it, together with first-party nutrition, habit
//! and supplement logs, into one summary row per day.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Db;
use error::AppError;
use services::{
    DailyAggregator, OAuthStateManager, Orchestrator, WearableSync, WhoopClient, WhoopService,
};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Db,
    pub whoop: WhoopService,
    pub sync: WearableSync,
    pub aggregator: DailyAggregator,
    pub orchestrator: Orchestrator,
    pub oauth_states: OAuthStateManager,
}

impl AppState {
    /// Wire every service onto one store.
    pub fn new(config: Config, db: Db) -> Result<Self, AppError> {
        let client = WhoopClient::new(&config)?;
        let whoop = WhoopService::new(client, db.clone(), config.token_refresh_skew_secs);
        let sync = WearableSync::new(whoop.clone(), db.clone());
        let aggregator = DailyAggregator::new(db.clone(), config.owner_user_id.clone());
        let orchestrator = Orchestrator::new(
            aggregator.clone(),
            sync.clone(),
            whoop.clone(),
            config.owner_user_id.clone(),
        );
        let oauth_states = OAuthStateManager::new(&config.oauth_state_key);

        Ok(Self {
            config,
            db,
            whoop,
            sync,
            aggregator,
            orchestrator,
            oauth_states,
        })
    }
}
