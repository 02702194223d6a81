// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Health Tracker API Server
//!
//! Keeps a Whoop wearable cache in Supabase and materializes one summary
//! row per day from it and the first-party logs.

use health_tracker::{config::Config, db::SupabaseDb, AppState};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging()?;

    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        owner_configured = config.owner_user_id.is_some(),
        "Starting Health Tracker API"
    );

    let db = SupabaseDb::new(
        &config.supabase_url,
        &config.supabase_service_key,
        Duration::from_secs(config.http_timeout_secs),
    )?;

    let port = config.port;
    let state = Arc::new(AppState::new(config, Arc::new(db))?);
    let app = health_tracker::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive("health_tracker=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
