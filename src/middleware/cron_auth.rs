// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scheduler authentication for `/cron/*` routes.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Require `Authorization: Bearer <CRON_SECRET>`.
///
/// An unset secret rejects every call as a configuration error rather than
/// leaving the endpoint open.
pub async fn require_cron_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(secret) = state.config.cron_secret.as_deref() else {
        return Err(AppError::Configuration("CRON_SECRET is not set".to_string()));
    };

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .unwrap_or_default();

    if !secrets_match(presented, secret) {
        tracing::warn!("Blocked cron request with invalid bearer token");
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}

/// Constant-time comparison for shared secrets.
pub fn secrets_match(presented: &str, expected: &str) -> bool {
    !expected.is_empty() && bool::from(presented.as_bytes().ct_eq(expected.as_bytes()))
}
