// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session login and Whoop OAuth routes.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use cookie::CookieBuilder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, AuthUser, SESSION_COOKIE, SESSION_TTL_SECS};
use crate::middleware::cron_auth::secrets_match;
use crate::routes::validation::ValidatedJson;
use crate::AppState;

/// Session subject when no owner user is configured.
pub const DEFAULT_USER_ID: &str = "owner";

/// Routes reachable without a session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/whoop/callback", get(whoop_callback))
}

/// Routes that need a session.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/whoop", get(whoop_start))
}

// ─── Session ─────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Exchange the app password for a session cookie.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, Json<SuccessResponse>)> {
    let Some(expected) = state.config.app_password.as_deref() else {
        return Err(AppError::Configuration("APP_PASSWORD is not set".to_string()));
    };
    if !secrets_match(&body.password, expected) {
        tracing::warn!("Rejected login with wrong password");
        return Err(AppError::Unauthorized);
    }

    let user_id = state
        .config
        .owner_user_id
        .as_deref()
        .unwrap_or(DEFAULT_USER_ID);
    let jwt = create_jwt(user_id, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    let cookie = session_cookie(jwt, &state.config.frontend_url)
        .max_age(time::Duration::seconds(SESSION_TTL_SECS as i64));

    tracing::info!(user_id, "Session created");
    Ok((jar.add(cookie), Json(SuccessResponse { success: true })))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Json<SuccessResponse>) {
    let jar = jar.remove(session_cookie(String::new(), &state.config.frontend_url));
    (jar, Json(SuccessResponse { success: true }))
}

/// Session cookie attributes; removal must repeat them to match.
fn session_cookie(value: String, frontend_url: &str) -> CookieBuilder<'static> {
    let local = frontend_url.starts_with("http://localhost")
        || frontend_url.starts_with("http://127.0.0.1");
    Cookie::build((SESSION_COOKIE, value))
        .http_only(true)
        .secure(!local)
        .same_site(SameSite::Lax)
        .path("/")
}

// ─── Whoop OAuth ─────────────────────────────────────────────

/// Start the Whoop OAuth flow for the signed-in user.
async fn whoop_start(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Redirect> {
    let oauth_state = state
        .oauth_states
        .issue(&user.user_id)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("OAuth state issue failed: {}", e)))?;

    tracing::info!(user_id = %user.user_id, "Starting OAuth flow, redirecting to Whoop");
    Ok(Redirect::temporary(
        &state.whoop.client().authorize_url(&oauth_state),
    ))
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Whoop redirects here after consent. Always answers with a redirect to
/// the frontend settings page.
async fn whoop_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let frontend = state.config.frontend_url.trim_end_matches('/');
    let fail = |reason: &str| {
        Redirect::temporary(&format!(
            "{}/settings?whoop_error={}",
            frontend,
            urlencoding::encode(reason)
        ))
    };

    // Consume the state first so it cannot be replayed, whatever happens next.
    let verified_user = params
        .state
        .as_deref()
        .map(|s| state.oauth_states.consume(s));

    if let Some(error) = params.error.as_deref() {
        tracing::warn!(error, "OAuth error from Whoop");
        return fail(error);
    }

    let user_id = match verified_user {
        Some(Ok(user_id)) => user_id,
        Some(Err(e)) => {
            tracing::warn!(error = %e, "Rejected OAuth callback state");
            return fail("invalid_state");
        }
        None => return fail("missing_state"),
    };

    let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) else {
        return fail("missing_code");
    };

    match state.whoop.handle_oauth_callback(&user_id, code).await {
        Ok(_) => Redirect::temporary(&format!("{}/settings?whoop=connected", frontend)),
        Err(e) => {
            tracing::error!(user_id, error = %e, "Whoop connection failed");
            fail("token_exchange_failed")
        }
    }
}
