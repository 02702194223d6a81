// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Whoop API client and OAuth token lifecycle.
//!
//! Handles:
//! - Authorization code exchange and token refresh
//! - Paginated collection fetches (cycles, recovery, sleep, workouts)
//! - Proactive refresh before expiry, serialized per user
//! - Rate limit and auth failure classification

use crate::config::Config;
use crate::db::Db;
use crate::error::AppError;
use crate::models::WhoopCredential;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scopes requested during authorization.
pub const WHOOP_SCOPES: &str =
    "read:recovery read:cycles read:sleep read:workout read:profile offline";

/// Largest page Whoop serves.
pub const PAGE_LIMIT: u32 = 25;

/// Upper bound on pages followed for one collection.
const MAX_PAGES: usize = 200;

/// Errors from the Whoop HTTP API.
#[derive(Debug, thiserror::Error)]
pub enum WhoopError {
    #[error("request failed: {0}")]
    Network(String),

    #[error("rate limited")]
    RateLimited,

    #[error("access token rejected")]
    Unauthorized,

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl From<WhoopError> for AppError {
    fn from(err: WhoopError) -> Self {
        match err {
            WhoopError::Unauthorized => AppError::Unauthorized,
            WhoopError::Decode(msg) => AppError::MalformedUpstream(msg),
            other => AppError::UpstreamUnavailable(other.to_string()),
        }
    }
}

/// Collections served by the Whoop v2 API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Cycle,
    Recovery,
    Sleep,
    Workout,
}

impl Collection {
    pub fn path(self) -> &'static str {
        match self {
            Collection::Cycle => "developer/v2/cycle",
            Collection::Recovery => "developer/v2/recovery",
            Collection::Sleep => "developer/v2/activity/sleep",
            Collection::Workout => "developer/v2/activity/workout",
        }
    }
}

/// Whoop API client.
#[derive(Clone)]
pub struct WhoopClient {
    http: reqwest::Client,
    api_url: String,
    oauth_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl WhoopClient {
    /// Create a client from application config.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            http,
            api_url: config.whoop_api_url.trim_end_matches('/').to_string(),
            oauth_url: config.whoop_oauth_url.trim_end_matches('/').to_string(),
            client_id: config.whoop_client_id.clone(),
            client_secret: config.whoop_client_secret.clone(),
            redirect_uri: config.whoop_redirect_uri.clone(),
        })
    }

    /// URL the user is sent to for consent.
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}/oauth/oauth2/auth?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            self.oauth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(WHOOP_SCOPES),
            urlencoding::encode(state),
        )
    }

    fn token_url(&self) -> String {
        format!("{}/oauth/oauth2/token", self.oauth_url)
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, WhoopError> {
        let response = self
            .http
            .post(self.token_url())
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| WhoopError::Network(format!("token exchange: {}", e)))?;

        check_response_json(response).await
    }

    /// Refresh an expired access token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, WhoopError> {
        let response = self
            .http
            .post(self.token_url())
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", "offline"),
            ])
            .send()
            .await
            .map_err(|e| WhoopError::Network(format!("token refresh: {}", e)))?;

        check_response_json(response).await
    }

    /// Revoke this app's access for the token's owner.
    pub async fn revoke_access(&self, access_token: &str) -> Result<(), WhoopError> {
        let response = self
            .http
            .delete(format!("{}/developer/v2/user/access", self.api_url))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| WhoopError::Network(format!("revoke: {}", e)))?;

        check_response(response).await?;
        Ok(())
    }

    /// Fetch one page of a collection.
    pub async fn list_page(
        &self,
        access_token: &str,
        collection: Collection,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        next_token: Option<&str>,
    ) -> Result<Page, WhoopError> {
        let mut query = vec![
            ("start", crate::time_utils::format_utc_rfc3339(start)),
            ("end", crate::time_utils::format_utc_rfc3339(end)),
            ("limit", PAGE_LIMIT.to_string()),
        ];
        if let Some(token) = next_token {
            query.push(("nextToken", token.to_string()));
        }

        let response = self
            .http
            .get(format!("{}/{}", self.api_url, collection.path()))
            .bearer_auth(access_token)
            .query(&query)
            .send()
            .await
            .map_err(|e| WhoopError::Network(e.to_string()))?;

        check_response_json(response).await
    }

    /// Fetch every record of a collection in `[start, end)`, following cursors.
    ///
    /// Records are returned undecoded so one malformed record cannot fail the
    /// whole page.
    pub async fn list_all(
        &self,
        access_token: &str,
        collection: Collection,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<serde_json::Value>, WhoopError> {
        let mut records = Vec::new();
        let mut next_token: Option<String> = None;

        for page_number in 1..=MAX_PAGES {
            let page = self
                .list_page(access_token, collection, start, end, next_token.as_deref())
                .await?;

            tracing::debug!(
                collection = ?collection,
                page = page_number,
                count = page.records.len(),
                "Fetched Whoop page"
            );
            records.extend(page.records);

            match page.next_token.filter(|t| !t.is_empty()) {
                Some(token) => next_token = Some(token),
                None => return Ok(records),
            }
        }

        tracing::warn!(
            collection = ?collection,
            max_pages = MAX_PAGES,
            "Stopped following Whoop pagination cursor"
        );
        Ok(records)
    }
}

/// Map error statuses onto [`WhoopError`].
async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, WhoopError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();

    if status.as_u16() == 429 {
        tracing::warn!("Whoop rate limit hit (429)");
        return Err(WhoopError::RateLimited);
    }

    if status.as_u16() == 401 {
        return Err(WhoopError::Unauthorized);
    }

    Err(WhoopError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Check response and parse JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, WhoopError> {
    check_response(response)
        .await?
        .json()
        .await
        .map_err(|e| WhoopError::Decode(e.to_string()))
}

/// Token endpoint response.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Only present when the `offline` scope was granted
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds
    pub expires_in: i64,
}

/// One page of a Whoop collection.
#[derive(Debug, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub records: Vec<serde_json::Value>,
    #[serde(default)]
    pub next_token: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// WhoopService - Token lifecycle on top of WhoopClient
// ─────────────────────────────────────────────────────────────────────────────

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Margin before token expiration when we proactively refresh (5 minutes).
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Shared refresh locks type for use in AppState.
pub type RefreshLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Where a user's Whoop connection stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connected,
    /// Past soft expiry; the next use refreshes
    NeedsRefresh,
}

/// Response body for `GET /whoop/status`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub connected: bool,
    pub state: ConnectionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_expiring_soon: Option<bool>,
}

/// Owns the `whoop_tokens` table: no other component writes to it.
#[derive(Clone)]
pub struct WhoopService {
    client: WhoopClient,
    db: Db,
    refresh_skew_secs: i64,
    /// Per-user mutex to serialize token refresh operations.
    refresh_locks: RefreshLocks,
}

impl WhoopService {
    pub fn new(client: WhoopClient, db: Db, refresh_skew_secs: i64) -> Self {
        Self {
            client,
            db,
            refresh_skew_secs,
            refresh_locks: Arc::new(DashMap::new()),
        }
    }

    pub fn client(&self) -> &WhoopClient {
        &self.client
    }

    // ─── Token Store ─────────────────────────────────────────────────────────

    /// Read the stored credential, if any.
    pub async fn get_stored_credential(
        &self,
        user_id: &str,
    ) -> Result<Option<WhoopCredential>, AppError> {
        self.db.get_credential(user_id).await
    }

    /// Persist a credential; expiry is computed from the current time.
    pub async fn store_credential(
        &self,
        user_id: &str,
        access_token: &str,
        refresh_token: &str,
        expires_in_secs: i64,
    ) -> Result<WhoopCredential, AppError> {
        let credential = WhoopCredential::issue(
            user_id,
            access_token,
            refresh_token,
            expires_in_secs,
            Utc::now(),
        )
        .ok_or_else(|| {
            AppError::MalformedUpstream(format!("expires_in out of range: {}", expires_in_secs))
        })?;
        self.db.upsert_credential(&credential).await?;
        Ok(credential)
    }

    /// Remove the stored credential. Idempotent.
    pub async fn delete_credential(&self, user_id: &str) -> Result<(), AppError> {
        self.db.delete_credential(user_id).await
    }

    // ─── Token Lifecycle ─────────────────────────────────────────────────────

    /// Get a usable access token, refreshing it if past soft expiry.
    ///
    /// Returns `Ok(None)` when the user has no credential or the refresh
    /// failed; a failed refresh leaves the stale credential stored so a
    /// transient Whoop outage does not force re-authorization. `Err` is
    /// reserved for storage failures.
    pub async fn get_valid_access_token(&self, user_id: &str) -> Result<Option<String>, AppError> {
        let Some(credential) = self.db.get_credential(user_id).await? else {
            return Ok(None);
        };

        if !credential.is_expired(self.refresh_skew_secs) {
            return Ok(Some(credential.access_token));
        }

        // Only one task per user performs the refresh; others wait here.
        let lock = self
            .refresh_locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Another task may have refreshed while we were waiting.
        let Some(credential) = self.db.get_credential(user_id).await? else {
            return Ok(None);
        };
        if !credential.is_expired(self.refresh_skew_secs) {
            return Ok(Some(credential.access_token));
        }

        if !credential.has_refresh_token() {
            tracing::warn!(user_id, "Whoop token expired and no refresh token stored");
            return Ok(None);
        }

        tracing::info!(user_id, "Whoop access token expired, refreshing");

        let refreshed = match self.client.refresh_token(&credential.refresh_token).await {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Whoop token refresh failed");
                return Ok(None);
            }
        };

        // Whoop may omit the refresh token; keep the old one then.
        let refresh_token = refreshed
            .refresh_token
            .filter(|t| !t.is_empty())
            .unwrap_or(credential.refresh_token);

        let Some(stored) = WhoopCredential::issue(
            user_id,
            refreshed.access_token,
            refresh_token,
            refreshed.expires_in,
            Utc::now(),
        ) else {
            tracing::warn!(
                user_id,
                expires_in = refreshed.expires_in,
                "Whoop refresh returned an unusable expires_in"
            );
            return Ok(None);
        };
        self.db.upsert_credential(&stored).await?;

        tracing::info!(user_id, expires_at = %stored.expires_at, "Whoop token refreshed");
        Ok(Some(stored.access_token))
    }

    // ─── OAuth Callback Handling ─────────────────────────────────────────────

    /// Exchange an authorization code and store the resulting credential.
    pub async fn handle_oauth_callback(
        &self,
        user_id: &str,
        code: &str,
    ) -> Result<WhoopCredential, AppError> {
        let tokens = self.client.exchange_code(code).await.map_err(|e| {
            tracing::error!(user_id, error = %e, "Whoop token exchange failed");
            AppError::from(e)
        })?;

        let credential = self
            .store_credential(
                user_id,
                &tokens.access_token,
                tokens.refresh_token.as_deref().unwrap_or_default(),
                tokens.expires_in,
            )
            .await?;

        tracing::info!(user_id, expires_at = %credential.expires_at, "Whoop connected");
        Ok(credential)
    }

    /// Summarize the user's connection for the status endpoint.
    pub async fn connection_status(&self, user_id: &str) -> Result<ConnectionStatus, AppError> {
        let status = match self.db.get_credential(user_id).await? {
            None => ConnectionStatus {
                connected: false,
                state: ConnectionState::Disconnected,
                expires_at: None,
                is_expiring_soon: None,
            },
            Some(credential) => {
                let needs_refresh = credential.is_expired(self.refresh_skew_secs);
                ConnectionStatus {
                    connected: true,
                    state: if needs_refresh {
                        ConnectionState::NeedsRefresh
                    } else {
                        ConnectionState::Connected
                    },
                    expires_at: Some(credential.expires_at),
                    is_expiring_soon: Some(needs_refresh),
                }
            }
        };
        Ok(status)
    }

    /// Revoke access with Whoop (best effort) and delete the local credential.
    pub async fn disconnect(&self, user_id: &str) -> Result<(), AppError> {
        if let Some(credential) = self.db.get_credential(user_id).await? {
            if let Err(e) = self.client.revoke_access(&credential.access_token).await {
                tracing::warn!(user_id, error = %e, "Whoop revoke failed, deleting local tokens anyway");
            }
        }
        self.delete_credential(user_id).await?;
        tracing::info!(user_id, "Whoop disconnected");
        Ok(())
    }
}
