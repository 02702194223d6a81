// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Whoop OAuth credential stored per user.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Stored OAuth credential (`whoop_tokens`, one row per user).
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct WhoopCredential {
    /// Owning user (natural key)
    pub user_id: String,
    pub access_token: String,
    /// May be empty if Whoop did not grant `offline`
    #[serde(default)]
    pub refresh_token: String,
    /// Absolute expiry of the access token
    pub expires_at: DateTime<Utc>,
    /// When this row was last written
    pub updated_at: DateTime<Utc>,
}

impl WhoopCredential {
    /// Build a credential from a token response received at `issued_at`.
    ///
    /// The expiry is always derived here; callers never supply it.
    /// Returns `None` when `expires_in_secs` puts the expiry outside the
    /// representable time range.
    pub fn issue(
        user_id: impl Into<String>,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in_secs: i64,
        issued_at: DateTime<Utc>,
    ) -> Option<Self> {
        let expires_at = Duration::try_seconds(expires_in_secs.max(0))
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))?;
        Some(Self {
            user_id: user_id.into(),
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at,
            updated_at: issued_at,
        })
    }

    /// True when `now >= expires_at - skew`.
    pub fn is_expired_at(&self, now: DateTime<Utc>, skew_secs: i64) -> bool {
        Duration::try_seconds(skew_secs)
            .and_then(|skew| self.expires_at.checked_sub_signed(skew))
            .is_none_or(|soft_expiry| now >= soft_expiry)
    }

    /// [`Self::is_expired_at`] against the current time.
    pub fn is_expired(&self, skew_secs: i64) -> bool {
        self.is_expired_at(Utc::now(), skew_secs)
    }

    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.trim().is_empty()
    }
}

// Tokens stay out of logs.
impl std::fmt::Debug for WhoopCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhoopCredential")
            .field("user_id", &self.user_id)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}
