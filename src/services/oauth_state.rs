// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed, single-use OAuth `state` parameters.
//!
//! The state is `base64url("user_b64|nonce_hex|issued_ms_hex|hmac_hex")`.
//! The HMAC binds the user to the nonce, and the nonce must match one this
//! process issued and has not yet consumed. The callback resolves the user
//! from that server-side record, never from an unsigned request value.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// How long an issued state stays valid.
pub const STATE_TTL_SECS: i64 = 10 * 60;

const NONCE_LEN: usize = 16;

/// Reasons a returned state is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("state is not in the expected format")]
    Malformed,
    #[error("state signature mismatch")]
    BadSignature,
    #[error("state was not issued or was already used")]
    Unknown,
    #[error("state expired")]
    Expired,
    #[error("random number generator failure")]
    Rng,
}

struct PendingAuthorization {
    user_id: String,
    issued_at: DateTime<Utc>,
}

/// Issues and verifies OAuth state parameters.
pub struct OAuthStateManager {
    key: Vec<u8>,
    rng: SystemRandom,
    pending: DashMap<String, PendingAuthorization>,
}

impl OAuthStateManager {
    pub fn new(key: &[u8]) -> Self {
        Self {
            key: key.to_vec(),
            rng: SystemRandom::new(),
            pending: DashMap::new(),
        }
    }

    /// Issue a fresh state for `user_id` and remember its nonce.
    pub fn issue(&self, user_id: &str) -> Result<String, StateError> {
        self.issue_at(user_id, Utc::now())
    }

    fn issue_at(&self, user_id: &str, now: DateTime<Utc>) -> Result<String, StateError> {
        self.purge_expired(now);

        let mut nonce = [0u8; NONCE_LEN];
        self.rng.fill(&mut nonce).map_err(|_| StateError::Rng)?;
        let nonce = hex::encode(nonce);

        let payload = format!(
            "{}|{}|{:x}",
            URL_SAFE_NO_PAD.encode(user_id.as_bytes()),
            nonce,
            now.timestamp_millis()
        );
        let signature = hex::encode(self.sign(&payload)?);

        self.pending.insert(
            nonce,
            PendingAuthorization {
                user_id: user_id.to_string(),
                issued_at: now,
            },
        );

        Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
    }

    /// Verify and consume a returned state, yielding the user it was issued to.
    pub fn consume(&self, state: &str) -> Result<String, StateError> {
        self.consume_at(state, Utc::now())
    }

    fn consume_at(&self, state: &str, now: DateTime<Utc>) -> Result<String, StateError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(state)
            .map_err(|_| StateError::Malformed)?;
        let state_str = String::from_utf8(bytes).map_err(|_| StateError::Malformed)?;

        let parts: Vec<&str> = state_str.split('|').collect();
        let [user_b64, nonce, issued_hex, signature_hex] = parts.as_slice() else {
            return Err(StateError::Malformed);
        };

        let payload = format!("{}|{}|{}", user_b64, nonce, issued_hex);
        let signature = hex::decode(signature_hex).map_err(|_| StateError::Malformed)?;
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        if mac.verify_slice(&signature).is_err() {
            tracing::error!("OAuth state signature mismatch! Potential tampering.");
            return Err(StateError::BadSignature);
        }

        let signed_user = URL_SAFE_NO_PAD
            .decode(user_b64)
            .ok()
            .and_then(|b| String::from_utf8(b).ok())
            .ok_or(StateError::Malformed)?;

        // Single use: the nonce is gone whether or not the rest checks out.
        let (_, pending) = self
            .pending
            .remove(*nonce)
            .ok_or(StateError::Unknown)?;

        if pending.user_id != signed_user {
            return Err(StateError::Unknown);
        }
        if now - pending.issued_at > Duration::seconds(STATE_TTL_SECS) {
            return Err(StateError::Expired);
        }

        Ok(pending.user_id)
    }

    /// Number of states issued and not yet consumed or expired.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn purge_expired(&self, now: DateTime<Utc>) {
        self.pending
            .retain(|_, p| now - p.issued_at <= Duration::seconds(STATE_TTL_SECS));
    }

    fn mac(&self) -> Result<HmacSha256, StateError> {
        HmacSha256::new_from_slice(&self.key).map_err(|_| StateError::Malformed)
    }

    fn sign(&self, payload: &str) -> Result<Vec<u8>, StateError> {
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }
}
