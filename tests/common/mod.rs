// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

#![allow(dead_code)]

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use health_tracker::config::Config;
use health_tracker::db::{Db, MemoryDb};
use health_tracker::middleware::auth::create_jwt;
use health_tracker::routes::create_router;
use health_tracker::AppState;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// User the test config treats as the owner.
pub const TEST_USER: &str = "test-user";

/// Records per page served by the fake vendor, small to force paging.
pub const FAKE_PAGE_SIZE: usize = 2;

// ─── Fake Whoop Vendor ───────────────────────────────────────

#[derive(Default)]
pub struct FakeWhoopState {
    pub token_calls: AtomicUsize,
    pub collection_calls: AtomicUsize,
    pub revoke_calls: AtomicUsize,
    /// Serve 503 for every collection request
    pub collections_down: AtomicBool,
    /// Serve 400 from the token endpoint
    pub token_endpoint_rejects: AtomicBool,
    /// Omit `refresh_token` from token responses
    pub omit_refresh_token: AtomicBool,
    /// `expires_in` served by the token endpoint; 0 means the usual 3600
    pub token_expires_in: AtomicI64,
    records: Mutex<HashMap<String, Vec<Value>>>,
}

/// Whoop stand-in served on an ephemeral localhost port.
#[derive(Clone)]
pub struct FakeWhoop {
    pub base_url: String,
    pub state: Arc<FakeWhoopState>,
}

impl FakeWhoop {
    pub async fn start() -> Self {
        let state = Arc::new(FakeWhoopState::default());
        let app = Router::new()
            .route("/oauth/oauth2/token", post(token))
            .route("/developer/v2/{*path}", get(collection).delete(revoke))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake Whoop listener");
        let addr = listener.local_addr().expect("fake Whoop address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// Replace the records served for `path`, e.g. `"cycle"` or `"activity/workout"`.
    pub fn set_records(&self, path: &str, records: Vec<Value>) {
        self.state
            .records
            .lock()
            .unwrap()
            .insert(path.to_string(), records);
    }

    pub fn token_calls(&self) -> usize {
        self.state.token_calls.load(Ordering::SeqCst)
    }

    pub fn collection_calls(&self) -> usize {
        self.state.collection_calls.load(Ordering::SeqCst)
    }

    pub fn revoke_calls(&self) -> usize {
        self.state.revoke_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.token_calls() + self.collection_calls() + self.revoke_calls()
    }
}

async fn token(State(state): State<Arc<FakeWhoopState>>) -> impl IntoResponse {
    let n = state.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
    if state.token_endpoint_rejects.load(Ordering::SeqCst) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant" })),
        );
    }
    let expires_in = match state.token_expires_in.load(Ordering::SeqCst) {
        0 => 3600,
        custom => custom,
    };
    let mut body = json!({
        "access_token": format!("access-{}", n),
        "expires_in": expires_in,
        "token_type": "bearer",
    });
    if !state.omit_refresh_token.load(Ordering::SeqCst) {
        body["refresh_token"] = json!(format!("refresh-{}", n));
    }
    (StatusCode::OK, Json(body))
}

async fn collection(
    State(state): State<Arc<FakeWhoopState>>,
    Path(path): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    state.collection_calls.fetch_add(1, Ordering::SeqCst);
    if state.collections_down.load(Ordering::SeqCst) {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "down" })),
        );
    }

    let records = state
        .records
        .lock()
        .unwrap()
        .get(&path)
        .cloned()
        .unwrap_or_default();
    let offset: usize = params
        .get("nextToken")
        .and_then(|t| t.parse().ok())
        .unwrap_or(0);
    let page: Vec<Value> = records
        .iter()
        .skip(offset)
        .take(FAKE_PAGE_SIZE)
        .cloned()
        .collect();
    let next = offset + page.len();
    let next_token = (next < records.len()).then(|| next.to_string());

    (
        StatusCode::OK,
        Json(json!({ "records": page, "next_token": next_token })),
    )
}

async fn revoke(State(state): State<Arc<FakeWhoopState>>) -> StatusCode {
    state.revoke_calls.fetch_add(1, Ordering::SeqCst);
    StatusCode::NO_CONTENT
}

// ─── Record Builders ─────────────────────────────────────────

pub fn cycle(id: i64, start: &str, strain: f64, kilojoule: f64) -> Value {
    json!({
        "id": id,
        "user_id": 10129,
        "start": start,
        "end": null,
        "timezone_offset": "+00:00",
        "score_state": "SCORED",
        "score": { "strain": strain, "kilojoule": kilojoule, "average_heart_rate": 68, "max_heart_rate": 141 }
    })
}

pub fn recovery(cycle_id: i64, score: f64) -> Value {
    json!({
        "cycle_id": cycle_id,
        "sleep_id": "ecfc6a15-4661-442f-a9a4-f160dd7afae8",
        "user_id": 10129,
        "score_state": "SCORED",
        "score": {
            "user_calibrating": false,
            "recovery_score": score,
            "resting_heart_rate": 52.0,
            "hrv_rmssd_milli": 61.4,
            "spo2_percentage": 95.6,
            "skin_temp_celsius": 33.7
        }
    })
}

pub fn sleep(end: &str, in_bed_ms: i64, awake_ms: i64) -> Value {
    json!({
        "id": format!("sleep-{}", end),
        "end": end,
        "timezone_offset": "+00:00",
        "nap": false,
        "score_state": "SCORED",
        "score": {
            "stage_summary": {
                "total_in_bed_time_milli": in_bed_ms,
                "total_awake_time_milli": awake_ms
            },
            "sleep_performance_percentage": 88.0,
            "sleep_efficiency_percentage": 91.5
        }
    })
}

pub fn workout(id: &str, start: &str, end: &str) -> Value {
    json!({
        "id": id,
        "start": start,
        "end": end,
        "timezone_offset": "+00:00",
        "sport_name": "running",
        "score_state": "SCORED",
        "score": {
            "strain": 11.2,
            "average_heart_rate": 142,
            "max_heart_rate": 176,
            "kilojoule": 1673.6,
            "distance_meter": 8000.0,
            "zone_durations": {
                "zone_zero_milli": 0,
                "zone_one_milli": 300000,
                "zone_two_milli": 900000,
                "zone_three_milli": 1200000,
                "zone_four_milli": 600000,
                "zone_five_milli": 0
            }
        }
    })
}

// ─── App Construction ────────────────────────────────────────

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub db: MemoryDb,
    pub whoop: FakeWhoop,
}

/// Config pointing every Whoop URL at `whoop`.
pub fn test_config(whoop: &FakeWhoop) -> Config {
    let mut config = Config::test_default();
    config.whoop_api_url = whoop.base_url.clone();
    config.whoop_oauth_url = whoop.base_url.clone();
    config
}

/// App wired to an in-memory store and a fresh fake Whoop.
pub async fn spawn_app() -> TestApp {
    let whoop = FakeWhoop::start().await;
    spawn_app_with_config(whoop.clone(), test_config(&whoop))
}

pub fn spawn_app_with_config(whoop: FakeWhoop, config: Config) -> TestApp {
    let db = MemoryDb::new();
    let store: Db = Arc::new(db.clone());
    let state = Arc::new(AppState::new(config, store).expect("app state"));
    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        whoop,
    }
}

/// Router and state with no vendor reachable.
pub fn create_test_app() -> (Router, Arc<AppState>) {
    let store: Db = Arc::new(MemoryDb::new());
    let state = Arc::new(AppState::new(Config::test_default(), store).expect("app state"));
    (create_router(state.clone()), state)
}

/// Session token for `TEST_USER`.
pub fn session_token(state: &AppState) -> String {
    create_jwt(TEST_USER, &state.config.jwt_signing_key).expect("jwt")
}

/// Store a credential for `TEST_USER` expiring in `expires_in` seconds.
pub async fn connect_whoop(state: &AppState, expires_in: i64) {
    state
        .whoop
        .store_credential(TEST_USER, "stored-access", "stored-refresh", expires_in)
        .await
        .expect("store credential");
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}
