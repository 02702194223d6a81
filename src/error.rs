// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Whoop API unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Malformed Whoop response: {0}")]
    MalformedUpstream(String),

    #[error("Aggregation failed: {0}")]
    Aggregation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True for failures of the wearable vendor rather than of this service.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AppError::UpstreamUnavailable(_) | AppError::MalformedUpstream(_)
        )
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::UpstreamUnavailable(msg) => {
                tracing::warn!(error = %msg, "Whoop API unavailable");
                (StatusCode::BAD_GATEWAY, "whoop_unavailable", Some(msg.clone()))
            }
            AppError::MalformedUpstream(msg) => {
                tracing::warn!(error = %msg, "Malformed Whoop response");
                (StatusCode::BAD_GATEWAY, "whoop_malformed", Some(msg.clone()))
            }
            AppError::Aggregation(msg) => {
                tracing::error!(error = %msg, "Aggregation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "aggregation_failed",
                    Some(msg.clone()),
                )
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Configuration(msg) => {
                tracing::error!(error = %msg, "Configuration error");
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
