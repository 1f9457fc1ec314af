// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

/// Third-party platform an upstream error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Strava,
    Notion,
    Airtable,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Strava => "Strava",
            Platform::Notion => "Notion",
            Platform::Airtable => "Airtable",
        };
        f.write_str(name)
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("{count} records found for {what}, expected exactly one")]
    AmbiguousRecord { what: String, count: usize },

    #[error("{platform} API error (HTTP {status}): {body}")]
    Upstream {
        platform: Platform,
        status: u16,
        body: String,
    },

    #[error("{platform} request failed: {message}")]
    Transport { platform: Platform, message: String },

    #[error("Missing required configuration: {0}")]
    MissingConfiguration(&'static str),

    #[error("Integration of bot_id {bot_id} is not shared with any page")]
    NoSharedDestination { bot_id: String },

    #[error("Unrecognized action: {0}")]
    UnrecognizedAction(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("{method} {path} not implemented")]
    NotImplemented { method: String, path: String },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Build an upstream error from a non-success response, keeping the raw body.
    pub(crate) async fn from_response(platform: Platform, response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        AppError::Upstream {
            platform,
            status,
            body,
        }
    }

    pub(crate) fn transport(platform: Platform, err: reqwest::Error) -> Self {
        AppError::Transport {
            platform,
            message: err.to_string(),
        }
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
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::NotImplemented { .. } => (
                StatusCode::NOT_IMPLEMENTED,
                "not_implemented",
                Some(self.to_string()),
            ),
            AppError::Upstream { platform, .. } | AppError::Transport { platform, .. } => {
                tracing::error!(error = %self, "Upstream platform error");
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream_error",
                    Some(platform.to_string()),
                )
            }
            AppError::NoSharedDestination { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "no_shared_destination",
                Some(self.to_string()),
            ),
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            _ => {
                tracing::error!(error = %self, "Request failed");
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
