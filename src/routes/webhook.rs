// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook routes for Strava events.

use crate::error::Result;
use crate::AppState;
use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Webhook routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/strava_callback", get(verify).post(handle_event))
}

/// Strava webhook verification query params.
#[derive(Deserialize)]
struct VerifyParams {
    #[serde(rename = "hub.mode", default)]
    mode: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: String,
    #[serde(rename = "hub.verify_token")]
    verify_token: String,
}

/// Verification response.
#[derive(Serialize, Default)]
struct VerifyResponse {
    #[serde(rename = "hub.challenge")]
    challenge: String,
}

/// Verify webhook subscription (GET).
async fn verify(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> impl IntoResponse {
    let token_matches: bool = params
        .verify_token
        .as_bytes()
        .ct_eq(state.config.webhook_verify_token.as_bytes())
        .into();

    if token_matches {
        tracing::info!(mode = ?params.mode, "Webhook subscription verified");
        (
            StatusCode::OK,
            Json(VerifyResponse {
                challenge: params.challenge,
            }),
        )
    } else {
        tracing::warn!(
            mode = ?params.mode,
            "Webhook verification failed: invalid token"
        );
        (StatusCode::FORBIDDEN, Json(VerifyResponse::default()))
    }
}

/// Queue an incoming event (POST) and echo its body.
///
/// A queueing failure answers 500 so Strava redelivers the event.
async fn handle_event(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<(StatusCode, String)> {
    tracing::info!(payload = %body, "Webhook event received (raw)");

    let message_id = match state
        .event_queue
        .queue_events(&state.config.api_url, &body)
        .await
    {
        Ok(message_id) => message_id,
        Err(e) => {
            tracing::error!(error = %e, "Failed to queue webhook event");
            return Err(e);
        }
    };
    tracing::debug!(message_id = %message_id, "Webhook event queued");

    Ok((StatusCode::OK, body))
}
