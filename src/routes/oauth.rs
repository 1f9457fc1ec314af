// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth routes used by the onboarding frontend.
//!
//! The frontend exchanges each platform's authorization code through us
//! (the client secrets stay server-side), then posts the resulting
//! credentials back to be stored.

use crate::error::{AppError, Result};
use crate::models::{NotionCredentials, StravaCredentials};
use crate::services::{notion, onboarding, strava};
use crate::AppState;
use axum::{
    extract::{Json, State},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// OAuth routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/strava_oauth_token", post(strava_oauth_token))
        .route("/notion_oauth_token", post(notion_oauth_token))
        .route("/add_strava_oauth", post(add_strava_oauth))
        .route("/add_notion", post(add_notion))
}

#[derive(Debug, Deserialize, Validate)]
struct CodeRequest {
    #[validate(length(min = 1))]
    code: String,
}

#[derive(Debug, Deserialize, Validate)]
struct AddStravaRequest {
    #[validate(nested)]
    strava: StravaCredentials,
    #[validate(email)]
    user_email: String,
}

/// The only part of the Strava credentials `/add_notion` needs.
#[derive(Debug, Deserialize)]
struct AthleteRef {
    #[serde(deserialize_with = "crate::models::id::deserialize")]
    athlete: String,
}

#[derive(Debug, Deserialize, Validate)]
struct AddNotionRequest {
    #[validate(nested)]
    notion: NotionCredentials,
    #[validate(email)]
    user_email: String,
    strava: AthleteRef,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    database_id: Option<String>,
}

fn validated<T: Validate>(request: T) -> Result<T> {
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(request)
}

async fn strava_oauth_token(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CodeRequest>,
) -> Result<Json<strava::StravaTokenExchange>> {
    let request = validated(request)?;
    let token = strava::exchange_code(&state.config.strava, &request.code).await?;
    tracing::info!(expires_at = token.expires_at, "Exchanged Strava authorization code");
    Ok(Json(token))
}

async fn notion_oauth_token(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CodeRequest>,
) -> Result<Json<NotionCredentials>> {
    let request = validated(request)?;
    let credentials = notion::exchange_token(&state.config.notion, &request.code).await?;
    tracing::info!(bot_id = %credentials.bot_id, "Exchanged Notion authorization code");
    Ok(Json(credentials))
}

async fn add_strava_oauth(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddStravaRequest>,
) -> Result<Json<StatusResponse>> {
    let request = validated(request)?;
    onboarding::link_strava_account(
        state.store.as_ref(),
        &state.config.strava,
        &request.strava,
        &request.user_email,
    )
    .await?;

    Ok(Json(StatusResponse {
        status: "ok",
        database_id: None,
    }))
}

async fn add_notion(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddNotionRequest>,
) -> Result<Json<StatusResponse>> {
    let request = validated(request)?;
    let database_id = onboarding::link_notion_workspace(
        state.store.as_ref(),
        &state.config.notion,
        &request.notion,
        &request.user_email,
        &request.strava.athlete,
    )
    .await?;

    Ok(Json(StatusResponse {
        status: "ok",
        database_id: Some(database_id),
    }))
}
