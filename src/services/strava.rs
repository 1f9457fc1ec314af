// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client for fetching activities.
//!
//! Handles:
//! - Activity and athlete fetching
//! - Token refresh when expired (10 second safety margin)
//! - OAuth authorization code exchange

use crate::config::StravaSettings;
use crate::error::{AppError, Platform, Result};
use crate::models::{ActivityRecord, AthleteProfile, SourceCredentials};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seconds before `expires_at` at which a token is already treated as expired.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 10;

/// True when a token expiring at `expires_at` must be refreshed at `now`.
pub fn token_expired(expires_at: i64, now: DateTime<Utc>) -> bool {
    expires_at - TOKEN_REFRESH_MARGIN_SECS <= now.timestamp()
}

/// Strava API client bound to one athlete's token.
///
/// Built fresh for every linked account; the token it holds is the source of
/// truth until the caller persists what [`StravaClient::refresh_access_token`]
/// returns.
pub struct StravaClient {
    http: reqwest::Client,
    api_url: String,
    oauth_url: String,
    client_id: String,
    client_secret: String,
    access_token: String,
    refresh_token: String,
    expires_at: i64,
}

impl StravaClient {
    /// Create a client holding `credentials`. Fails fast if the app's OAuth
    /// credentials are not configured.
    pub fn new(settings: &StravaSettings, credentials: &SourceCredentials) -> Result<Self> {
        if settings.client_id.trim().is_empty() {
            return Err(AppError::MissingConfiguration("STRAVA_CLIENT_ID"));
        }
        if settings.client_secret.trim().is_empty() {
            return Err(AppError::MissingConfiguration("STRAVA_CLIENT_SECRET"));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            oauth_url: settings.oauth_url.trim_end_matches('/').to_string(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            access_token: credentials.access_token.clone(),
            refresh_token: credentials.refresh_token.clone(),
            expires_at: credentials.expires_at_epoch()?,
        })
    }

    /// The token currently held, in its stored form.
    pub fn token(&self) -> SourceCredentials {
        SourceCredentials {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            expires_at: self.expires_at.to_string(),
        }
    }

    /// Refresh the access token if it is expired at `now`.
    ///
    /// Returns the new token after a refresh, or `None` without touching the
    /// network while the held token is still valid.
    pub async fn refresh_access_token(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Option<SourceCredentials>> {
        if !token_expired(self.expires_at, now) {
            return Ok(None);
        }

        let response = self
            .http
            .post(format!("{}/token", self.oauth_url))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", self.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AppError::transport(Platform::Strava, e))?;

        let refreshed: TokenRefreshResponse = check_response_json(response).await?;

        self.access_token = refreshed.access_token;
        self.refresh_token = refreshed.refresh_token;
        self.expires_at = refreshed.expires_at;

        Ok(Some(self.token()))
    }

    /// Get a detailed activity by ID. Refreshes the token first, so callers
    /// should persist [`StravaClient::token`] if it changed.
    pub async fn get_activity(&mut self, activity_id: &str) -> Result<ActivityRecord> {
        self.refresh_access_token(Utc::now()).await?;
        let url = format!("{}/activities/{}", self.api_url, activity_id);
        self.get_json(&url).await
    }

    /// Get the authenticated athlete's profile. Refreshes the token first.
    pub async fn get_athlete(&mut self) -> Result<AthleteProfile> {
        self.refresh_access_token(Utc::now()).await?;
        let url = format!("{}/athlete", self.api_url);
        self.get_json(&url).await
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| AppError::transport(Platform::Strava, e))?;

        check_response_json(response).await
    }
}

/// Exchange an OAuth authorization code for the athlete's first token.
pub async fn exchange_code(settings: &StravaSettings, code: &str) -> Result<StravaTokenExchange> {
    let response = reqwest::Client::new()
        .post(format!("{}/token", settings.oauth_url.trim_end_matches('/')))
        .form(&[
            ("client_id", settings.client_id.as_str()),
            ("client_secret", settings.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .map_err(|e| AppError::transport(Platform::Strava, e))?;

    check_response_json(response).await
}

/// Check response status and parse the JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T> {
    if !response.status().is_success() {
        if response.status().as_u16() == 429 {
            tracing::warn!("Strava rate limit hit (429)");
        }
        return Err(AppError::from_response(Platform::Strava, response).await);
    }

    response.json().await.map_err(|e| AppError::Upstream {
        platform: Platform::Strava,
        status: 200,
        body: format!("JSON parse error: {}", e),
    })
}

/// Token refresh response from Strava.
#[derive(Debug, Clone, Deserialize)]
struct TokenRefreshResponse {
    access_token: String,
    refresh_token: String,
    expires_at: i64,
}

/// Token exchange response from Strava OAuth, passed back to the frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StravaTokenExchange {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    /// Summary athlete, forwarded untouched
    #[serde(default)]
    pub athlete: serde_json::Value,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
