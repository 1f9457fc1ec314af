// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Linked-account and credential models.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Strava OAuth token triple as stored for one linked account.
///
/// `expires_at` is epoch seconds kept as a string, the way the tabular
/// backend stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCredentials {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: String,
}

impl SourceCredentials {
    /// Parse the stored expiry into epoch seconds.
    pub fn expires_at_epoch(&self) -> Result<i64, crate::error::AppError> {
        self.expires_at.trim().parse().map_err(|_| {
            crate::error::AppError::MalformedRecord(format!(
                "expires_at is not an epoch timestamp: {:?}",
                self.expires_at
            ))
        })
    }
}

/// Strava credentials submitted by the frontend after the OAuth exchange.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StravaCredentials {
    #[validate(length(min = 1))]
    pub access_token: String,
    #[validate(length(min = 1))]
    pub refresh_token: String,
    #[serde(deserialize_with = "crate::models::id::deserialize")]
    pub expires_at: String,
    /// Strava athlete id
    #[serde(deserialize_with = "crate::models::id::deserialize")]
    pub athlete: String,
}

impl StravaCredentials {
    pub fn token(&self) -> SourceCredentials {
        SourceCredentials {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            expires_at: self.expires_at.clone(),
        }
    }
}

/// Notion integration credentials returned by the Notion OAuth exchange.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NotionCredentials {
    #[validate(length(min = 1))]
    pub access_token: String,
    #[validate(length(min = 1))]
    pub bot_id: String,
    #[serde(default)]
    pub duplicated_template_id: Option<String>,
    #[serde(default)]
    pub owner: serde_json::Value,
    #[serde(default)]
    pub workspace_icon: Option<String>,
    #[serde(default)]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub workspace_name: Option<String>,
}

/// Athlete profile returned by Strava.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AthleteProfile {
    #[serde(deserialize_with = "crate::models::id::deserialize")]
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
}

/// One destination workspace bound to a linked account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationBinding {
    pub bot_id: String,
    /// Notion database id, unset until the first collection is provisioned
    pub collection_id: Option<String>,
}
