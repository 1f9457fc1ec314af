// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! First-time linking of Strava accounts and Notion workspaces.

use crate::config::{NotionSettings, StravaSettings};
use crate::db::CredentialStore;
use crate::error::{AppError, Result};
use crate::models::{NotionCredentials, StravaCredentials};
use crate::services::mapper::{database_schema, DATABASE_TITLE};
use crate::services::notion::NotionClient;
use crate::services::strava::StravaClient;
use serde_json::json;

/// Store (or refresh) a user's Strava account and profile.
///
/// The stored token is the client's current one, so a token that had to be
/// refreshed to read the profile is not written back stale.
pub async fn link_strava_account(
    store: &dyn CredentialStore,
    settings: &StravaSettings,
    credentials: &StravaCredentials,
    user_email: &str,
) -> Result<()> {
    let mut client = StravaClient::new(settings, &credentials.token())?;
    let profile = client.get_athlete().await?;

    let current = client.token();
    let linked = StravaCredentials {
        access_token: current.access_token,
        refresh_token: current.refresh_token,
        expires_at: current.expires_at,
        athlete: credentials.athlete.clone(),
    };
    store
        .upsert_source_account(&linked, user_email, &profile)
        .await?;

    tracing::info!(athlete_id = %credentials.athlete, user_email, "Linked Strava account");
    Ok(())
}

/// Store a Notion integration for a linked account and, the first time,
/// create its activities database.
///
/// Returns the database id.
pub async fn link_notion_workspace(
    store: &dyn CredentialStore,
    settings: &NotionSettings,
    credentials: &NotionCredentials,
    user_email: &str,
    athlete_id: &str,
) -> Result<String> {
    store
        .upsert_destination_binding(credentials, user_email, athlete_id)
        .await?;

    let binding = store
        .get_destination_binding(athlete_id, user_email, &credentials.bot_id)
        .await?;
    if let Some(database_id) = binding.collection_id {
        tracing::debug!(
            bot_id = %credentials.bot_id,
            database_id = %database_id,
            "Database already provisioned"
        );
        return Ok(database_id);
    }

    let notion = NotionClient::new(settings, &credentials.access_token);
    let pages = notion
        .search(&json!({"property": "object", "value": "page"}))
        .await?;
    let parent = pages.first().ok_or_else(|| AppError::NoSharedDestination {
        bot_id: credentials.bot_id.clone(),
    })?;

    let database_id = notion
        .create_database(&parent.id, DATABASE_TITLE, &database_schema())
        .await?;
    store
        .update_collection_id(user_email, athlete_id, &credentials.bot_id, &database_id)
        .await?;

    tracing::info!(
        bot_id = %credentials.bot_id,
        parent_page_id = %parent.id,
        database_id = %database_id,
        "Created activities database"
    );
    Ok(database_id)
}
