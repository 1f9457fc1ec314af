// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reconciliation actions run for each Strava event.
//!
//! An event's `"{aspect_type}.{object_type}"` key selects the action. Both
//! actions share the same per-account pipeline (credentials, refresh,
//! username, activity fetch, mapping) and differ only in what they write to
//! each bound Notion database.
//!
//! Accounts and bindings are processed one at a time. A failure on one
//! binding is reported in the outcome message and processing moves on; any
//! other failure aborts the run and is returned to the caller.

mod create;
mod update;

use crate::config::{NotionSettings, StravaSettings};
use crate::db::CredentialStore;
use crate::error::{AppError, Result};
use crate::models::DestinationBinding;
use crate::services::mapper::{map_activity_to_properties, PropertyMap};
use crate::services::notion::NotionClient;
use crate::services::strava::StravaClient;
use chrono::Utc;
use std::sync::Arc;

/// Everything an action needs: who, what, and where to find credentials.
#[derive(Clone)]
pub struct ActionContext {
    /// Strava athlete id of the event's owner
    pub owner_id: String,
    /// Strava activity id
    pub object_id: String,
    pub store: Arc<dyn CredentialStore>,
    pub strava: StravaSettings,
    pub notion: NotionSettings,
}

/// Which action an event key maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    CreateActivity,
    UpdateActivity,
}

impl ActionKind {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "create.activity" => Some(ActionKind::CreateActivity),
            "update.activity" => Some(ActionKind::UpdateActivity),
            _ => None,
        }
    }
}

/// A runnable action bound to its context.
pub enum Action {
    CreateActivity(ActionContext),
    UpdateActivity(ActionContext),
}

/// What `run` reports back. `code` is 200 whenever `run` returns at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub code: u16,
    /// One line per (account, binding) pair
    pub message: String,
}

impl RunOutcome {
    fn ok(lines: Vec<String>) -> Self {
        Self {
            code: 200,
            message: lines.join("\n"),
        }
    }
}

/// Build the action for an event key.
pub fn dispatch(key: &str, context: ActionContext) -> Result<Action> {
    match ActionKind::from_key(key) {
        Some(ActionKind::CreateActivity) => Ok(Action::CreateActivity(context)),
        Some(ActionKind::UpdateActivity) => Ok(Action::UpdateActivity(context)),
        None => Err(AppError::UnrecognizedAction(key.to_string())),
    }
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::CreateActivity(_) => ActionKind::CreateActivity,
            Action::UpdateActivity(_) => ActionKind::UpdateActivity,
        }
    }

    pub fn context(&self) -> &ActionContext {
        match self {
            Action::CreateActivity(context) | Action::UpdateActivity(context) => context,
        }
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        match self {
            Action::CreateActivity(context) => create::run(context).await,
            Action::UpdateActivity(context) => update::run(context).await,
        }
    }
}

/// Persist the client's token if it had to be refreshed.
pub async fn refresh_strava_token(
    store: &dyn CredentialStore,
    athlete_id: &str,
    user_email: &str,
    client: &mut StravaClient,
) -> Result<()> {
    match client.refresh_access_token(Utc::now()).await? {
        Some(token) => {
            tracing::debug!(athlete_id, user_email, "Refreshed Strava token");
            store
                .update_source_credentials(athlete_id, user_email, &token)
                .await
        }
        None => {
            tracing::debug!(athlete_id, user_email, "Strava token still valid");
            Ok(())
        }
    }
}

/// An account whose activity has been fetched and mapped.
struct PreparedAccount {
    user_email: String,
    properties: PropertyMap,
    bindings: Vec<DestinationBinding>,
}

/// Run the per-account pipeline and list the account's bindings.
///
/// Errors here are not tied to one binding, so they abort the action.
async fn prepare_account(context: &ActionContext, user_email: &str) -> Result<PreparedAccount> {
    let store = context.store.as_ref();
    let owner_id = context.owner_id.as_str();

    let credentials = store.get_source_credentials(owner_id, user_email).await?;
    let mut strava = StravaClient::new(&context.strava, &credentials)?;
    refresh_strava_token(store, owner_id, user_email, &mut strava).await?;
    let saved = strava.token();

    let username = store.get_username(owner_id, user_email).await?;
    // The fetch refreshes again if the token expired while we waited on the store
    let activity = strava.get_activity(&context.object_id).await;
    let current = strava.token();
    if current != saved {
        tracing::debug!(athlete_id = owner_id, user_email, "Strava token refreshed during fetch");
        store
            .update_source_credentials(owner_id, user_email, &current)
            .await?;
    }
    let properties = map_activity_to_properties(&activity?, &username)?;

    let bindings = store.list_destination_bindings(owner_id, user_email).await?;
    tracing::debug!(
        athlete_id = owner_id,
        user_email,
        activity_id = %context.object_id,
        bindings = bindings.len(),
        "Prepared account"
    );

    Ok(PreparedAccount {
        user_email: user_email.to_string(),
        properties,
        bindings,
    })
}

/// Notion client and database id for one binding.
async fn open_binding<'a>(
    context: &ActionContext,
    binding: &'a DestinationBinding,
) -> Result<(NotionClient, &'a str)> {
    let database_id = binding.collection_id.as_deref().ok_or_else(|| {
        AppError::NotFound(format!("database for bot_id {}", binding.bot_id))
    })?;
    let token = context
        .store
        .get_destination_access_token(&binding.bot_id)
        .await?;
    Ok((NotionClient::new(&context.notion, &token), database_id))
}
