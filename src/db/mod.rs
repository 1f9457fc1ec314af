// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential storage.
//!
//! [`CredentialStore`] is the capability the reconciliation actions need;
//! [`AirtableStore`] is the production backend and [`InMemoryStore`] backs
//! local runs and tests.

pub mod airtable;
pub mod memory;

pub use airtable::{AirtableClient, AirtableStore};
pub use memory::InMemoryStore;

use crate::error::{AppError, Result};
use crate::models::{
    AthleteProfile, DestinationBinding, NotionCredentials, SourceCredentials, StravaCredentials,
};
use async_trait::async_trait;

/// Column names in the tabular backend.
pub mod fields {
    pub const ATHLETE_ID: &str = "athlete_id";
    pub const USER_EMAIL: &str = "user_email";
    pub const NOTION_BOT_ID: &str = "notion_bot_id";
    pub const BOT_ID: &str = "bot_id";
    pub const DATABASE_ID: &str = "database_id";
}

/// Typed access to linked accounts, tokens and destination bindings.
///
/// Every single-record lookup must resolve to exactly one row: zero rows is
/// `NotFound`, more than one is `AmbiguousRecord`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Emails of every app user linked to this Strava athlete.
    async fn get_linked_accounts(&self, athlete_id: &str) -> Result<Vec<String>>;

    async fn get_source_credentials(
        &self,
        athlete_id: &str,
        user_email: &str,
    ) -> Result<SourceCredentials>;

    /// Overwrite the stored token. Last writer wins.
    async fn update_source_credentials(
        &self,
        athlete_id: &str,
        user_email: &str,
        token: &SourceCredentials,
    ) -> Result<()>;

    /// Display name, falling back to "firstname lastname".
    async fn get_username(&self, athlete_id: &str, user_email: &str) -> Result<String>;

    async fn list_destination_bindings(
        &self,
        athlete_id: &str,
        user_email: &str,
    ) -> Result<Vec<DestinationBinding>>;

    async fn get_destination_binding(
        &self,
        athlete_id: &str,
        user_email: &str,
        bot_id: &str,
    ) -> Result<DestinationBinding>;

    async fn get_destination_access_token(&self, bot_id: &str) -> Result<String>;

    async fn upsert_source_account(
        &self,
        credentials: &StravaCredentials,
        user_email: &str,
        profile: &AthleteProfile,
    ) -> Result<()>;

    async fn upsert_destination_binding(
        &self,
        credentials: &NotionCredentials,
        user_email: &str,
        athlete_id: &str,
    ) -> Result<()>;

    async fn update_collection_id(
        &self,
        user_email: &str,
        athlete_id: &str,
        bot_id: &str,
        collection_id: &str,
    ) -> Result<()>;
}

/// Reduce a query result to its only row.
pub(crate) fn single_row<T>(mut rows: Vec<T>, what: impl FnOnce() -> String) -> Result<T> {
    match rows.len() {
        0 => Err(AppError::NotFound(what())),
        1 => Ok(rows.remove(0)),
        count => Err(AppError::AmbiguousRecord {
            what: what(),
            count,
        }),
    }
}

/// Username if set, else "firstname lastname".
pub(crate) fn display_name(
    username: Option<&str>,
    firstname: Option<&str>,
    lastname: Option<&str>,
) -> String {
    match username.map(str::trim).filter(|u| !u.is_empty()) {
        Some(username) => username.to_string(),
        None => format!(
            "{} {}",
            firstname.unwrap_or_default(),
            lastname.unwrap_or_default()
        )
        .trim()
        .to_string(),
    }
}

/// Keep the first occurrence of each email.
pub(crate) fn dedup_preserving_order(emails: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = Vec::new();
    for email in emails {
        if !seen.contains(&email) {
            seen.push(email);
        }
    }
    seen
}
