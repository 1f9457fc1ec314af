// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process credential store.
//!
//! Same table layout and exactly-one-row rule as the Airtable store, kept in
//! memory. Used for local runs without a base and as the test double for the
//! reconciliation actions.

use crate::db::{dedup_preserving_order, display_name, single_row, CredentialStore};
use crate::error::{AppError, Result};
use crate::models::{
    AthleteProfile, DestinationBinding, NotionCredentials, SourceCredentials, StravaCredentials,
};
use async_trait::async_trait;
use std::sync::Mutex;

/// A Strava account row.
#[derive(Debug, Clone)]
pub struct StoredAccount {
    pub athlete_id: String,
    pub user_email: String,
    pub credentials: SourceCredentials,
    pub username: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
}

#[derive(Debug, Clone)]
struct RelationRow {
    athlete_id: String,
    user_email: String,
    bot_id: String,
    collection_id: Option<String>,
}

#[derive(Debug, Clone)]
struct IntegrationRow {
    bot_id: String,
    access_token: String,
}

#[derive(Default)]
struct Tables {
    accounts: Vec<StoredAccount>,
    relations: Vec<RelationRow>,
    integrations: Vec<IntegrationRow>,
    credential_updates: usize,
}

/// Credential store held in memory.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<std::sync::MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("in-memory store lock poisoned")))
    }

    /// Append an account row (duplicates allowed, to mirror a real table).
    pub fn insert_account(&self, account: StoredAccount) -> Result<()> {
        self.tables()?.accounts.push(account);
        Ok(())
    }

    /// Append a relation row binding an account to a Notion integration.
    pub fn insert_binding(
        &self,
        athlete_id: &str,
        user_email: &str,
        bot_id: &str,
        collection_id: Option<&str>,
    ) -> Result<()> {
        self.tables()?.relations.push(RelationRow {
            athlete_id: athlete_id.to_string(),
            user_email: user_email.to_string(),
            bot_id: bot_id.to_string(),
            collection_id: collection_id.map(str::to_string),
        });
        Ok(())
    }

    /// Append a Notion integration row.
    pub fn insert_integration(&self, bot_id: &str, access_token: &str) -> Result<()> {
        self.tables()?.integrations.push(IntegrationRow {
            bot_id: bot_id.to_string(),
            access_token: access_token.to_string(),
        });
        Ok(())
    }

    /// How many times `update_source_credentials` has written a token.
    pub fn credential_updates(&self) -> Result<usize> {
        Ok(self.tables()?.credential_updates)
    }

    fn account_index(tables: &Tables, athlete_id: &str, user_email: &str) -> Result<usize> {
        let matches: Vec<usize> = tables
            .accounts
            .iter()
            .enumerate()
            .filter(|(_, a)| a.athlete_id == athlete_id && a.user_email == user_email)
            .map(|(i, _)| i)
            .collect();
        single_row(matches, || {
            format!("account athlete_id={} user_email={}", athlete_id, user_email)
        })
    }

    fn relation_index(
        tables: &Tables,
        athlete_id: &str,
        user_email: &str,
        bot_id: &str,
    ) -> Result<usize> {
        let matches: Vec<usize> = tables
            .relations
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                r.athlete_id == athlete_id && r.user_email == user_email && r.bot_id == bot_id
            })
            .map(|(i, _)| i)
            .collect();
        single_row(matches, || {
            format!(
                "relation athlete_id={} user_email={} bot_id={}",
                athlete_id, user_email, bot_id
            )
        })
    }
}

/// `Ok(None)` when nothing matched, so callers can insert.
fn optional<T>(lookup: Result<T>) -> Result<Option<T>> {
    match lookup {
        Ok(value) => Ok(Some(value)),
        Err(AppError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn get_linked_accounts(&self, athlete_id: &str) -> Result<Vec<String>> {
        let tables = self.tables()?;
        Ok(dedup_preserving_order(
            tables
                .accounts
                .iter()
                .filter(|a| a.athlete_id == athlete_id)
                .map(|a| a.user_email.clone()),
        ))
    }

    async fn get_source_credentials(
        &self,
        athlete_id: &str,
        user_email: &str,
    ) -> Result<SourceCredentials> {
        let tables = self.tables()?;
        let index = Self::account_index(&tables, athlete_id, user_email)?;
        Ok(tables.accounts[index].credentials.clone())
    }

    async fn update_source_credentials(
        &self,
        athlete_id: &str,
        user_email: &str,
        token: &SourceCredentials,
    ) -> Result<()> {
        let mut tables = self.tables()?;
        let index = Self::account_index(&tables, athlete_id, user_email)?;
        tables.accounts[index].credentials = token.clone();
        tables.credential_updates += 1;
        Ok(())
    }

    async fn get_username(&self, athlete_id: &str, user_email: &str) -> Result<String> {
        let tables = self.tables()?;
        let account = &tables.accounts[Self::account_index(&tables, athlete_id, user_email)?];
        Ok(display_name(
            account.username.as_deref(),
            account.firstname.as_deref(),
            account.lastname.as_deref(),
        ))
    }

    async fn list_destination_bindings(
        &self,
        athlete_id: &str,
        user_email: &str,
    ) -> Result<Vec<DestinationBinding>> {
        let tables = self.tables()?;
        Ok(tables
            .relations
            .iter()
            .filter(|r| r.athlete_id == athlete_id && r.user_email == user_email)
            .map(|r| DestinationBinding {
                bot_id: r.bot_id.clone(),
                collection_id: r.collection_id.clone(),
            })
            .collect())
    }

    async fn get_destination_binding(
        &self,
        athlete_id: &str,
        user_email: &str,
        bot_id: &str,
    ) -> Result<DestinationBinding> {
        let tables = self.tables()?;
        let row = &tables.relations[Self::relation_index(&tables, athlete_id, user_email, bot_id)?];
        Ok(DestinationBinding {
            bot_id: row.bot_id.clone(),
            collection_id: row.collection_id.clone(),
        })
    }

    async fn get_destination_access_token(&self, bot_id: &str) -> Result<String> {
        let tables = self.tables()?;
        let tokens: Vec<String> = tables
            .integrations
            .iter()
            .filter(|i| i.bot_id == bot_id)
            .map(|i| i.access_token.clone())
            .collect();
        single_row(tokens, || format!("integration bot_id={}", bot_id))
    }

    async fn upsert_source_account(
        &self,
        credentials: &StravaCredentials,
        user_email: &str,
        profile: &AthleteProfile,
    ) -> Result<()> {
        let mut tables = self.tables()?;
        let account = StoredAccount {
            athlete_id: credentials.athlete.clone(),
            user_email: user_email.to_string(),
            credentials: credentials.token(),
            username: profile.username.clone(),
            firstname: profile.firstname.clone(),
            lastname: profile.lastname.clone(),
        };

        match optional(Self::account_index(&tables, &credentials.athlete, user_email))? {
            Some(index) => tables.accounts[index] = account,
            None => tables.accounts.push(account),
        }
        Ok(())
    }

    async fn upsert_destination_binding(
        &self,
        credentials: &NotionCredentials,
        user_email: &str,
        athlete_id: &str,
    ) -> Result<()> {
        let mut tables = self.tables()?;

        let integrations: Vec<usize> = tables
            .integrations
            .iter()
            .enumerate()
            .filter(|(_, i)| i.bot_id == credentials.bot_id)
            .map(|(i, _)| i)
            .collect();
        let integration = IntegrationRow {
            bot_id: credentials.bot_id.clone(),
            access_token: credentials.access_token.clone(),
        };
        match optional(single_row(integrations, || {
            format!("integration bot_id={}", credentials.bot_id)
        }))? {
            Some(index) => tables.integrations[index] = integration,
            None => tables.integrations.push(integration),
        }

        let existing = optional(Self::relation_index(
            &tables,
            athlete_id,
            user_email,
            &credentials.bot_id,
        ))?;
        if existing.is_none() {
            tables.relations.push(RelationRow {
                athlete_id: athlete_id.to_string(),
                user_email: user_email.to_string(),
                bot_id: credentials.bot_id.clone(),
                collection_id: None,
            });
        }
        Ok(())
    }

    async fn update_collection_id(
        &self,
        user_email: &str,
        athlete_id: &str,
        bot_id: &str,
        collection_id: &str,
    ) -> Result<()> {
        let mut tables = self.tables()?;
        let index = Self::relation_index(&tables, athlete_id, user_email, bot_id)?;
        tables.relations[index].collection_id = Some(collection_id.to_string());
        Ok(())
    }
}
