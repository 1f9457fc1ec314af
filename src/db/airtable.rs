// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Airtable REST client and the Airtable-backed credential store.
//!
//! Three tables:
//! - Strava accounts (one row per athlete/email pair, holds the OAuth token)
//! - Strava/Notion relations (one row per athlete/email/bot, holds the database id)
//! - Notion integrations (one row per bot id, holds the access token)

use crate::config::AirtableSettings;
use crate::db::{dedup_preserving_order, display_name, fields, single_row, CredentialStore};
use crate::error::{AppError, Platform, Result};
use crate::models::{
    AthleteProfile, DestinationBinding, NotionCredentials, SourceCredentials, StravaCredentials,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Lifetime Strava reports for a fresh access token, in seconds.
const STRAVA_TOKEN_LIFETIME: &str = "21600";

/// Build an `AND({field}='value', ...)` filter formula.
pub fn all_equal(conditions: &[(&str, &str)]) -> String {
    let clauses: Vec<String> = conditions
        .iter()
        .map(|(field, value)| format!("{{{}}}='{}'", field, escape_formula_string(value)))
        .collect();
    format!("AND({})", clauses.join(","))
}

fn escape_formula_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// One Airtable row.
#[derive(Debug, Clone, Deserialize)]
pub struct Record<T> {
    pub id: String,
    pub fields: T,
}

#[derive(Deserialize)]
struct ListResponse<T> {
    records: Vec<Record<T>>,
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Serialize)]
struct FieldsBody<'a, T: Serialize> {
    fields: &'a T,
}

/// Thin Airtable REST client.
#[derive(Clone)]
pub struct AirtableClient {
    http: reqwest::Client,
    api_url: String,
    base_id: String,
    pat: String,
}

impl AirtableClient {
    pub fn new(settings: &AirtableSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            base_id: settings.base_id.clone(),
            pat: settings.pat.clone(),
        }
    }

    fn table_url(&self, table_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.api_url,
            urlencoding::encode(&self.base_id),
            urlencoding::encode(table_id)
        )
    }

    /// List every record matching `formula`, following pagination.
    pub async fn list_records<T: DeserializeOwned>(
        &self,
        table_id: &str,
        formula: &str,
    ) -> Result<Vec<Record<T>>> {
        let url = self.table_url(table_id);
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut query = vec![("filterByFormula", formula.to_string())];
            if let Some(offset) = offset.take() {
                query.push(("offset", offset));
            }

            let response = self
                .http
                .get(&url)
                .bearer_auth(&self.pat)
                .query(&query)
                .send()
                .await
                .map_err(|e| AppError::transport(Platform::Airtable, e))?;

            let page: ListResponse<T> = Self::check_response_json(response).await?;
            records.extend(page.records);

            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(records)
    }

    pub async fn create_record<T: Serialize>(&self, table_id: &str, fields: &T) -> Result<()> {
        let response = self
            .http
            .post(self.table_url(table_id))
            .bearer_auth(&self.pat)
            .json(&FieldsBody { fields })
            .send()
            .await
            .map_err(|e| AppError::transport(Platform::Airtable, e))?;

        let _: serde_json::Value = Self::check_response_json(response).await?;
        Ok(())
    }

    /// Patch the given fields of one record, leaving the others untouched.
    pub async fn update_record<T: Serialize>(
        &self,
        table_id: &str,
        record_id: &str,
        fields: &T,
    ) -> Result<()> {
        let url = format!(
            "{}/{}",
            self.table_url(table_id),
            urlencoding::encode(record_id)
        );
        let response = self
            .http
            .patch(url)
            .bearer_auth(&self.pat)
            .json(&FieldsBody { fields })
            .send()
            .await
            .map_err(|e| AppError::transport(Platform::Airtable, e))?;

        let _: serde_json::Value = Self::check_response_json(response).await?;
        Ok(())
    }

    async fn check_response_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            return Err(AppError::from_response(Platform::Airtable, response).await);
        }

        response
            .json()
            .await
            .map_err(|e| AppError::MalformedRecord(format!("Airtable response: {}", e)))
    }
}

// ─── Row shapes ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct StravaAccountRow {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default, deserialize_with = "crate::models::id::deserialize")]
    expires_at: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    firstname: Option<String>,
    #[serde(default)]
    lastname: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmailRow {
    #[serde(default)]
    user_email: Option<String>,
}

#[derive(Serialize)]
struct StravaAccountFields<'a> {
    athlete_id: &'a str,
    user_email: &'a str,
    token_type: &'static str,
    access_token: &'a str,
    refresh_token: &'a str,
    expires_at: &'a str,
    expires_in: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    firstname: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lastname: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct RelationRow {
    #[serde(default)]
    notion_bot_id: String,
    #[serde(default)]
    database_id: Option<String>,
}

impl From<RelationRow> for DestinationBinding {
    fn from(row: RelationRow) -> Self {
        DestinationBinding {
            bot_id: row.notion_bot_id,
            collection_id: row.database_id.filter(|id| !id.is_empty()),
        }
    }
}

#[derive(Serialize)]
struct RelationFields<'a> {
    athlete_id: &'a str,
    notion_bot_id: &'a str,
    user_email: &'a str,
}

#[derive(Serialize)]
struct DatabaseIdFields<'a> {
    database_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct NotionRow {
    #[serde(default)]
    access_token: String,
}

#[derive(Serialize)]
struct NotionFields<'a> {
    bot_id: &'a str,
    access_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duplicated_template_id: Option<&'a str>,
    /// Stored as JSON text
    owner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    workspace_icon: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    workspace_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    workspace_name: Option<&'a str>,
}

// ─── Store ───────────────────────────────────────────────────

/// Credential store backed by an Airtable base.
#[derive(Clone)]
pub struct AirtableStore {
    client: AirtableClient,
    strava_table_id: String,
    relation_table_id: String,
    notion_table_id: String,
}

impl AirtableStore {
    pub fn new(settings: &AirtableSettings) -> Self {
        Self {
            client: AirtableClient::new(settings),
            strava_table_id: settings.strava_table_id.clone(),
            relation_table_id: settings.relation_table_id.clone(),
            notion_table_id: settings.notion_table_id.clone(),
        }
    }

    async fn single<T: DeserializeOwned>(
        &self,
        table_id: &str,
        key: &[(&str, &str)],
    ) -> Result<Record<T>> {
        let rows = self.client.list_records(table_id, &all_equal(key)).await?;
        single_row(rows, || describe(table_id, key))
    }

    /// Update the row matching `key` if there is one, else create it.
    async fn upsert<F: Serialize + Sync>(
        &self,
        table_id: &str,
        key: &[(&str, &str)],
        fields: &F,
    ) -> Result<()> {
        let rows: Vec<Record<serde_json::Value>> =
            self.client.list_records(table_id, &all_equal(key)).await?;

        match rows.as_slice() {
            [] => self.client.create_record(table_id, fields).await,
            [row] => self.client.update_record(table_id, &row.id, fields).await,
            _ => Err(AppError::AmbiguousRecord {
                what: describe(table_id, key),
                count: rows.len(),
            }),
        }
    }
}

fn describe(table_id: &str, key: &[(&str, &str)]) -> String {
    let pairs: Vec<String> = key.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    format!("table {} where {}", table_id, pairs.join(", "))
}

#[async_trait]
impl CredentialStore for AirtableStore {
    async fn get_linked_accounts(&self, athlete_id: &str) -> Result<Vec<String>> {
        let rows: Vec<Record<EmailRow>> = self
            .client
            .list_records(
                &self.strava_table_id,
                &all_equal(&[(fields::ATHLETE_ID, athlete_id)]),
            )
            .await?;

        Ok(dedup_preserving_order(
            rows.into_iter().filter_map(|r| r.fields.user_email),
        ))
    }

    async fn get_source_credentials(
        &self,
        athlete_id: &str,
        user_email: &str,
    ) -> Result<SourceCredentials> {
        let row: Record<StravaAccountRow> = self
            .single(
                &self.strava_table_id,
                &[(fields::ATHLETE_ID, athlete_id), (fields::USER_EMAIL, user_email)],
            )
            .await?;

        Ok(SourceCredentials {
            access_token: row.fields.access_token,
            refresh_token: row.fields.refresh_token,
            expires_at: row.fields.expires_at,
        })
    }

    async fn update_source_credentials(
        &self,
        athlete_id: &str,
        user_email: &str,
        token: &SourceCredentials,
    ) -> Result<()> {
        let row: Record<serde_json::Value> = self
            .single(
                &self.strava_table_id,
                &[(fields::ATHLETE_ID, athlete_id), (fields::USER_EMAIL, user_email)],
            )
            .await?;

        self.client
            .update_record(&self.strava_table_id, &row.id, token)
            .await
    }

    async fn get_username(&self, athlete_id: &str, user_email: &str) -> Result<String> {
        let row: Record<StravaAccountRow> = self
            .single(
                &self.strava_table_id,
                &[(fields::ATHLETE_ID, athlete_id), (fields::USER_EMAIL, user_email)],
            )
            .await?;

        Ok(display_name(
            row.fields.username.as_deref(),
            row.fields.firstname.as_deref(),
            row.fields.lastname.as_deref(),
        ))
    }

    async fn list_destination_bindings(
        &self,
        athlete_id: &str,
        user_email: &str,
    ) -> Result<Vec<DestinationBinding>> {
        let rows: Vec<Record<RelationRow>> = self
            .client
            .list_records(
                &self.relation_table_id,
                &all_equal(&[(fields::ATHLETE_ID, athlete_id), (fields::USER_EMAIL, user_email)]),
            )
            .await?;

        Ok(rows.into_iter().map(|r| r.fields.into()).collect())
    }

    async fn get_destination_binding(
        &self,
        athlete_id: &str,
        user_email: &str,
        bot_id: &str,
    ) -> Result<DestinationBinding> {
        let row: Record<RelationRow> = self
            .single(
                &self.relation_table_id,
                &[
                    (fields::USER_EMAIL, user_email),
                    (fields::ATHLETE_ID, athlete_id),
                    (fields::NOTION_BOT_ID, bot_id),
                ],
            )
            .await?;

        Ok(row.fields.into())
    }

    async fn get_destination_access_token(&self, bot_id: &str) -> Result<String> {
        let row: Record<NotionRow> = self
            .single(&self.notion_table_id, &[(fields::BOT_ID, bot_id)])
            .await?;
        Ok(row.fields.access_token)
    }

    async fn upsert_source_account(
        &self,
        credentials: &StravaCredentials,
        user_email: &str,
        profile: &AthleteProfile,
    ) -> Result<()> {
        let row = StravaAccountFields {
            athlete_id: &credentials.athlete,
            user_email,
            token_type: "Bearer",
            access_token: &credentials.access_token,
            refresh_token: &credentials.refresh_token,
            expires_at: &credentials.expires_at,
            expires_in: STRAVA_TOKEN_LIFETIME,
            username: profile.username.as_deref(),
            firstname: profile.firstname.as_deref(),
            lastname: profile.lastname.as_deref(),
        };

        self.upsert(
            &self.strava_table_id,
            &[
                (fields::ATHLETE_ID, credentials.athlete.as_str()),
                (fields::USER_EMAIL, user_email),
            ],
            &row,
        )
        .await
    }

    async fn upsert_destination_binding(
        &self,
        credentials: &NotionCredentials,
        user_email: &str,
        athlete_id: &str,
    ) -> Result<()> {
        let owner = serde_json::to_string(&credentials.owner)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("owner is not serializable: {}", e)))?;

        let integration = NotionFields {
            bot_id: &credentials.bot_id,
            access_token: &credentials.access_token,
            duplicated_template_id: credentials.duplicated_template_id.as_deref(),
            owner,
            workspace_icon: credentials.workspace_icon.as_deref(),
            workspace_id: credentials.workspace_id.as_deref(),
            workspace_name: credentials.workspace_name.as_deref(),
        };
        self.upsert(
            &self.notion_table_id,
            &[(fields::BOT_ID, credentials.bot_id.as_str())],
            &integration,
        )
        .await?;

        let relation = RelationFields {
            athlete_id,
            notion_bot_id: &credentials.bot_id,
            user_email,
        };
        self.upsert(
            &self.relation_table_id,
            &[
                (fields::USER_EMAIL, user_email),
                (fields::ATHLETE_ID, athlete_id),
                (fields::NOTION_BOT_ID, credentials.bot_id.as_str()),
            ],
            &relation,
        )
        .await
    }

    async fn update_collection_id(
        &self,
        user_email: &str,
        athlete_id: &str,
        bot_id: &str,
        collection_id: &str,
    ) -> Result<()> {
        let row: Record<serde_json::Value> = self
            .single(
                &self.relation_table_id,
                &[
                    (fields::USER_EMAIL, user_email),
                    (fields::ATHLETE_ID, athlete_id),
                    (fields::NOTION_BOT_ID, bot_id),
                ],
            )
            .await?;

        self.client
            .update_record(
                &self.relation_table_id,
                &row.id,
                &DatabaseIdFields {
                    database_id: collection_id,
                },
            )
            .await
    }
}
