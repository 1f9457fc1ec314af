// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Loaded once at startup. Platform base URLs can be overridden so the
//! clients can be pointed at a local emulator.

use std::env;

/// Cloud Tasks queue that delivers Strava events to `/tasks/process-events`.
pub const EVENT_QUEUE_NAME: &str = "strava-events";

const DEFAULT_STRAVA_API_URL: &str = "https://www.strava.com/api/v3";
const DEFAULT_STRAVA_OAUTH_URL: &str = "https://www.strava.com/oauth";
const DEFAULT_NOTION_API_URL: &str = "https://api.notion.com/v1";
const DEFAULT_AIRTABLE_API_URL: &str = "https://api.airtable.com/v0";

/// Notion API version sent with every request.
pub const NOTION_API_VERSION: &str = "2022-06-28";

/// Strava application credentials and endpoints.
#[derive(Debug, Clone)]
pub struct StravaSettings {
    pub client_id: String,
    pub client_secret: String,
    pub api_url: String,
    pub oauth_url: String,
}

/// Notion public integration credentials and endpoints.
#[derive(Debug, Clone)]
pub struct NotionSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub api_url: String,
}

/// Airtable base holding linked accounts and tokens.
#[derive(Debug, Clone)]
pub struct AirtableSettings {
    /// Personal access token
    pub pat: String,
    pub base_id: String,
    pub api_url: String,
    pub strava_table_id: String,
    pub relation_table_id: String,
    pub notion_table_id: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub strava: StravaSettings,
    pub notion: NotionSettings,
    pub airtable: AirtableSettings,
    /// Token Strava echoes back during the subscription handshake
    pub webhook_verify_token: String,
    /// Public URL of this service (Cloud Tasks target)
    pub api_url: String,
    pub gcp_project_id: String,
    pub gcp_region: String,
    /// Server port
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            strava: StravaSettings {
                client_id: required("STRAVA_CLIENT_ID")?,
                client_secret: required("STRAVA_CLIENT_SECRET")?,
                api_url: optional("STRAVA_API_URL", DEFAULT_STRAVA_API_URL),
                oauth_url: optional("STRAVA_OAUTH_URL", DEFAULT_STRAVA_OAUTH_URL),
            },
            notion: NotionSettings {
                client_id: required("NOTION_CLIENT_ID")?,
                client_secret: required("NOTION_CLIENT_SECRET")?,
                redirect_uri: required("NOTION_REDIRECT_URI")?,
                api_url: optional("NOTION_API_URL", DEFAULT_NOTION_API_URL),
            },
            airtable: AirtableSettings {
                pat: required("AIRTABLE_PAT")?,
                base_id: required("AIRTABLE_BASE_ID")?,
                api_url: optional("AIRTABLE_API_URL", DEFAULT_AIRTABLE_API_URL),
                strava_table_id: required("AIRTABLE_TABLE_STRAVA_ID")?,
                relation_table_id: required("AIRTABLE_TABLE_REL_STRAVA_NOTION_ID")?,
                notion_table_id: required("AIRTABLE_TABLE_NOTION")?,
            },
            webhook_verify_token: required("VERIFY_TOKEN")?,
            api_url: optional("API_URL", "http://localhost:8080"),
            gcp_project_id: optional("GCP_PROJECT_ID", "local-dev"),
            gcp_region: optional("GCP_REGION", "us-west1"),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
        })
    }

    /// Deterministic config for tests. Platform URLs point nowhere useful
    /// until a test overrides them.
    pub fn test_default() -> Self {
        Self {
            strava: StravaSettings {
                client_id: "test_client_id".to_string(),
                client_secret: "test_secret".to_string(),
                api_url: "http://127.0.0.1:9/api/v3".to_string(),
                oauth_url: "http://127.0.0.1:9/oauth".to_string(),
            },
            notion: NotionSettings {
                client_id: "test_notion_id".to_string(),
                client_secret: "test_notion_secret".to_string(),
                redirect_uri: "http://localhost:5173/notion".to_string(),
                api_url: "http://127.0.0.1:9/v1".to_string(),
            },
            airtable: AirtableSettings {
                pat: "test_pat".to_string(),
                base_id: "appTest".to_string(),
                api_url: "http://127.0.0.1:9/v0".to_string(),
                strava_table_id: "tblStrava".to_string(),
                relation_table_id: "tblRel".to_string(),
                notion_table_id: "tblNotion".to_string(),
            },
            webhook_verify_token: "test_verify_token".to_string(),
            api_url: "http://localhost:8080".to_string(),
            gcp_project_id: "test-project".to_string(),
            gcp_region: "us-west1".to_string(),
            port: 8080,
        }
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn optional(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
