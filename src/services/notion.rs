// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notion API client for activity pages and databases.
//!
//! One client per integration access token. Non-success responses become
//! `AppError::Upstream` carrying the raw body; nothing is retried here.

use crate::config::{NotionSettings, NOTION_API_VERSION};
use crate::error::{AppError, Platform, Result};
use crate::models::NotionCredentials;
use crate::services::mapper::{activity_filter, PropertyMap};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A page or database as returned by Notion; only the id is used.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub object: String,
}

/// Paginated list envelope shared by query and search.
#[derive(Debug, Deserialize)]
struct PageList {
    results: Vec<Page>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Serialize)]
struct QueryBody<'a> {
    filter: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_cursor: Option<&'a str>,
}

/// Notion API client.
pub struct NotionClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl NotionClient {
    pub fn new(settings: &NotionSettings, access_token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: settings.api_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.access_token)
            .header("Notion-Version", NOTION_API_VERSION)
    }

    async fn send<T: for<'de> Deserialize<'de>>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| AppError::transport(Platform::Notion, e))?;
        check_response_json(response).await
    }

    /// Create a page inside a database.
    pub async fn create_page(&self, database_id: &str, properties: &PropertyMap) -> Result<Page> {
        let body = json!({
            "parent": {"database_id": database_id},
            "properties": properties,
        });
        self.send(self.request(reqwest::Method::POST, "/pages").json(&body))
            .await
    }

    /// Query a database, following `next_cursor` until every page is read.
    pub async fn query_database(&self, database_id: &str, filter: &Value) -> Result<Vec<Page>> {
        let path = format!("/databases/{}/query", database_id);
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let body = QueryBody {
                filter,
                start_cursor: cursor.as_deref(),
            };
            let list: PageList = self
                .send(self.request(reqwest::Method::POST, &path).json(&body))
                .await?;

            pages.extend(list.results);
            match list.next_cursor {
                Some(next) if list.has_more => cursor = Some(next),
                _ => break,
            }
        }

        Ok(pages)
    }

    /// Overwrite the given properties of an existing page.
    pub async fn update_page_properties(
        &self,
        page_id: &str,
        properties: &PropertyMap,
    ) -> Result<Page> {
        let body = json!({ "properties": properties });
        self.send(
            self.request(reqwest::Method::PATCH, &format!("/pages/{}", page_id))
                .json(&body),
        )
        .await
    }

    /// Search pages and databases shared with the integration.
    pub async fn search(&self, filter: &Value) -> Result<Vec<Page>> {
        let body = json!({ "filter": filter });
        let list: PageList = self
            .send(self.request(reqwest::Method::POST, "/search").json(&body))
            .await?;
        Ok(list.results)
    }

    /// Create a database under a page. Returns the new database id.
    pub async fn create_database(
        &self,
        parent_page_id: &str,
        title: &str,
        schema: &Value,
    ) -> Result<String> {
        let body = json!({
            "parent": {"type": "page_id", "page_id": parent_page_id},
            "title": [{"type": "text", "text": {"content": title}}],
            "properties": schema,
        });
        let database: Page = self
            .send(self.request(reqwest::Method::POST, "/databases").json(&body))
            .await?;
        Ok(database.id)
    }

    /// Ids of the pages whose "Activity ID" equals `activity_id`.
    pub async fn find_activity_pages(
        &self,
        database_id: &str,
        activity_id: &str,
    ) -> Result<Vec<String>> {
        let pages = self
            .query_database(database_id, &activity_filter(activity_id))
            .await?;
        Ok(pages.into_iter().map(|p| p.id).collect())
    }
}

/// Exchange an OAuth code for an integration's credentials.
pub async fn exchange_token(settings: &NotionSettings, code: &str) -> Result<NotionCredentials> {
    let basic = base64::engine::general_purpose::STANDARD
        .encode(format!("{}:{}", settings.client_id, settings.client_secret));

    let response = reqwest::Client::new()
        .post(format!("{}/oauth/token", settings.api_url.trim_end_matches('/')))
        .header(reqwest::header::AUTHORIZATION, format!("Basic {}", basic))
        .json(&json!({
            "grant_type": "authorization_code",
            "code": code,
            "redirect_uri": settings.redirect_uri,
        }))
        .send()
        .await
        .map_err(|e| AppError::transport(Platform::Notion, e))?;

    check_response_json(response).await
}

async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T> {
    if !response.status().is_success() {
        return Err(AppError::from_response(Platform::Notion, response).await);
    }

    response.json().await.map_err(|e| AppError::Upstream {
        platform: Platform::Notion,
        status: 200,
        body: format!("JSON parse error: {}", e),
    })
}
