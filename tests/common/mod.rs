// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared test scaffolding: an in-process stand-in for the Strava, Notion
//! and Airtable APIs, plus app builders wired to it.

use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, patch, post},
    Form, Json, Router,
};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use strava_notion_sync::config::Config;
use strava_notion_sync::db::memory::StoredAccount;
use strava_notion_sync::db::{CredentialStore, InMemoryStore};
use strava_notion_sync::error::Result as AppResult;
use strava_notion_sync::models::SourceCredentials;
use strava_notion_sync::routes::create_router;
use strava_notion_sync::services::EventQueue;
use strava_notion_sync::AppState;

/// Expiry handed out by the fake token endpoint (2100-01-01).
#[allow(dead_code)]
pub const FRESH_EXPIRES_AT: i64 = 4_102_444_800;

/// Items per page for paginated fake endpoints.
const PAGE_SIZE: usize = 2;

#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct MockPage {
    pub id: String,
    pub database_id: String,
    pub properties: Value,
}

#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct AirtableRow {
    pub id: String,
    pub fields: Map<String, Value>,
}

/// Everything the fake platforms know, and every call they received.
#[derive(Default)]
pub struct Upstream {
    calls: Mutex<Vec<String>>,
    next_id: AtomicUsize,
    pub activities: Mutex<HashMap<String, Value>>,
    pub athlete: Mutex<Value>,
    /// Bearer tokens presented to Strava data endpoints
    pub strava_bearers: Mutex<Vec<String>>,
    pub pages: Mutex<Vec<MockPage>>,
    /// Database ids whose page writes and queries answer 400
    pub failing_databases: Mutex<HashSet<String>>,
    pub shared_pages: Mutex<Vec<Value>>,
    pub created_databases: Mutex<Vec<Value>>,
    pub airtable: Mutex<HashMap<String, Vec<AirtableRow>>>,
}

#[allow(dead_code)]
impl Upstream {
    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Number of calls received by one fake endpoint, e.g. `"strava.token"`.
    pub fn count(&self, call: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == call)
            .count()
    }

    pub fn add_activity(&self, activity: Value) {
        let id = match &activity["id"] {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        self.activities.lock().unwrap().insert(id, activity);
    }

    pub fn fail_database(&self, database_id: &str) {
        self.failing_databases
            .lock()
            .unwrap()
            .insert(database_id.to_string());
    }

    pub fn pages_in(&self, database_id: &str) -> Vec<MockPage> {
        self.pages
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.database_id == database_id)
            .cloned()
            .collect()
    }

    pub fn airtable_rows(&self, table: &str) -> Vec<AirtableRow> {
        self.airtable
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn insert_airtable_row(&self, table: &str, fields: Value) -> String {
        let id = self.next_id("rec");
        let fields = fields.as_object().cloned().unwrap_or_default();
        self.airtable
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(AirtableRow {
                id: id.clone(),
                fields,
            });
        id
    }
}

/// A detailed Strava activity with every mapped field set.
#[allow(dead_code)]
pub fn activity_json(id: &str) -> Value {
    json!({
        "id": id,
        "name": "Morning Ride",
        "description": "Loop around the bay",
        "sport_type": "Ride",
        "calories": 870.2,
        "start_date": "2024-05-01T06:30:00Z",
        "average_speed": 7.5,
        "max_speed": 14.2,
        "total_elevation_gain": 512.0,
        "external_id": "garmin_push_123",
        "upload_id": 1465195720,
        "moving_time": 7200,
        "distance": 54000.5,
        "kudos_count": 3
    })
}

/// Page property "Activity ID" of a stored fake page.
#[allow(dead_code)]
pub fn activity_id_of(page: &MockPage) -> Option<String> {
    page.properties["Activity ID"]["rich_text"][0]["text"]["content"]
        .as_str()
        .map(str::to_string)
}

fn notion_error(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({
            "object": "error",
            "status": status.as_u16(),
            "code": "validation_error",
            "message": message
        })),
    )
}

// ─── Strava ──────────────────────────────────────────────────

async fn strava_token(
    State(upstream): State<Arc<Upstream>>,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    upstream.record("strava.token");

    match form.get("grant_type").map(String::as_str) {
        Some("refresh_token") => {
            let n = upstream.count("strava.token");
            (
                StatusCode::OK,
                Json(json!({
                    "token_type": "Bearer",
                    "access_token": format!("fresh-access-{}", n),
                    "refresh_token": format!("fresh-refresh-{}", n),
                    "expires_at": FRESH_EXPIRES_AT,
                    "expires_in": 21600
                })),
            )
        }
        Some("authorization_code") if form.get("code").map(String::as_str) != Some("bad") => (
            StatusCode::OK,
            Json(json!({
                "token_type": "Bearer",
                "access_token": "code-access",
                "refresh_token": "code-refresh",
                "expires_at": FRESH_EXPIRES_AT,
                "expires_in": 21600,
                "athlete": {"id": 134815, "username": "jdoe"}
            })),
        ),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "Bad Request", "errors": [{"code": "invalid"}]})),
        ),
    }
}

fn remember_bearer(upstream: &Upstream, headers: &HeaderMap) {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        upstream.strava_bearers.lock().unwrap().push(token.to_string());
    }
}

async fn strava_activity(
    State(upstream): State<Arc<Upstream>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    upstream.record("strava.activity");
    remember_bearer(&upstream, &headers);

    match upstream.activities.lock().unwrap().get(&id) {
        Some(activity) => (StatusCode::OK, Json(activity.clone())),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"message": "Record Not Found", "errors": []})),
        ),
    }
}

async fn strava_athlete(
    State(upstream): State<Arc<Upstream>>,
    headers: HeaderMap,
) -> Json<Value> {
    upstream.record("strava.athlete");
    remember_bearer(&upstream, &headers);
    Json(upstream.athlete.lock().unwrap().clone())
}

// ─── Notion ──────────────────────────────────────────────────

async fn notion_create_page(
    State(upstream): State<Arc<Upstream>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    upstream.record("notion.create_page");

    let database_id = body["parent"]["database_id"].as_str().unwrap_or_default();
    if upstream.failing_databases.lock().unwrap().contains(database_id) {
        return notion_error(StatusCode::BAD_REQUEST, "page creation refused");
    }

    let id = upstream.next_id("page");
    upstream.pages.lock().unwrap().push(MockPage {
        id: id.clone(),
        database_id: database_id.to_string(),
        properties: body["properties"].clone(),
    });
    (StatusCode::OK, Json(json!({"object": "page", "id": id})))
}

async fn notion_query(
    State(upstream): State<Arc<Upstream>>,
    Path(database_id): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    upstream.record("notion.query");

    if upstream.failing_databases.lock().unwrap().contains(&database_id) {
        return notion_error(StatusCode::BAD_REQUEST, "query refused");
    }

    let wanted = body["filter"]["rich_text"]["equals"].as_str().map(str::to_string);
    let matches: Vec<Value> = upstream
        .pages_in(&database_id)
        .iter()
        .filter(|p| wanted.is_none() || activity_id_of(p) == wanted)
        .map(|p| json!({"object": "page", "id": p.id}))
        .collect();

    let start: usize = body["start_cursor"]
        .as_str()
        .and_then(|c| c.parse().ok())
        .unwrap_or(0);
    let end = (start + PAGE_SIZE).min(matches.len());
    let has_more = end < matches.len();
    let results = matches[start.min(end)..end].to_vec();

    (
        StatusCode::OK,
        Json(json!({
            "object": "list",
            "results": results,
            "has_more": has_more,
            "next_cursor": if has_more { Value::String(end.to_string()) } else { Value::Null }
        })),
    )
}

async fn notion_update_page(
    State(upstream): State<Arc<Upstream>>,
    Path(page_id): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    upstream.record("notion.update_page");

    let mut pages = upstream.pages.lock().unwrap();
    match pages.iter_mut().find(|p| p.id == page_id) {
        Some(page) => {
            page.properties = body["properties"].clone();
            (StatusCode::OK, Json(json!({"object": "page", "id": page.id})))
        }
        None => notion_error(StatusCode::NOT_FOUND, "page not found"),
    }
}

async fn notion_search(
    State(upstream): State<Arc<Upstream>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    upstream.record("notion.search");
    let wanted = body["filter"]["value"].as_str().unwrap_or("page").to_string();
    let results: Vec<Value> = upstream
        .shared_pages
        .lock()
        .unwrap()
        .iter()
        .filter(|p| p["object"] == wanted.as_str())
        .cloned()
        .collect();
    Json(json!({"object": "list", "results": results, "has_more": false, "next_cursor": null}))
}

async fn notion_create_database(
    State(upstream): State<Arc<Upstream>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    upstream.record("notion.create_database");
    let id = upstream.next_id("db");
    let mut created = body.clone();
    created["id"] = Value::String(id.clone());
    upstream.created_databases.lock().unwrap().push(created);
    Json(json!({"object": "database", "id": id}))
}

async fn notion_oauth(
    State(upstream): State<Arc<Upstream>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    upstream.record("notion.oauth");

    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|h| h.starts_with("Basic "));
    if !authorized || body["code"] == "bad" {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_grant"})));
    }

    (
        StatusCode::OK,
        Json(json!({
            "access_token": "secret_workspace",
            "token_type": "bearer",
            "bot_id": "bot-new",
            "workspace_name": "Jane's Notion",
            "workspace_icon": null,
            "workspace_id": "ws-1",
            "owner": {"type": "user", "user": {"id": "u-1"}},
            "duplicated_template_id": null
        })),
    )
}

// ─── Airtable ────────────────────────────────────────────────

/// Parse `AND({field}='value',...)` as written by the store.
fn parse_formula(formula: &str) -> Vec<(String, String)> {
    let inner = formula
        .strip_prefix("AND(")
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or_default();
    let mut chars = inner.chars().peekable();
    let mut conditions = Vec::new();

    while chars.next() == Some('{') {
        let field: String = chars.by_ref().take_while(|c| *c != '}').collect();
        // ='
        chars.next();
        chars.next();
        let mut value = String::new();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        value.push(escaped);
                    }
                }
                '\'' => break,
                _ => value.push(c),
            }
        }
        conditions.push((field, value));
        if chars.peek() == Some(&',') {
            chars.next();
        }
    }
    conditions
}

fn field_equals(fields: &Map<String, Value>, field: &str, expected: &str) -> bool {
    match fields.get(field) {
        Some(Value::String(s)) => s == expected,
        Some(Value::Number(n)) => n.to_string() == expected,
        _ => false,
    }
}

async fn airtable_list(
    State(upstream): State<Arc<Upstream>>,
    Path((_base, table)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    upstream.record("airtable.list");

    let conditions = parse_formula(query.get("filterByFormula").map(String::as_str).unwrap_or(""));
    let rows: Vec<Value> = upstream
        .airtable_rows(&table)
        .into_iter()
        .filter(|row| conditions.iter().all(|(f, v)| field_equals(&row.fields, f, v)))
        .map(|row| {
            json!({"id": row.id, "createdTime": "2024-01-01T00:00:00.000Z", "fields": row.fields})
        })
        .collect();

    let start: usize = query.get("offset").and_then(|o| o.parse().ok()).unwrap_or(0);
    let end = (start + PAGE_SIZE).min(rows.len());
    let mut page = json!({"records": rows[start.min(end)..end].to_vec()});
    if end < rows.len() {
        page["offset"] = Value::String(end.to_string());
    }
    Json(page)
}

async fn airtable_create(
    State(upstream): State<Arc<Upstream>>,
    Path((_base, table)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Json<Value> {
    upstream.record("airtable.create");
    let id = upstream.insert_airtable_row(&table, body["fields"].clone());
    Json(json!({"id": id, "fields": body["fields"]}))
}

async fn airtable_update(
    State(upstream): State<Arc<Upstream>>,
    Path((_base, table, record_id)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    upstream.record("airtable.update");

    let mut tables = upstream.airtable.lock().unwrap();
    let row = tables
        .get_mut(&table)
        .and_then(|rows| rows.iter_mut().find(|r| r.id == record_id));
    match row {
        Some(row) => {
            if let Some(update) = body["fields"].as_object() {
                for (k, v) in update {
                    row.fields.insert(k.clone(), v.clone());
                }
            }
            (StatusCode::OK, Json(json!({"id": row.id, "fields": row.fields})))
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"type": "MODEL_ID_NOT_FOUND"}})),
        ),
    }
}

/// The fake platforms, listening on an ephemeral local port.
pub struct MockServer {
    pub addr: SocketAddr,
    pub upstream: Arc<Upstream>,
}

#[allow(dead_code)]
impl MockServer {
    pub async fn start() -> Self {
        let upstream = Arc::new(Upstream::default());
        let app = Router::new()
            .route("/oauth/token", post(strava_token))
            .route("/api/v3/activities/{id}", get(strava_activity))
            .route("/api/v3/athlete", get(strava_athlete))
            .route("/v1/pages", post(notion_create_page))
            .route("/v1/pages/{id}", patch(notion_update_page))
            .route("/v1/databases", post(notion_create_database))
            .route("/v1/databases/{id}/query", post(notion_query))
            .route("/v1/search", post(notion_search))
            .route("/v1/oauth/token", post(notion_oauth))
            .route("/v0/{base}/{table}", get(airtable_list).post(airtable_create))
            .route("/v0/{base}/{table}/{record}", patch(airtable_update))
            .with_state(upstream.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, upstream }
    }

    /// Test config with every platform pointed at this server.
    pub fn config(&self) -> Config {
        let base = format!("http://{}", self.addr);
        let mut config = Config::test_default();
        config.strava.api_url = format!("{}/api/v3", base);
        config.strava.oauth_url = format!("{}/oauth", base);
        config.notion.api_url = format!("{}/v1", base);
        config.airtable.api_url = format!("{}/v0", base);
        config
    }
}

/// Token that stays valid for the whole test run.
#[allow(dead_code)]
pub fn valid_token() -> SourceCredentials {
    SourceCredentials {
        access_token: "stored-access".to_string(),
        refresh_token: "stored-refresh".to_string(),
        expires_at: FRESH_EXPIRES_AT.to_string(),
    }
}

/// Token that expired long ago.
#[allow(dead_code)]
pub fn expired_token() -> SourceCredentials {
    SourceCredentials {
        access_token: "stale-access".to_string(),
        refresh_token: "stale-refresh".to_string(),
        expires_at: "1000".to_string(),
    }
}

#[allow(dead_code)]
pub fn seed_account(
    store: &InMemoryStore,
    athlete_id: &str,
    user_email: &str,
    token: SourceCredentials,
) {
    store
        .insert_account(StoredAccount {
            athlete_id: athlete_id.to_string(),
            user_email: user_email.to_string(),
            credentials: token,
            username: Some("jdoe".to_string()),
            firstname: Some("Jane".to_string()),
            lastname: Some("Doe".to_string()),
        })
        .unwrap();
}

/// Event queue that keeps what it was given.
#[derive(Default)]
pub struct RecordingQueue {
    pub bodies: Mutex<Vec<String>>,
}

#[async_trait]
impl EventQueue for RecordingQueue {
    async fn queue_events(&self, _service_url: &str, raw_body: &str) -> AppResult<String> {
        self.bodies.lock().unwrap().push(raw_body.to_string());
        Ok(uuid::Uuid::new_v4().to_string())
    }
}

/// Create a test app backed by `store`, with a recording event queue.
#[allow(dead_code)]
pub fn create_test_app(
    config: Config,
    store: Arc<dyn CredentialStore>,
) -> (axum::Router, Arc<AppState>, Arc<RecordingQueue>) {
    let queue = Arc::new(RecordingQueue::default());
    let state = Arc::new(AppState {
        config,
        store,
        event_queue: queue.clone(),
    });

    (create_router(state.clone()), state, queue)
}
