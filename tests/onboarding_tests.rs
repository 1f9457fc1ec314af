// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Linking Strava accounts and provisioning Notion databases.

mod common;

use common::{MockServer, FRESH_EXPIRES_AT};
use serde_json::json;
use strava_notion_sync::db::{CredentialStore, InMemoryStore};
use strava_notion_sync::error::AppError;
use strava_notion_sync::models::{NotionCredentials, StravaCredentials};
use strava_notion_sync::services::mapper::{database_schema, DATABASE_TITLE};
use strava_notion_sync::services::onboarding::{link_notion_workspace, link_strava_account};

fn strava_credentials(expires_at: &str) -> StravaCredentials {
    StravaCredentials {
        access_token: "submitted-access".to_string(),
        refresh_token: "submitted-refresh".to_string(),
        expires_at: expires_at.to_string(),
        athlete: "134815".to_string(),
    }
}

fn notion_credentials(bot_id: &str) -> NotionCredentials {
    NotionCredentials {
        access_token: format!("secret_{}", bot_id),
        bot_id: bot_id.to_string(),
        duplicated_template_id: None,
        owner: json!({"type": "user"}),
        workspace_icon: None,
        workspace_id: Some("ws-1".to_string()),
        workspace_name: Some("Jane's Notion".to_string()),
    }
}

fn share_page(server: &MockServer, id: &str) {
    server
        .upstream
        .shared_pages
        .lock()
        .unwrap()
        .push(json!({"object": "page", "id": id}));
}

#[tokio::test]
async fn strava_account_is_stored_with_profile() {
    let server = MockServer::start().await;
    *server.upstream.athlete.lock().unwrap() =
        json!({"id": 134815, "username": null, "firstname": "Jane", "lastname": "Doe"});
    let store = InMemoryStore::new();

    link_strava_account(
        &store,
        &server.config().strava,
        &strava_credentials(&FRESH_EXPIRES_AT.to_string()),
        "jane@example.com",
    )
    .await
    .unwrap();

    assert_eq!(
        store.get_linked_accounts("134815").await.unwrap(),
        vec!["jane@example.com".to_string()]
    );
    assert_eq!(
        store.get_username("134815", "jane@example.com").await.unwrap(),
        "Jane Doe"
    );
    let stored = store
        .get_source_credentials("134815", "jane@example.com")
        .await
        .unwrap();
    assert_eq!(stored.access_token, "submitted-access");
}

#[tokio::test]
async fn relinking_replaces_the_account_row() {
    let server = MockServer::start().await;
    *server.upstream.athlete.lock().unwrap() = json!({"id": 134815, "username": "jdoe"});
    let store = InMemoryStore::new();
    let settings = server.config().strava;

    for _ in 0..2 {
        link_strava_account(
            &store,
            &settings,
            &strava_credentials(&FRESH_EXPIRES_AT.to_string()),
            "jane@example.com",
        )
        .await
        .unwrap();
    }

    // A duplicate row would make this lookup ambiguous
    assert!(store
        .get_source_credentials("134815", "jane@example.com")
        .await
        .is_ok());
}

#[tokio::test]
async fn expired_submitted_token_is_stored_refreshed() {
    let server = MockServer::start().await;
    *server.upstream.athlete.lock().unwrap() = json!({"id": 134815, "username": "jdoe"});
    let store = InMemoryStore::new();

    link_strava_account(
        &store,
        &server.config().strava,
        &strava_credentials("1000"),
        "jane@example.com",
    )
    .await
    .unwrap();

    assert_eq!(server.upstream.count("strava.token"), 1);
    let stored = store
        .get_source_credentials("134815", "jane@example.com")
        .await
        .unwrap();
    assert_eq!(stored.access_token, "fresh-access-1");
    assert_eq!(stored.expires_at, FRESH_EXPIRES_AT.to_string());
}

#[tokio::test]
async fn first_link_creates_database_under_shared_page() {
    let server = MockServer::start().await;
    share_page(&server, "parent-page");
    share_page(&server, "other-page");
    let store = InMemoryStore::new();

    let database_id = link_notion_workspace(
        &store,
        &server.config().notion,
        &notion_credentials("bot-1"),
        "jane@example.com",
        "134815",
    )
    .await
    .unwrap();

    let created = server.upstream.created_databases.lock().unwrap().clone();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0]["id"], database_id.as_str());
    assert_eq!(created[0]["parent"]["page_id"], "parent-page");
    assert_eq!(created[0]["title"][0]["text"]["content"], DATABASE_TITLE);
    assert_eq!(created[0]["properties"], database_schema());

    let binding = store
        .get_destination_binding("134815", "jane@example.com", "bot-1")
        .await
        .unwrap();
    assert_eq!(binding.collection_id, Some(database_id));
    assert_eq!(
        store.get_destination_access_token("bot-1").await.unwrap(),
        "secret_bot-1"
    );
}

#[tokio::test]
async fn provisioned_workspace_is_not_recreated() {
    let server = MockServer::start().await;
    share_page(&server, "parent-page");
    let store = InMemoryStore::new();
    let settings = server.config().notion;

    let first = link_notion_workspace(
        &store,
        &settings,
        &notion_credentials("bot-1"),
        "jane@example.com",
        "134815",
    )
    .await
    .unwrap();
    let second = link_notion_workspace(
        &store,
        &settings,
        &notion_credentials("bot-1"),
        "jane@example.com",
        "134815",
    )
    .await
    .unwrap();

    assert_eq!(first, second);
    assert_eq!(server.upstream.count("notion.create_database"), 1);
    assert_eq!(
        store
            .list_destination_bindings("134815", "jane@example.com")
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn workspace_without_shared_page_is_rejected() {
    let server = MockServer::start().await;
    let store = InMemoryStore::new();

    let err = link_notion_workspace(
        &store,
        &server.config().notion,
        &notion_credentials("bot-1"),
        "jane@example.com",
        "134815",
    )
    .await
    .unwrap_err();

    assert!(
        matches!(err, AppError::NoSharedDestination { ref bot_id } if bot_id == "bot-1"),
        "got {:?}",
        err
    );
    assert_eq!(server.upstream.count("notion.create_database"), 0);
}
