// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava-Notion Sync API Server
//!
//! Receives Strava webhook events and mirrors activities into the Notion
//! databases of every linked workspace.

use std::sync::Arc;
use strava_notion_sync::{
    config::Config,
    db::AirtableStore,
    services::TasksService,
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Strava-Notion sync API");

    // Credential store
    let store = Arc::new(AirtableStore::new(&config.airtable));
    tracing::info!(base_id = %config.airtable.base_id, "Airtable store initialized");

    // Initialize Cloud Tasks service
    let tasks_service = TasksService::new(&config.gcp_project_id, &config.gcp_region);
    tracing::info!(
        project = %config.gcp_project_id,
        "Cloud Tasks service initialized"
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        event_queue: Arc::new(tasks_service),
    });

    // Build router
    let app = strava_notion_sync::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("strava_notion_sync=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
