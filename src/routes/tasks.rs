// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Task handler routes for Cloud Tasks callbacks.
//!
//! These endpoints are called by Cloud Tasks, not directly by users, and
//! sit behind the queue header check.

use crate::middleware::require_tasks_queue;
use crate::models::{BatchResponse, QueueBatch};
use crate::services::BatchController;
use crate::AppState;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    middleware,
    routing::post,
    Router,
};
use std::sync::Arc;

/// Task handler routes (called by Cloud Tasks).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tasks/process-events", post(process_events))
        .route_layer(middleware::from_fn(require_tasks_queue))
}

/// Run a batch of queued events.
///
/// Answers 500 when any item failed so the queue delivers the batch again;
/// the body lists which items those were.
async fn process_events(
    State(state): State<Arc<AppState>>,
    Json(batch): Json<QueueBatch>,
) -> (StatusCode, Json<BatchResponse>) {
    tracing::info!(records = batch.records.len(), "Processing event batch");

    let controller = BatchController::new(
        state.store.clone(),
        state.config.strava.clone(),
        state.config.notion.clone(),
    );
    let response = controller.process_batch(&batch).await;

    let status = if response.batch_item_failures.is_empty() {
        StatusCode::OK
    } else {
        tracing::warn!(
            failed = response.batch_item_failures.len(),
            "Event batch had failures"
        );
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (status, Json(response))
}
