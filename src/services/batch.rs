// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Batch controller for queued Strava events.
//!
//! Items run one after another. An item fails (and is listed for
//! redelivery) when its body cannot be parsed, its action is not handled,
//! or an error escapes the action's `run`. Failures reported inside the
//! outcome message do not fail the item.

use crate::config::{NotionSettings, StravaSettings};
use crate::db::CredentialStore;
use crate::error::{AppError, Result};
use crate::models::{BatchItemFailure, BatchResponse, QueueBatch, QueueMessage, WebhookEvent};
use crate::services::actions::{dispatch, ActionContext, RunOutcome};
use std::sync::Arc;

/// Shared dependencies for every item in a batch.
#[derive(Clone)]
pub struct BatchController {
    store: Arc<dyn CredentialStore>,
    strava: StravaSettings,
    notion: NotionSettings,
}

impl BatchController {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        strava: StravaSettings,
        notion: NotionSettings,
    ) -> Self {
        Self {
            store,
            strava,
            notion,
        }
    }

    /// Process every record and list the ones that must be retried.
    pub async fn process_batch(&self, batch: &QueueBatch) -> BatchResponse {
        let mut failures = Vec::new();

        for record in &batch.records {
            tracing::info!(message_id = %record.message_id, "Processing message");

            match self.process_message(record).await {
                Ok(outcome) => {
                    tracing::info!(
                        message_id = %record.message_id,
                        code = outcome.code,
                        message = %outcome.message,
                        "Message processed"
                    );
                }
                Err(AppError::UnrecognizedAction(key)) => {
                    tracing::warn!(
                        message_id = %record.message_id,
                        action = %key,
                        "Action not implemented"
                    );
                    failures.push(BatchItemFailure {
                        item_identifier: record.message_id.clone(),
                    });
                }
                Err(e) => {
                    tracing::error!(
                        message_id = %record.message_id,
                        error = %e,
                        "Exception while processing message"
                    );
                    failures.push(BatchItemFailure {
                        item_identifier: record.message_id.clone(),
                    });
                }
            }
        }

        BatchResponse {
            batch_item_failures: failures,
        }
    }

    async fn process_message(&self, record: &QueueMessage) -> Result<RunOutcome> {
        let event: WebhookEvent = serde_json::from_str(&record.body)
            .map_err(|e| AppError::MalformedRecord(format!("event body: {}", e)))?;

        let action = dispatch(
            &event.action_key(),
            ActionContext {
                owner_id: event.owner_id,
                object_id: event.object_id,
                store: self.store.clone(),
                strava: self.strava.clone(),
                notion: self.notion.clone(),
            },
        )?;

        action.run().await
    }
}
