// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Inbound webhook events and the queue batch envelope around them.

use serde::{Deserialize, Serialize};

/// Strava webhook event payload.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// "create", "update", "delete"
    pub aspect_type: String,
    /// "activity" or "athlete"
    pub object_type: String,
    /// Strava athlete id
    #[serde(deserialize_with = "crate::models::id::deserialize")]
    pub owner_id: String,
    #[serde(deserialize_with = "crate::models::id::deserialize")]
    pub object_id: String,
}

impl WebhookEvent {
    /// Dispatch key, e.g. `create.activity`.
    pub fn action_key(&self) -> String {
        format!("{}.{}", self.aspect_type, self.object_type)
    }
}

/// A batch of queued messages, in the shape the queue delivers them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueBatch {
    #[serde(rename = "Records")]
    pub records: Vec<QueueMessage>,
}

/// One queued message. `body` is the raw webhook JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueMessage {
    #[serde(rename = "messageId")]
    pub message_id: String,
    pub body: String,
}

/// Items the queue must redeliver. An absent id means that item succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(rename = "batchItemFailures")]
    pub batch_item_failures: Vec<BatchItemFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItemFailure {
    #[serde(rename = "itemIdentifier")]
    pub item_identifier: String,
}
