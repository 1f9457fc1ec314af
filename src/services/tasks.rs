// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cloud Tasks service for async event processing.
//!
//! Each Strava webhook body is wrapped in a one-record batch and delivered
//! to `/tasks/process-events`, where the batch controller runs it.
//!
//! Uses the official google-cloud-tasks-v2 SDK.

use crate::error::AppError;
use crate::error::Result;
use crate::models::{QueueBatch, QueueMessage};
use async_trait::async_trait;

/// Endpoint the queue delivers batches to.
pub const PROCESS_EVENTS_PATH: &str = "/tasks/process-events";

/// Wrap one raw webhook body in a batch with a fresh message id.
pub fn event_batch(raw_body: &str) -> QueueBatch {
    QueueBatch {
        records: vec![QueueMessage {
            message_id: uuid::Uuid::new_v4().to_string(),
            body: raw_body.to_string(),
        }],
    }
}

/// Where webhook bodies go to be processed later.
#[async_trait]
pub trait EventQueue: Send + Sync {
    /// Queue a raw webhook body. Returns the message id.
    async fn queue_events(&self, service_url: &str, raw_body: &str) -> Result<String>;
}

/// Cloud Tasks client wrapper.
pub struct TasksService {
    project_id: String,
    location: String,
    queue_name: String,
}

impl TasksService {
    pub fn new(project_id: &str, region: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            location: region.to_string(),
            queue_name: crate::config::EVENT_QUEUE_NAME.to_string(),
        }
    }

    fn queue_path(&self) -> String {
        format!(
            "projects/{}/locations/{}/queues/{}",
            self.project_id, self.location, self.queue_name
        )
    }

    /// Create one HTTP task posting `payload` to `service_url + endpoint`.
    async fn queue_task(
        &self,
        service_url: &str,
        endpoint: &str,
        payload: &QueueBatch,
    ) -> Result<()> {
        use google_cloud_tasks_v2::client::CloudTasks;
        use google_cloud_tasks_v2::model::{HttpRequest, OidcToken, Task};

        let client = CloudTasks::builder()
            .build()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Cloud Tasks client error: {}", e)))?;

        let body = serde_json::to_vec(payload)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JSON error: {}", e)))?;

        let http_request = HttpRequest::default()
            .set_url(format!(
                "{}{}",
                service_url.trim_end_matches('/'),
                endpoint
            ))
            .set_http_method("POST")
            .set_body(axum::body::Bytes::from(body))
            .set_headers(std::collections::HashMap::from([(
                "Content-Type".to_string(),
                "application/json".to_string(),
            )]))
            .set_oidc_token(
                OidcToken::default()
                    .set_service_account_email(format!(
                        "strava-notion-sync@{}.iam.gserviceaccount.com",
                        self.project_id
                    ))
                    .set_audience(service_url.to_string()),
            );

        let task = Task::default().set_http_request(http_request);

        let _response = client
            .create_task()
            .set_parent(self.queue_path())
            .set_task(task)
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Cloud Tasks create error: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl EventQueue for TasksService {
    async fn queue_events(&self, service_url: &str, raw_body: &str) -> Result<String> {
        let batch = event_batch(raw_body);
        let message_id = batch
            .records
            .first()
            .map(|r| r.message_id.clone())
            .unwrap_or_default();

        self.queue_task(service_url, PROCESS_EVENTS_PATH, &batch)
            .await?;

        tracing::info!(message_id = %message_id, "Queued Strava event");
        Ok(message_id)
    }
}
