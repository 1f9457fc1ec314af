// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cloud Tasks origin check for `/tasks/*` routes.
//!
//! Cloud Run strips `x-cloudtasks-*` headers from external requests, so a
//! queue header naming our queue means the request came from Cloud Tasks.

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};

/// Header Cloud Tasks sets to the name of the delivering queue.
pub const QUEUE_NAME_HEADER: &str = "x-cloudtasks-queuename";

/// Reject requests that were not delivered by the event queue.
pub async fn require_tasks_queue(request: Request, next: Next) -> Result<Response, StatusCode> {
    let queue_name_header = request.headers().get(QUEUE_NAME_HEADER);
    let is_valid_queue = queue_name_header
        .and_then(|h| h.to_str().ok())
        .map(|name| name == crate::config::EVENT_QUEUE_NAME)
        .unwrap_or(false);

    if !is_valid_queue {
        tracing::warn!(
            header = ?queue_name_header,
            "Blocked tasks request with invalid queue header"
        );
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(request).await)
}
