// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod account;
pub mod activity;
pub mod event;
pub mod id;

pub use account::{
    AthleteProfile, DestinationBinding, NotionCredentials, SourceCredentials, StravaCredentials,
};
pub use activity::ActivityRecord;
pub use event::{BatchItemFailure, BatchResponse, QueueBatch, QueueMessage, WebhookEvent};
