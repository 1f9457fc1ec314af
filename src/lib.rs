// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava-Notion sync: relay Strava activities into Notion databases
//!
//! This crate provides the backend that receives Strava webhook events,
//! queues them, and creates or updates one Notion page per activity in
//! every workspace the athlete has linked. Linked accounts and OAuth
//! tokens are kept in Airtable.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::CredentialStore;
use services::EventQueue;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn CredentialStore>,
    pub event_queue: Arc<dyn EventQueue>,
}
