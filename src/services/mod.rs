// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod actions;
pub mod batch;
pub mod mapper;
pub mod notion;
pub mod onboarding;
pub mod strava;
pub mod tasks;

pub use actions::{dispatch, Action, ActionContext, ActionKind, RunOutcome};
pub use batch::BatchController;
pub use notion::NotionClient;
pub use strava::StravaClient;
pub use tasks::{EventQueue, TasksService};
