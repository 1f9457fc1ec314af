// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava activity as fetched for one reconciliation. Never persisted.

use serde::{Deserialize, Deserializer};

/// A field that may be absent (`None`), present but null (`Some(None)`), or
/// set (`Some(Some(v))`).
pub type Field<T> = Option<Option<T>>;

fn present<'de, D, T>(deserializer: D) -> Result<Field<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// The subset of Strava's DetailedActivity copied to the destination.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActivityRecord {
    /// Strava activity ID (immutable)
    #[serde(deserialize_with = "crate::models::id::deserialize")]
    pub id: String,
    #[serde(default, deserialize_with = "present")]
    pub name: Field<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Field<String>,
    /// Sport type (Ride, Run, Swim, etc.)
    #[serde(default, deserialize_with = "present")]
    pub sport_type: Field<String>,
    #[serde(default, deserialize_with = "present")]
    pub calories: Field<f64>,
    /// Start date/time (ISO 8601, UTC)
    #[serde(default, deserialize_with = "present")]
    pub start_date: Field<String>,
    /// Meters per second
    #[serde(default, deserialize_with = "present")]
    pub average_speed: Field<f64>,
    #[serde(default, deserialize_with = "present")]
    pub max_speed: Field<f64>,
    /// Meters
    #[serde(default, deserialize_with = "present")]
    pub total_elevation_gain: Field<f64>,
    #[serde(default, deserialize_with = "present")]
    pub external_id: Field<String>,
    #[serde(default, deserialize_with = "crate::models::id::deserialize_present")]
    pub upload_id: Field<String>,
    /// Seconds
    #[serde(default, deserialize_with = "present")]
    pub moving_time: Field<f64>,
    /// Meters
    #[serde(default, deserialize_with = "present")]
    pub distance: Field<f64>,
}
