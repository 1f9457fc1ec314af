// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava activity to Notion page properties.
//!
//! Properties are built as typed values and serialized by serde, so text
//! containing quotes, braces or newlines needs no escaping. Keys live in a
//! `BTreeMap`, which makes the serialized document deterministic.

use crate::error::{AppError, Result};
use crate::models::activity::Field;
use crate::models::ActivityRecord;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Page property matched when looking for an activity's existing pages.
pub const ACTIVITY_ID_PROPERTY: &str = "Activity ID";

/// Title of the database created for a new workspace.
pub const DATABASE_TITLE: &str = "Strava Activities";

/// Notion page properties keyed by property name.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// One Notion page property value, in the API's externally tagged shape,
/// e.g. `{"number": 12.5}` or `{"select": {"name": "Ride"}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    Title(Vec<RichText>),
    RichText(Vec<RichText>),
    Select(Option<SelectOption>),
    Number(Option<f64>),
    Date(Option<DateValue>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RichText {
    pub text: TextContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextContent {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateValue {
    pub start: String,
}

impl PropertyValue {
    fn text(content: impl Into<String>) -> Vec<RichText> {
        vec![RichText {
            text: TextContent {
                content: content.into(),
            },
        }]
    }

    pub fn title(content: impl Into<String>) -> Self {
        PropertyValue::Title(Self::text(content))
    }

    pub fn rich_text(content: impl Into<String>) -> Self {
        PropertyValue::RichText(Self::text(content))
    }
}

/// Unwrap a field that must be present. A null value is allowed.
fn required<'a, T>(
    activity: &'a ActivityRecord,
    field: &'a Field<T>,
    name: &str,
) -> Result<Option<&'a T>> {
    match field {
        Some(value) => Ok(value.as_ref()),
        None => Err(AppError::MalformedRecord(format!(
            "activity {} has no field {}",
            activity.id, name
        ))),
    }
}

fn text_of(value: Option<&String>) -> String {
    value.cloned().unwrap_or_default()
}

/// Map an activity and its athlete's display name to page properties.
///
/// Every mapped field must be present in the fetched activity; an absent
/// field means the record is not a detailed activity and fails the mapping.
pub fn map_activity_to_properties(
    activity: &ActivityRecord,
    username: &str,
) -> Result<PropertyMap> {
    let name = required(activity, &activity.name, "name")?;
    let description = required(activity, &activity.description, "description")?;
    let sport_type = required(activity, &activity.sport_type, "sport_type")?;
    let calories = required(activity, &activity.calories, "calories")?;
    let start_date = required(activity, &activity.start_date, "start_date")?;
    let average_speed = required(activity, &activity.average_speed, "average_speed")?;
    let max_speed = required(activity, &activity.max_speed, "max_speed")?;
    let elevation = required(activity, &activity.total_elevation_gain, "total_elevation_gain")?;
    let external_id = required(activity, &activity.external_id, "external_id")?;
    let upload_id = required(activity, &activity.upload_id, "upload_id")?;
    let moving_time = required(activity, &activity.moving_time, "moving_time")?;
    let distance = required(activity, &activity.distance, "distance")?;

    let mut properties = PropertyMap::new();
    let mut set = |key: &str, value: PropertyValue| {
        properties.insert(key.to_string(), value);
    };

    set("Name", PropertyValue::title(text_of(name)));
    set("Athlète", PropertyValue::rich_text(username));
    set("Description", PropertyValue::rich_text(text_of(description)));
    set(
        "Type",
        PropertyValue::Select(sport_type.map(|name| SelectOption { name: name.clone() })),
    );
    set("Calories", PropertyValue::Number(calories.copied()));
    set(
        "Start",
        PropertyValue::Date(start_date.map(|start| DateValue {
            start: start.clone(),
        })),
    );
    set(ACTIVITY_ID_PROPERTY, PropertyValue::rich_text(activity.id.as_str()));
    set("AVG Speed", PropertyValue::Number(average_speed.copied()));
    set("Max Speed", PropertyValue::Number(max_speed.copied()));
    set("Total Elevation Gain", PropertyValue::Number(elevation.copied()));
    set("External ID", PropertyValue::rich_text(text_of(external_id)));
    set("Upload ID", PropertyValue::rich_text(text_of(upload_id)));
    set("Time", PropertyValue::Number(moving_time.copied()));
    set("Distance", PropertyValue::Number(distance.copied()));

    Ok(properties)
}

/// Property schema of the activities database.
///
/// Existing workspaces were provisioned with exactly this layout; property
/// names, select colors and formula expressions must not drift.
pub fn database_schema() -> Value {
    json!({
        "External ID": {"rich_text": {}},
        "Type": {
            "select": {
                "options": [
                    {"name": "Run", "color": "yellow"},
                    {"name": "Ride", "color": "red"},
                    {"name": "Swim", "color": "brown"},
                    {"name": "VirtualRide", "color": "orange"}
                ]
            }
        },
        "Total Elevation Gain": {"number": {"format": "number"}},
        "Upload ID": {"rich_text": {}},
        "Start": {"date": {}},
        "Activity ID": {"rich_text": {}},
        "Calories": {"number": {"format": "number"}},
        "Distance": {"number": {"format": "number"}},
        "AVG Speed": {"number": {"format": "number"}},
        "Description": {"rich_text": {}},
        "Athlète": {"rich_text": {}},
        "Distance (km)": {"formula": {"expression": "round(prop(\"Distance\")/100)/10"}},
        "Max Speed": {"number": {"format": "number"}},
        "Time (min)": {"formula": {"expression": "round(prop(\"Time\")/60)"}},
        "Time": {"number": {"format": "number"}},
        "AVG Speed (km/h)": {"formula": {"expression": "round(prop(\"AVG Speed\")*3.6)"}},
        "Name": {"title": {}}
    })
}

/// Query filter selecting the pages of one activity.
pub fn activity_filter(activity_id: &str) -> Value {
    json!({
        "property": ACTIVITY_ID_PROPERTY,
        "rich_text": {"equals": activity_id}
    })
}
