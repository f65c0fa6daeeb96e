//! Unit domain types
//!
//! A unit is a course offering: it owns a week calendar and a synced
//! discussion forum.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::weeks::WeekDescriptor;

/// Unit entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Unit {
    pub id: String,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub semester_id: Option<String>,
    /// Course id on the discussion forum
    #[serde(default)]
    pub forum_course_id: Option<String>,
    #[serde(default)]
    pub weeks: Vec<WeekDescriptor>,
    #[serde(default)]
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Request DTO for creating a unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUnitRequest {
    pub code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forum_course_id: Option<String>,
}

/// Request DTO for updating a unit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUnitRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forum_course_id: Option<String>,
}

/// Result of a forum thread sync
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ThreadSyncResponse {
    #[serde(default)]
    pub synced: u32,
    #[serde(default)]
    pub created: u32,
    #[serde(default)]
    pub updated: u32,
}
