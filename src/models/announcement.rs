//! Announcement model shown as a banner in the catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Visual severity of an announcement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnnouncementKind {
    #[default]
    Info,
    Warning,
    Success,
    Error,
}

/// An admin-authored announcement. Never expires on its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: AnnouncementKind,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Request body for creating an announcement.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnnouncementRequest {
    pub text: String,
    #[serde(rename = "type", default)]
    pub kind: Option<AnnouncementKind>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Request body for updating an announcement.
///
/// Omitting `active` flips the current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAnnouncementRequest {
    #[serde(default)]
    pub active: Option<bool>,
}
