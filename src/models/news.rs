//! News item model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of a news item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NewsKind {
    #[default]
    Update,
    Announcement,
    Event,
    Maintenance,
}

impl NewsKind {
    /// Human-readable badge label.
    pub fn label(&self) -> &'static str {
        match self {
            NewsKind::Update => "Update",
            NewsKind::Announcement => "Announcement",
            NewsKind::Event => "Event",
            NewsKind::Maintenance => "Maintenance",
        }
    }
}

/// A news entry. Stored newest-first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: NewsKind,
    pub date: DateTime<Utc>,
}

/// Request body for creating a news item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNewsRequest {
    pub title: String,
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: Option<NewsKind>,
}
