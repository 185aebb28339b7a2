//! Whole-store snapshot and revision models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Announcement, Game, NewsItem, Review, TokenSnapshot};

/// All shared content at one revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSnapshot {
    pub schema_version: i32,
    pub generated_at: String,
    pub revision_id: i64,
    pub announcements: Vec<Announcement>,
    pub news: Vec<NewsItem>,
    /// Custom games only; empty while the built-in catalog is in use
    pub games: Vec<Game>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_data: Option<TokenSnapshot>,
    pub reviews: Vec<Review>,
}

/// Revision information for change detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub revision_id: i64,
    pub generated_at: String,
}

/// A dump of the browser's local storage, keyed by storage key with the raw
/// stored strings as values.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyImportRequest {
    pub entries: BTreeMap<String, String>,
    /// Client namespace receiving per-client keys
    #[serde(default)]
    pub client_id: Option<String>,
}

/// Keys written by a legacy import.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub imported_keys: Vec<String>,
}
