//! Per-client display preferences.

use serde::{Deserialize, Serialize};

/// Color scheme of the mini-app.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Whether the client closed the announcement banner. Once closed it stays closed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct AnnouncementDismissal(pub bool);

/// Request body for changing the theme.
#[derive(Debug, Clone, Deserialize)]
pub struct SetThemeRequest {
    pub theme: Theme,
}
