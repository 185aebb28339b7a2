//! User review model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum number of characters in a review text.
pub const MIN_REVIEW_LENGTH: usize = 10;

/// A user review of a game. Reviews are append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub game_id: String,
    pub rating: u8,
    pub text: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    /// Host user id; `None` when the review was written without a host identity
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Request body for submitting a review.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReviewRequest {
    pub game_id: String,
    /// Number of selected stars; 0 means none selected
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub text: String,
}

/// Request body for a star click on a game card.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateGameRequest {
    pub rating: u8,
}

/// Query parameters for the review feed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFeedQuery {
    #[serde(default)]
    pub game_id: Option<String>,
}
