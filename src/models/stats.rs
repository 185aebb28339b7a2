//! Per-client ratings and activity counters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Star ratings given by one client, keyed by game id. Latest write wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct GameRatings(pub BTreeMap<String, u8>);

impl GameRatings {
    pub fn get(&self, game_id: &str) -> Option<u8> {
        self.0.get(game_id).copied()
    }

    /// Stores a rating and returns the one it replaced.
    pub fn set(&mut self, game_id: &str, rating: u8) -> Option<u8> {
        self.0.insert(game_id.to_string(), rating)
    }
}

/// Activity counters. Counters only ever grow by one per qualifying action.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    #[serde(default)]
    pub ratings_given: u32,
    #[serde(default)]
    pub reviews_written: u32,
    #[serde(default)]
    pub games_played: u32,
}

impl UserStats {
    pub fn record_rating(&mut self) {
        self.ratings_given = self.ratings_given.saturating_add(1);
    }

    pub fn record_review(&mut self) {
        self.reviews_written = self.reviews_written.saturating_add(1);
    }

    pub fn record_play(&mut self) {
        self.games_played = self.games_played.saturating_add(1);
    }
}
