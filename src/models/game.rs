//! Game catalog model.

use serde::{Deserialize, Serialize};

/// Prefix shared by the ids of the built-in catalog entries.
pub const BUILTIN_ID_PREFIX: &str = "builtin-";

/// A game listed in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub description: String,
    pub image: String,
    pub url: String,
}

impl Game {
    pub fn is_builtin(&self) -> bool {
        self.id.starts_with(BUILTIN_ID_PREFIX)
    }
}

/// Request body for adding a game.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    pub name: String,
    #[serde(default)]
    pub tag: Option<String>,
    pub description: String,
    pub image: String,
    pub url: String,
}

/// The catalog shown while no custom games have been saved.
pub fn builtin_catalog() -> Vec<Game> {
    let entry = |n: u8, name: &str, tag: Option<&str>, description: &str, slug: &str| Game {
        id: format!("{BUILTIN_ID_PREFIX}{n}"),
        name: name.to_string(),
        tag: tag.map(str::to_string),
        description: description.to_string(),
        image: format!("https://gamehub.app/static/games/{slug}.png"),
        url: format!("https://t.me/gamehub_bot/{slug}"),
    };

    vec![
        entry(
            1,
            "Tap Kingdom",
            Some("HOT"),
            "Build your kingdom one tap at a time and climb the weekly leaderboard.",
            "tapkingdom",
        ),
        entry(
            2,
            "Crypto Racer",
            Some("NEW"),
            "Arcade racing with daily tournaments and token rewards.",
            "cryptoracer",
        ),
        entry(
            3,
            "Puzzle Mine",
            None,
            "Match gems, dig deeper and unlock rare artifacts.",
            "puzzlemine",
        ),
        entry(
            4,
            "Space Farm",
            Some("TOP"),
            "Grow crops on distant planets and trade harvests with friends.",
            "spacefarm",
        ),
    ]
}
