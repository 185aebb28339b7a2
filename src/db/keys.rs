//! Logical storage keys and the typed entities stored under them.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::legacy;
use crate::models::{
    Announcement, AnnouncementDismissal, Game, GameRatings, NewsItem, Review, Theme,
    TokenSnapshot, UserStats,
};

/// Which kind of namespace a key lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceKind {
    /// Content shared by the admin panel and every catalog client
    Shared,
    /// Values private to one client
    Client,
}

/// A storage partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Namespace {
    Shared,
    Client(String),
}

impl Namespace {
    pub fn kind(&self) -> NamespaceKind {
        match self {
            Namespace::Shared => NamespaceKind::Shared,
            Namespace::Client(_) => NamespaceKind::Client,
        }
    }

    /// Value of the `namespace` column.
    pub fn column_value(&self) -> String {
        match self {
            Namespace::Shared => "shared".to_string(),
            Namespace::Client(id) => format!("client:{}", id),
        }
    }
}

/// Fixed logical keys of the persisted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Announcements,
    News,
    Games,
    TokenData,
    GameRatings,
    UserReviews,
    UserStats,
    Theme,
    AnnouncementClosed,
}

impl StoreKey {
    pub const ALL: [StoreKey; 9] = [
        StoreKey::Announcements,
        StoreKey::News,
        StoreKey::Games,
        StoreKey::TokenData,
        StoreKey::GameRatings,
        StoreKey::UserReviews,
        StoreKey::UserStats,
        StoreKey::Theme,
        StoreKey::AnnouncementClosed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::Announcements => "announcements",
            StoreKey::News => "news",
            StoreKey::Games => "games",
            StoreKey::TokenData => "tokenData",
            StoreKey::GameRatings => "game_ratings",
            StoreKey::UserReviews => "user_reviews",
            StoreKey::UserStats => "user_stats",
            StoreKey::Theme => "theme",
            StoreKey::AnnouncementClosed => "announcement_closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    pub fn namespace_kind(&self) -> NamespaceKind {
        match self {
            StoreKey::Announcements
            | StoreKey::News
            | StoreKey::Games
            | StoreKey::TokenData
            | StoreKey::UserReviews => NamespaceKind::Shared,
            StoreKey::GameRatings
            | StoreKey::UserStats
            | StoreKey::Theme
            | StoreKey::AnnouncementClosed => NamespaceKind::Client,
        }
    }
}

/// A typed value persisted under a fixed key with a versioned schema.
pub trait StoreEntity: Serialize + DeserializeOwned + Send + Sync {
    const KEY: StoreKey;
    const SCHEMA_VERSION: i64 = 1;

    /// Bring a value written under an older schema version up to the current
    /// one. For collections this is called once per element.
    fn upgrade(value: Value, from_version: i64) -> Result<Value, String> {
        legacy::upgrade(Self::KEY, value, from_version)
    }
}

/// An entity stored as an ordered sequence of records.
pub trait Collection: StoreEntity {}

/// An entity with at most one current value.
pub trait Scalar: StoreEntity {}

impl StoreEntity for Announcement {
    const KEY: StoreKey = StoreKey::Announcements;
}
impl Collection for Announcement {}

impl StoreEntity for NewsItem {
    const KEY: StoreKey = StoreKey::News;
}
impl Collection for NewsItem {}

impl StoreEntity for Game {
    const KEY: StoreKey = StoreKey::Games;
}
impl Collection for Game {}

impl StoreEntity for Review {
    const KEY: StoreKey = StoreKey::UserReviews;
}
impl Collection for Review {}

impl StoreEntity for TokenSnapshot {
    const KEY: StoreKey = StoreKey::TokenData;
}
impl Scalar for TokenSnapshot {}

impl StoreEntity for GameRatings {
    const KEY: StoreKey = StoreKey::GameRatings;
}
impl Scalar for GameRatings {}

impl StoreEntity for UserStats {
    const KEY: StoreKey = StoreKey::UserStats;
}
impl Scalar for UserStats {}

impl StoreEntity for Theme {
    const KEY: StoreKey = StoreKey::Theme;
}
impl Scalar for Theme {}

impl StoreEntity for AnnouncementDismissal {
    const KEY: StoreKey = StoreKey::AnnouncementClosed;
}
impl Scalar for AnnouncementDismissal {}
