//! Catalog renderer: the user-facing mini-app screen.

use chrono::Utc;
use serde::Serialize;

use super::format::{format_date, stars, token_display, TokenDisplay};
use super::Rendered;
use crate::db::{ContentStore, Storage};
use crate::errors::AppError;
use crate::identity::{share_link, Profile, Viewer};
use crate::models::{
    Announcement, AnnouncementDismissal, AnnouncementKind, Game, GameRatings, NewsItem, NewsKind,
    Review, SubmitReviewRequest, Theme, TokenSnapshot, UserStats,
};
use crate::notify::{Notification, Surface};
use crate::validation::{validate_rating, validate_review};

/// Number of reviews shown in the feed.
pub const REVIEW_FEED_SIZE: usize = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogView {
    pub profile: Profile,
    pub theme: Theme,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<Banner>,
    pub news: Vec<NewsCard>,
    pub games: Vec<GameCard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<TokenDisplay>,
    pub reviews: Vec<ReviewCard>,
    pub stats: UserStats,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: AnnouncementKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsCard {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: NewsKind,
    pub label: &'static str,
    pub date: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameCard {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub description: String,
    pub image: String,
    pub url: String,
    pub share_url: String,
    /// Stars this client gave, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_rating: Option<u8>,
    pub review_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCard {
    pub id: String,
    pub game_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_name: Option<String>,
    pub rating: u8,
    pub stars: String,
    pub text: String,
    pub author: String,
    pub date: String,
}

/// Where the play button leads.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayLink {
    pub game_id: String,
    pub url: String,
    pub share_url: String,
}

/// Catalog renderer bound to one viewer.
pub struct CatalogRenderer<'a> {
    storage: &'a Storage,
    viewer: &'a Viewer,
}

impl<'a> CatalogRenderer<'a> {
    pub fn new(storage: &'a Storage, viewer: &'a Viewer) -> Self {
        Self { storage, viewer }
    }

    pub async fn render(&self) -> Result<CatalogView, AppError> {
        let shared = self.storage.shared();
        let client = self.storage.client(&self.viewer.client_id);

        let announcements = shared.get::<Announcement>().await?;
        let news = shared.get::<NewsItem>().await?;
        let games = shared.games().await?;
        let token = shared.get_scalar::<TokenSnapshot>().await?;
        let reviews = shared.get::<Review>().await?;

        let ratings = client.get_scalar::<GameRatings>().await?.unwrap_or_default();
        let stats = client.get_scalar::<UserStats>().await?.unwrap_or_default();
        let theme = client.get_scalar::<Theme>().await?.unwrap_or_default();
        let dismissed = client
            .get_scalar::<AnnouncementDismissal>()
            .await?
            .unwrap_or_default();

        Ok(CatalogView {
            profile: self.viewer.bridge.profile(),
            theme,
            banner: if dismissed.0 {
                None
            } else {
                banner(&announcements)
            },
            news: news.iter().map(news_card).collect(),
            games: games
                .iter()
                .map(|g| game_card(g, &ratings, &reviews))
                .collect(),
            token: token.as_ref().map(token_display),
            reviews: review_feed(&reviews, &games, None),
            stats,
        })
    }

    /// The review feed, optionally narrowed to one game.
    pub async fn reviews(&self, game_id: Option<&str>) -> Result<Vec<ReviewCard>, AppError> {
        let shared = self.storage.shared();
        let reviews = shared.get::<Review>().await?;
        let games = shared.games().await?;
        Ok(review_feed(&reviews, &games, game_id))
    }

    /// A star click on a game card. Only the first rating of a game counts
    /// towards `ratingsGiven`.
    pub async fn rate_game(
        &self,
        game_id: &str,
        rating: u8,
    ) -> Result<Rendered<CatalogView>, AppError> {
        let rating = validate_rating(rating)?;
        let game = self.find_game(game_id).await?;

        self.client_for_write()
            .update_scalars::<GameRatings, UserStats, _, _>(|ratings, stats| {
                if ratings.set(game_id, rating).is_none() {
                    stats.record_rating();
                }
                Ok(())
            })
            .await?;
        tracing::debug!(client = %self.viewer.client_id, game = game_id, rating, "Rated game");

        Ok(Rendered::new(
            self.render().await?,
            Notification::success(
                Surface::Catalog,
                "Thanks for rating",
                format!("You gave {} {}", game.name, stars(rating)),
            ),
        ))
    }

    pub async fn submit_review(
        &self,
        request: &SubmitReviewRequest,
    ) -> Result<Rendered<CatalogView>, AppError> {
        let games = self.storage.shared().games().await?;
        let valid = validate_review(request, &games)?;

        let (author, user_id) = self.viewer.bridge.review_author();
        let review =
            valid.into_record(uuid::Uuid::new_v4().to_string(), author, user_id, Utc::now());
        let review_id = review.id.clone();

        self.storage
            .shared()
            .update_with::<Review, UserStats, _, _>(&self.client_for_write(), |reviews, stats| {
                reviews.push(review);
                stats.record_review();
                Ok(())
            })
            .await?;
        tracing::info!("Review {} submitted for game {}", review_id, request.game_id);

        Ok(Rendered::new(
            self.render().await?,
            Notification::success(
                Surface::Catalog,
                "Review published",
                "Thank you for your feedback",
            ),
        ))
    }

    /// Count a play and return where the game opens.
    pub async fn play_game(&self, game_id: &str) -> Result<Rendered<PlayLink>, AppError> {
        let game = self.find_game(game_id).await?;

        self.client_for_write()
            .update_scalar::<UserStats, _, _>(|stats| {
                stats.record_play();
                Ok(())
            })
            .await?;

        let link = PlayLink {
            game_id: game.id.clone(),
            share_url: share_link(&game.url, &game.name),
            url: game.url,
        };
        Ok(Rendered::new(
            link,
            Notification::info(
                Surface::Catalog,
                "Launching",
                format!("Opening {}", game.name),
            ),
        ))
    }

    /// Close the banner for this client. It stays closed for every later
    /// announcement too.
    pub async fn dismiss_announcement(&self) -> Result<Rendered<CatalogView>, AppError> {
        self.client_for_write()
            .set_scalar(&AnnouncementDismissal(true))
            .await?;
        Ok(Rendered::silent(self.render().await?))
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<Rendered<CatalogView>, AppError> {
        self.client_for_write().set_scalar(&theme)
            .await?;
        Ok(Rendered::silent(self.render().await?))
    }

    /// The caller's namespace for a write. Callers without a client id share one.
    fn client_for_write(&self) -> ContentStore {
        if self.viewer.is_anonymous() {
            tracing::warn!(
                "Catalog write without a client id; using the shared '{}' namespace",
                self.viewer.client_id
            );
        }
        self.storage.client(&self.viewer.client_id)
    }

    async fn find_game(&self, game_id: &str) -> Result<Game, AppError> {
        self.storage
            .shared()
            .games()
            .await?
            .into_iter()
            .find(|g| g.id == game_id)
            .ok_or_else(|| AppError::NotFound(format!("Game {} not found", game_id)))
    }
}

/// The most recently created active announcement.
pub fn banner(announcements: &[Announcement]) -> Option<Banner> {
    announcements
        .iter()
        .filter(|a| a.active)
        .max_by_key(|a| a.created_at)
        .map(|a| Banner {
            id: a.id.clone(),
            text: a.text.clone(),
            kind: a.kind,
        })
}

/// Newest reviews first, at most [`REVIEW_FEED_SIZE`], optionally for one game.
pub fn review_feed(reviews: &[Review], games: &[Game], game_id: Option<&str>) -> Vec<ReviewCard> {
    let mut selected: Vec<&Review> = reviews
        .iter()
        .filter(|r| game_id.map_or(true, |id| r.game_id == id))
        .collect();
    // Stable sort keeps insertion order for equal timestamps, so reverse it first
    selected.reverse();
    selected.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    selected
        .into_iter()
        .take(REVIEW_FEED_SIZE)
        .map(|r| ReviewCard {
            id: r.id.clone(),
            game_id: r.game_id.clone(),
            game_name: games
                .iter()
                .find(|g| g.id == r.game_id)
                .map(|g| g.name.clone()),
            rating: r.rating,
            stars: stars(r.rating),
            text: r.text.clone(),
            author: r.author.clone(),
            date: format_date(&r.timestamp),
        })
        .collect()
}

fn news_card(item: &NewsItem) -> NewsCard {
    NewsCard {
        id: item.id.clone(),
        title: item.title.clone(),
        content: item.content.clone(),
        kind: item.kind,
        label: item.kind.label(),
        date: format_date(&item.date),
    }
}

fn game_card(game: &Game, ratings: &GameRatings, reviews: &[Review]) -> GameCard {
    let game_reviews: Vec<&Review> = reviews.iter().filter(|r| r.game_id == game.id).collect();
    let average_rating = if game_reviews.is_empty() {
        None
    } else {
        let sum: u32 = game_reviews.iter().map(|r| u32::from(r.rating)).sum();
        let average = f64::from(sum) / game_reviews.len() as f64;
        Some((average * 10.0).round() / 10.0)
    };

    GameCard {
        id: game.id.clone(),
        name: game.name.clone(),
        tag: game.tag.clone(),
        description: game.description.clone(),
        image: game.image.clone(),
        url: game.url.clone(),
        share_url: share_link(&game.url, &game.name),
        user_rating: ratings.get(&game.id),
        review_count: game_reviews.len(),
        average_rating,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    use super::*;
    use crate::db::{init_database, ANONYMOUS_CLIENT};
    use crate::identity::{HostBridge, HostUser};
    use crate::models::builtin_catalog;
    use crate::validation::ValidationError;

    async fn storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let pool = init_database(&temp_dir.path().join("catalog.sqlite"))
            .await
            .expect("Failed to init DB");
        (Storage::new(pool), temp_dir)
    }

    fn guest(client_id: &str) -> Viewer {
        Viewer {
            client_id: client_id.to_string(),
            bridge: HostBridge::Absent,
        }
    }

    fn host_user() -> Viewer {
        Viewer {
            client_id: "tg-42".to_string(),
            bridge: HostBridge::Present(HostUser {
                id: 42,
                first_name: "Ada".to_string(),
                last_name: Some("Lovelace".to_string()),
                username: Some("ada".to_string()),
                photo_url: None,
            }),
        }
    }

    fn review(id: &str, game_id: &str, minutes: i64) -> Review {
        Review {
            id: id.to_string(),
            game_id: game_id.to_string(),
            rating: 4,
            text: "Really enjoyed it".to_string(),
            author: "Anonymous".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
                + Duration::minutes(minutes),
            user_id: None,
        }
    }

    fn announcement(id: &str, active: bool, minutes: i64) -> Announcement {
        Announcement {
            id: id.to_string(),
            text: format!("Announcement {}", id),
            kind: AnnouncementKind::Info,
            active,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
                + Duration::minutes(minutes),
        }
    }

    fn review_request(game_id: &str, rating: u8, text: &str) -> SubmitReviewRequest {
        SubmitReviewRequest {
            game_id: game_id.to_string(),
            rating,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_review_feed_newest_first_capped() {
        let games = builtin_catalog();
        let reviews: Vec<Review> = (0..7)
            .map(|i| review(&format!("r{}", i), "builtin-1", i))
            .collect();

        let feed = review_feed(&reviews, &games, None);

        assert_eq!(feed.len(), REVIEW_FEED_SIZE);
        let ids: Vec<_> = feed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r6", "r5", "r4", "r3", "r2"]);
        assert_eq!(feed[0].game_name.as_deref(), Some("Tap Kingdom"));
        assert_eq!(feed[0].stars, "★★★★☆");
    }

    #[test]
    fn test_review_feed_filters_by_game() {
        let games = builtin_catalog();
        let reviews = vec![
            review("a", "builtin-1", 0),
            review("b", "builtin-2", 1),
            review("c", "builtin-1", 2),
        ];

        let feed = review_feed(&reviews, &games, Some("builtin-1"));
        let ids: Vec<_> = feed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);

        assert!(review_feed(&reviews, &games, Some("builtin-4")).is_empty());
    }

    #[test]
    fn test_review_feed_ties_prefer_later_insertion() {
        let games = builtin_catalog();
        let reviews = vec![review("first", "builtin-1", 0), review("second", "builtin-1", 0)];

        let feed = review_feed(&reviews, &games, None);
        assert_eq!(feed[0].id, "second");
    }

    #[test]
    fn test_banner_picks_latest_active() {
        let announcements = vec![
            announcement("old", true, 0),
            announcement("newest-inactive", false, 30),
            announcement("new", true, 10),
        ];
        assert_eq!(banner(&announcements).map(|b| b.id), Some("new".to_string()));
        assert_eq!(banner(&[announcement("off", false, 0)]), None);
    }

    #[tokio::test]
    async fn test_render_empty_store_shows_builtin_games() {
        let (storage, _dir) = storage().await;
        let viewer = guest("client-a");

        let view = CatalogRenderer::new(&storage, &viewer).render().await.unwrap();

        assert_eq!(view.games.len(), 4);
        assert!(view.banner.is_none());
        assert!(view.token.is_none());
        assert!(view.reviews.is_empty());
        assert_eq!(view.stats, UserStats::default());
        assert_eq!(view.theme, Theme::Light);
        assert_eq!(view.profile.display_name, "Guest");
        // Fallback catalog is not persisted
        assert!(storage.shared().get::<Game>().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rating_counts_once_per_game() {
        let (storage, _dir) = storage().await;
        let viewer = guest("client-a");
        let catalog = CatalogRenderer::new(&storage, &viewer);

        catalog.rate_game("builtin-1", 3).await.unwrap();
        let rendered = catalog.rate_game("builtin-1", 5).await.unwrap();

        let card = rendered
            .view
            .games
            .iter()
            .find(|g| g.id == "builtin-1")
            .unwrap();
        assert_eq!(card.user_rating, Some(5));
        assert_eq!(rendered.view.stats.ratings_given, 1);

        let view = catalog.rate_game("builtin-2", 4).await.unwrap().view;
        assert_eq!(view.stats.ratings_given, 2);
    }

    #[tokio::test]
    async fn test_rating_is_private_to_client() {
        let (storage, _dir) = storage().await;
        let a = guest("client-a");
        let b = guest("client-b");

        CatalogRenderer::new(&storage, &a)
            .rate_game("builtin-3", 2)
            .await
            .unwrap();

        let view = CatalogRenderer::new(&storage, &b).render().await.unwrap();
        assert!(view.games.iter().all(|g| g.user_rating.is_none()));
        assert_eq!(view.stats.ratings_given, 0);
    }

    #[tokio::test]
    async fn test_rating_rejects_zero_and_unknown_game() {
        let (storage, _dir) = storage().await;
        let viewer = guest("client-a");
        let catalog = CatalogRenderer::new(&storage, &viewer);

        let err = catalog.rate_game("builtin-1", 0).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::NoRating)));

        let err = catalog.rate_game("missing", 4).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_submit_review_appends_and_counts() {
        let (storage, _dir) = storage().await;
        let viewer = host_user();
        let catalog = CatalogRenderer::new(&storage, &viewer);

        let rendered = catalog
            .submit_review(&review_request("builtin-2", 5, "  Great racing game!  "))
            .await
            .unwrap();

        let stored = storage.shared().get::<Review>().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].text, "Great racing game!");
        assert_eq!(stored[0].author, "Ada Lovelace");
        assert_eq!(stored[0].user_id.as_deref(), Some("42"));

        assert_eq!(rendered.view.stats.reviews_written, 1);
        assert_eq!(rendered.view.reviews.len(), 1);
        let card = rendered
            .view
            .games
            .iter()
            .find(|g| g.id == "builtin-2")
            .unwrap();
        assert_eq!(card.review_count, 1);
        assert_eq!(card.average_rating, Some(5.0));
    }

    #[tokio::test]
    async fn test_anonymous_review_author() {
        let (storage, _dir) = storage().await;
        let viewer = guest("client-a");

        CatalogRenderer::new(&storage, &viewer)
            .submit_review(&review_request("builtin-1", 3, "Decent puzzle game"))
            .await
            .unwrap();

        let stored = storage.shared().get::<Review>().await.unwrap();
        assert_eq!(stored[0].author, "Anonymous");
        assert_eq!(stored[0].user_id, None);
    }

    #[tokio::test]
    async fn test_invalid_review_is_not_stored() {
        let (storage, _dir) = storage().await;
        let viewer = guest("client-a");
        let catalog = CatalogRenderer::new(&storage, &viewer);

        let err = catalog
            .submit_review(&review_request("builtin-1", 0, "Long enough text"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::NoRating)));

        let err = catalog
            .submit_review(&review_request("builtin-1", 4, "short"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::TooShort { .. })
        ));

        assert!(storage.shared().get::<Review>().await.unwrap().is_empty());
        let view = catalog.render().await.unwrap();
        assert_eq!(view.stats.reviews_written, 0);
    }

    /// A store whose `client-a` stats row is unreadable.
    async fn storage_with_broken_stats() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let pool = init_database(&temp_dir.path().join("catalog.sqlite"))
            .await
            .expect("Failed to init DB");
        sqlx::query(
            "INSERT INTO kv_store (namespace, key, schema_version, value, updated_at) VALUES ('client:client-a', 'user_stats', 1, '{broken', datetime('now'))",
        )
        .execute(&pool)
        .await
        .unwrap();
        (Storage::new(pool), temp_dir)
    }

    #[tokio::test]
    async fn test_review_not_stored_when_stats_unreadable() {
        let (storage, _dir) = storage_with_broken_stats().await;
        let viewer = guest("client-a");
        let revision = storage.get_revision_id().await.unwrap();

        let err = CatalogRenderer::new(&storage, &viewer)
            .submit_review(&review_request("builtin-1", 5, "Great game overall"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Parse { .. }));
        assert!(storage.shared().get::<Review>().await.unwrap().is_empty());
        assert_eq!(storage.get_revision_id().await.unwrap(), revision);
    }

    #[tokio::test]
    async fn test_rating_not_stored_when_stats_unreadable() {
        let (storage, _dir) = storage_with_broken_stats().await;
        let viewer = guest("client-a");

        let err = CatalogRenderer::new(&storage, &viewer)
            .rate_game("builtin-1", 4)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Parse { .. }));
        let ratings = storage
            .client("client-a")
            .get_scalar::<GameRatings>()
            .await
            .unwrap();
        assert!(ratings.is_none());
    }

    #[tokio::test]
    async fn test_anonymous_writes_share_a_namespace() {
        let (storage, _dir) = storage().await;
        let first = guest(ANONYMOUS_CLIENT);
        let second = guest(ANONYMOUS_CLIENT);
        assert!(first.is_anonymous());

        CatalogRenderer::new(&storage, &first)
            .set_theme(Theme::Dark)
            .await
            .unwrap();

        let view = CatalogRenderer::new(&storage, &second).render().await.unwrap();
        assert_eq!(view.theme, Theme::Dark);
    }

    #[tokio::test]
    async fn test_play_counts_and_links() {
        let (storage, _dir) = storage().await;
        let viewer = guest("client-a");
        let catalog = CatalogRenderer::new(&storage, &viewer);

        let rendered = catalog.play_game("builtin-4").await.unwrap();
        catalog.play_game("builtin-4").await.unwrap();

        assert_eq!(rendered.view.url, "https://t.me/gamehub_bot/spacefarm");
        assert!(rendered.view.share_url.starts_with("https://t.me/share/url?url="));
        assert_eq!(catalog.render().await.unwrap().stats.games_played, 2);
    }

    #[tokio::test]
    async fn test_dismissed_banner_stays_hidden() {
        let (storage, _dir) = storage().await;
        storage
            .shared()
            .set(&[announcement("a1", true, 0)])
            .await
            .unwrap();
        let viewer = guest("client-a");
        let catalog = CatalogRenderer::new(&storage, &viewer);

        assert!(catalog.render().await.unwrap().banner.is_some());

        let view = catalog.dismiss_announcement().await.unwrap().view;
        assert!(view.banner.is_none());

        storage
            .shared()
            .update::<Announcement, _, _>(|list| {
                list.push(announcement("a2", true, 60));
                Ok(())
            })
            .await
            .unwrap();
        assert!(catalog.render().await.unwrap().banner.is_none());

        // Other clients still see it
        let other = guest("client-b");
        let view = CatalogRenderer::new(&storage, &other).render().await.unwrap();
        assert_eq!(view.banner.map(|b| b.id), Some("a2".to_string()));
    }

    #[tokio::test]
    async fn test_theme_persists_per_client() {
        let (storage, _dir) = storage().await;
        let viewer = guest("client-a");

        let view = CatalogRenderer::new(&storage, &viewer)
            .set_theme(Theme::Dark)
            .await
            .unwrap()
            .view;
        assert_eq!(view.theme, Theme::Dark);

        let other = guest("client-b");
        let view = CatalogRenderer::new(&storage, &other).render().await.unwrap();
        assert_eq!(view.theme, Theme::Light);
    }
}
