//! Admin panel renderer: tables, token form and admin actions.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::format::{format_date, token_display, TokenDisplay};
use super::{Confirmation, Rendered};
use crate::db::Storage;
use crate::errors::AppError;
use crate::models::{
    Announcement, AnnouncementKind, CreateAnnouncementRequest, CreateGameRequest,
    CreateNewsRequest, Game, NewsItem, NewsKind, Review, SaveTokenRequest, TokenSnapshot,
    UpdateAnnouncementRequest,
};
use crate::notify::{Notification, Surface};
use crate::price::PriceSource;
use crate::validation::{validate_announcement, validate_game, validate_news, validate_token};

/// Everything the admin panel displays.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminView {
    pub announcements: Vec<AnnouncementRow>,
    pub news: Vec<NewsRow>,
    pub games: Vec<GameRow>,
    pub token_form: TokenForm,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<TokenDisplay>,
    pub counts: AdminCounts,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementRow {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: AnnouncementKind,
    pub active: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsRow {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: NewsKind,
    pub date: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRow {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub description: String,
    pub image: String,
    pub url: String,
    /// Built-in entries are shown while no custom game exists
    pub builtin: bool,
}

/// Token form fields exactly as the inputs display them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenForm {
    pub usd_price: String,
    pub change_24h: String,
    pub usd_to_rub_rate: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdminCounts {
    pub announcements: usize,
    pub active_announcements: usize,
    pub news: usize,
    pub games: usize,
    pub reviews: usize,
}

/// Admin renderer bound to the shared store.
pub struct AdminRenderer<'a> {
    storage: &'a Storage,
    /// RUB rate prefilled while no token snapshot exists
    default_rub_rate: f64,
}

impl<'a> AdminRenderer<'a> {
    pub fn new(storage: &'a Storage, default_rub_rate: f64) -> Self {
        Self {
            storage,
            default_rub_rate,
        }
    }

    /// Rebuild the whole admin view from the store.
    pub async fn render(&self) -> Result<AdminView, AppError> {
        let shared = self.storage.shared();
        let announcements = shared.get::<Announcement>().await?;
        let news = shared.get::<NewsItem>().await?;
        let games = shared.games().await?;
        let token = shared.get_scalar::<TokenSnapshot>().await?;
        let reviews = shared.get::<Review>().await?;

        Ok(project(
            &announcements,
            &news,
            &games,
            token.as_ref(),
            reviews.len(),
            self.default_rub_rate,
        ))
    }

    pub async fn create_announcement(
        &self,
        request: &CreateAnnouncementRequest,
    ) -> Result<Rendered<AdminView>, AppError> {
        let record = validate_announcement(request)?
            .into_record(uuid::Uuid::new_v4().to_string(), Utc::now());
        let id = record.id.clone();

        self.storage
            .shared()
            .update::<Announcement, _, _>(|list| {
                list.push(record);
                Ok(())
            })
            .await?;
        tracing::info!("Created announcement {}", id);

        self.rendered(Notification::success(
            Surface::Admin,
            "Announcement published",
            "The announcement is now visible in the catalog",
        ))
        .await
    }

    /// Set or flip the active flag of an announcement.
    pub async fn update_announcement(
        &self,
        id: &str,
        request: &UpdateAnnouncementRequest,
    ) -> Result<Rendered<AdminView>, AppError> {
        let active = self
            .storage
            .shared()
            .update::<Announcement, _, _>(|list| {
                let announcement = list
                    .iter_mut()
                    .find(|a| a.id == id)
                    .ok_or_else(|| AppError::NotFound(format!("Announcement {} not found", id)))?;
                announcement.active = request.active.unwrap_or(!announcement.active);
                Ok(announcement.active)
            })
            .await?;

        let message = if active {
            "The announcement is shown again"
        } else {
            "The announcement is hidden"
        };
        self.rendered(Notification::success(
            Surface::Admin,
            "Announcement updated",
            message,
        ))
        .await
    }

    pub async fn delete_announcement(
        &self,
        id: &str,
        confirmation: Confirmation,
    ) -> Result<Rendered<AdminView>, AppError> {
        if confirmation == Confirmation::Declined {
            return self.declined().await;
        }

        self.storage
            .shared()
            .update::<Announcement, _, _>(|list| {
                remove_by_id(list, id, |a| &a.id, "Announcement")
            })
            .await?;
        tracing::info!("Deleted announcement {}", id);

        self.rendered(Notification::success(
            Surface::Admin,
            "Announcement deleted",
            "The announcement was removed",
        ))
        .await
    }

    /// Add a news item at the top of the feed.
    pub async fn create_news(
        &self,
        request: &CreateNewsRequest,
    ) -> Result<Rendered<AdminView>, AppError> {
        let record =
            validate_news(request)?.into_record(uuid::Uuid::new_v4().to_string(), Utc::now());
        let id = record.id.clone();

        self.storage
            .shared()
            .update::<NewsItem, _, _>(|list| {
                list.insert(0, record);
                Ok(())
            })
            .await?;
        tracing::info!("Created news item {}", id);

        self.rendered(Notification::success(
            Surface::Admin,
            "News published",
            "The news item was added to the feed",
        ))
        .await
    }

    pub async fn delete_news(
        &self,
        id: &str,
        confirmation: Confirmation,
    ) -> Result<Rendered<AdminView>, AppError> {
        if confirmation == Confirmation::Declined {
            return self.declined().await;
        }

        self.storage
            .shared()
            .update::<NewsItem, _, _>(|list| remove_by_id(list, id, |n| &n.id, "News item"))
            .await?;
        tracing::info!("Deleted news item {}", id);

        self.rendered(Notification::success(
            Surface::Admin,
            "News deleted",
            "The news item was removed",
        ))
        .await
    }

    /// Add a custom game. The first custom game replaces the built-in catalog.
    pub async fn create_game(
        &self,
        request: &CreateGameRequest,
    ) -> Result<Rendered<AdminView>, AppError> {
        let record = validate_game(request)?.into_record(uuid::Uuid::new_v4().to_string());
        let name = record.name.clone();

        self.storage
            .shared()
            .update::<Game, _, _>(|list| {
                list.push(record);
                Ok(())
            })
            .await?;
        tracing::info!("Added game '{}'", name);

        self.rendered(Notification::success(
            Surface::Admin,
            "Game added",
            format!("{} is now in the catalog", name),
        ))
        .await
    }

    /// Delete a custom game. Built-in entries are not stored and cannot be deleted.
    pub async fn delete_game(
        &self,
        id: &str,
        confirmation: Confirmation,
    ) -> Result<Rendered<AdminView>, AppError> {
        if confirmation == Confirmation::Declined {
            return self.declined().await;
        }

        self.storage
            .shared()
            .update::<Game, _, _>(|list| {
                if list.is_empty() && id.starts_with(crate::models::BUILTIN_ID_PREFIX) {
                    return Err(AppError::BadRequest(
                        "Built-in games cannot be deleted; add a custom game to replace the catalog"
                            .to_string(),
                    ));
                }
                remove_by_id(list, id, |g| &g.id, "Game")
            })
            .await?;
        tracing::info!("Deleted game {}", id);

        self.rendered(Notification::success(
            Surface::Admin,
            "Game deleted",
            "The game was removed from the catalog",
        ))
        .await
    }

    /// Validate the token form and overwrite the snapshot.
    pub async fn save_token(
        &self,
        request: &SaveTokenRequest,
    ) -> Result<Rendered<AdminView>, AppError> {
        let snapshot = validate_token(request)?.into_record(Utc::now());

        self.storage.shared().set_scalar(&snapshot).await?;
        tracing::info!(
            usd_price = snapshot.usd_price,
            change_24h = snapshot.change_24h,
            "Saved token snapshot"
        );

        self.rendered(Notification::success(
            Surface::Admin,
            "Token price saved",
            "The new price is shown in the catalog",
        ))
        .await
    }

    /// Fill the token form from the price source. Nothing is persisted; the
    /// admin still has to save the form.
    pub async fn fetch_quote(
        &self,
        source: &dyn PriceSource,
    ) -> Result<Rendered<TokenForm>, AppError> {
        let current = self.token_form().await?;

        match source.fetch_quote().await {
            Ok(Some(quote)) => {
                let form = TokenForm {
                    usd_price: quote.usd_price.to_string(),
                    change_24h: quote.change_24h.to_string(),
                    usd_to_rub_rate: current.usd_to_rub_rate,
                };
                Ok(Rendered::new(
                    form,
                    Notification::success(
                        Surface::Admin,
                        "Price fetched",
                        "Review the values and press Save",
                    ),
                ))
            }
            Ok(None) => Ok(Rendered::new(
                current,
                Notification::warning(
                    Surface::Admin,
                    "No price data",
                    "The price source returned no trading pairs; the form was left unchanged",
                ),
            )),
            Err(e) => {
                tracing::warn!("Price fetch failed: {}", e);
                Err(e.into())
            }
        }
    }

    async fn token_form(&self) -> Result<TokenForm, AppError> {
        let token = self.storage.shared().get_scalar::<TokenSnapshot>().await?;
        Ok(token_form(token.as_ref(), self.default_rub_rate))
    }

    async fn rendered(&self, notification: Notification) -> Result<Rendered<AdminView>, AppError> {
        Ok(Rendered::new(self.render().await?, notification))
    }

    async fn declined(&self) -> Result<Rendered<AdminView>, AppError> {
        self.rendered(Notification::info(
            Surface::Admin,
            "Deletion cancelled",
            "Nothing was deleted",
        ))
        .await
    }
}

/// Project store records into the admin view.
pub fn project(
    announcements: &[Announcement],
    news: &[NewsItem],
    games: &[Game],
    token: Option<&TokenSnapshot>,
    review_count: usize,
    default_rub_rate: f64,
) -> AdminView {
    AdminView {
        announcements: announcements
            .iter()
            .map(|a| AnnouncementRow {
                id: a.id.clone(),
                text: a.text.clone(),
                kind: a.kind,
                active: a.active,
                created_at: format_date(&a.created_at),
            })
            .collect(),
        news: news
            .iter()
            .map(|n| NewsRow {
                id: n.id.clone(),
                title: n.title.clone(),
                content: n.content.clone(),
                kind: n.kind,
                date: format_date(&n.date),
            })
            .collect(),
        games: games
            .iter()
            .map(|g| GameRow {
                id: g.id.clone(),
                name: g.name.clone(),
                tag: g.tag.clone(),
                description: g.description.clone(),
                image: g.image.clone(),
                url: g.url.clone(),
                builtin: g.is_builtin(),
            })
            .collect(),
        token_form: token_form(token, default_rub_rate),
        token: token.map(token_display),
        counts: AdminCounts {
            announcements: announcements.len(),
            active_announcements: announcements.iter().filter(|a| a.active).count(),
            news: news.len(),
            games: games.len(),
            reviews: review_count,
        },
    }
}

fn token_form(token: Option<&TokenSnapshot>, default_rub_rate: f64) -> TokenForm {
    match token {
        Some(t) => TokenForm {
            usd_price: t.usd_price.to_string(),
            change_24h: t.change_24h.to_string(),
            usd_to_rub_rate: t.usd_to_rub_rate.to_string(),
        },
        None => TokenForm {
            usd_price: String::new(),
            change_24h: String::new(),
            usd_to_rub_rate: default_rub_rate.to_string(),
        },
    }
}

fn remove_by_id<T>(
    list: &mut Vec<T>,
    id: &str,
    id_of: impl Fn(&T) -> &String,
    what: &str,
) -> Result<(), AppError> {
    let before = list.len();
    list.retain(|item| id_of(item) != id);
    if list.len() == before {
        return Err(AppError::NotFound(format!("{} {} not found", what, id)));
    }
    Ok(())
}
