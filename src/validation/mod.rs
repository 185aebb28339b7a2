//! Record validators.
//!
//! Every create/update path runs its candidate fields through one of these
//! functions before touching the store. They are pure: candidate in, validated
//! fields or a [`ValidationError`] out. Ids and timestamps are assigned by the
//! caller once validation has passed.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    Announcement, AnnouncementKind, CreateAnnouncementRequest, CreateGameRequest,
    CreateNewsRequest, Game, NewsItem, NewsKind, Review, SaveTokenRequest, SubmitReviewRequest,
    TokenSnapshot, MIN_REVIEW_LENGTH,
};

/// A user-correctable input problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("empty text")]
    EmptyText,
    #[error("{0} is required")]
    EmptyField(&'static str),
    #[error("{0} must be a valid number")]
    InvalidNumber(&'static str),
    #[error("{0} must be an absolute http(s) URL")]
    InvalidUrl(&'static str),
    #[error("no rating")]
    NoRating,
    #[error("rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(u8),
    #[error("too short: at least {min} characters required, got {actual}")]
    TooShort { min: usize, actual: usize },
    #[error("unknown game {0}")]
    UnknownGame(String),
}

/// Announcement fields that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidAnnouncement {
    pub text: String,
    pub kind: AnnouncementKind,
    pub active: bool,
}

impl ValidAnnouncement {
    pub fn into_record(self, id: String, created_at: DateTime<Utc>) -> Announcement {
        Announcement {
            id,
            text: self.text,
            kind: self.kind,
            active: self.active,
            created_at,
        }
    }
}

/// News fields that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidNews {
    pub title: String,
    pub content: String,
    pub kind: NewsKind,
}

impl ValidNews {
    pub fn into_record(self, id: String, date: DateTime<Utc>) -> NewsItem {
        NewsItem {
            id,
            title: self.title,
            content: self.content,
            kind: self.kind,
            date,
        }
    }
}

/// Game fields that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidGame {
    pub name: String,
    pub tag: Option<String>,
    pub description: String,
    pub image: String,
    pub url: String,
}

impl ValidGame {
    pub fn into_record(self, id: String) -> Game {
        Game {
            id,
            name: self.name,
            tag: self.tag,
            description: self.description,
            image: self.image,
            url: self.url,
        }
    }
}

/// Token fields that parsed as finite numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidToken {
    pub usd_price: f64,
    pub change_24h: f64,
    pub usd_to_rub_rate: f64,
}

impl ValidToken {
    pub fn into_record(self, last_updated: DateTime<Utc>) -> TokenSnapshot {
        TokenSnapshot {
            usd_price: self.usd_price,
            change_24h: self.change_24h,
            usd_to_rub_rate: self.usd_to_rub_rate,
            last_updated,
        }
    }
}

/// Review fields that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidReview {
    pub game_id: String,
    pub rating: u8,
    pub text: String,
}

impl ValidReview {
    pub fn into_record(
        self,
        id: String,
        author: String,
        user_id: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Review {
        Review {
            id,
            game_id: self.game_id,
            rating: self.rating,
            text: self.text,
            author,
            timestamp,
            user_id,
        }
    }
}

pub fn validate_announcement(
    request: &CreateAnnouncementRequest,
) -> Result<ValidAnnouncement, ValidationError> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(ValidationError::EmptyText);
    }

    Ok(ValidAnnouncement {
        text: text.to_string(),
        kind: request.kind.unwrap_or_default(),
        active: request.active,
    })
}

pub fn validate_news(request: &CreateNewsRequest) -> Result<ValidNews, ValidationError> {
    Ok(ValidNews {
        title: required("title", &request.title)?,
        content: required("content", &request.content)?,
        kind: request.kind.unwrap_or_default(),
    })
}

pub fn validate_game(request: &CreateGameRequest) -> Result<ValidGame, ValidationError> {
    let name = required("name", &request.name)?;
    let description = required("description", &request.description)?;
    let image = required("image", &request.image)?;
    let url = required("url", &request.url)?;
    check_url("image", &image)?;
    check_url("url", &url)?;

    let tag = request
        .tag
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    Ok(ValidGame {
        name,
        tag,
        description,
        image,
        url,
    })
}

pub fn validate_token(request: &SaveTokenRequest) -> Result<ValidToken, ValidationError> {
    let usd_price = request
        .usd_price
        .parse()
        .ok_or(ValidationError::InvalidNumber("usdPrice"))?;
    let change_24h = request
        .change_24h
        .parse()
        .ok_or(ValidationError::InvalidNumber("change24h"))?;
    let usd_to_rub_rate = request
        .usd_to_rub_rate
        .parse()
        .ok_or(ValidationError::InvalidNumber("usdToRubRate"))?;

    Ok(ValidToken {
        usd_price,
        change_24h,
        usd_to_rub_rate,
    })
}

/// A single star click. Zero means nothing was selected.
pub fn validate_rating(rating: u8) -> Result<u8, ValidationError> {
    match rating {
        0 => Err(ValidationError::NoRating),
        1..=5 => Ok(rating),
        other => Err(ValidationError::RatingOutOfRange(other)),
    }
}

/// Validate a review against the games currently in the catalog.
pub fn validate_review(
    request: &SubmitReviewRequest,
    games: &[Game],
) -> Result<ValidReview, ValidationError> {
    let rating = validate_rating(request.rating)?;

    let text = request.text.trim();
    let length = text.chars().count();
    if length < MIN_REVIEW_LENGTH {
        return Err(ValidationError::TooShort {
            min: MIN_REVIEW_LENGTH,
            actual: length,
        });
    }

    if !games.iter().any(|g| g.id == request.game_id) {
        return Err(ValidationError::UnknownGame(request.game_id.clone()));
    }

    Ok(ValidReview {
        game_id: request.game_id.clone(),
        rating,
        text: text.to_string(),
    })
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(trimmed.to_string())
}

fn check_url(field: &'static str, value: &str) -> Result<(), ValidationError> {
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(ValidationError::InvalidUrl(field)),
    }
}
