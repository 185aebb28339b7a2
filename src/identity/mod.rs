//! Host bridge: the optional Telegram identity of the current viewer.
//!
//! The mini-app forwards Telegram's WebApp init data in the
//! `X-Telegram-Init-Data` header. When a bot token is configured the data must
//! carry a valid HMAC-SHA256 signature and be at most a day old; without a bot
//! token the user is read unverified (development mode). Anything else yields
//! [`HostBridge::Absent`] and a fallback identity used for display only.

use std::collections::HashMap;

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::db::ANONYMOUS_CLIENT;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the raw WebApp init data.
pub const INIT_DATA_HEADER: &str = "x-telegram-init-data";

/// Header carrying a client-generated id for viewers without a host identity.
pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// Prefix of client ids derived from a host user. Header ids may not use it.
pub const HOST_CLIENT_PREFIX: &str = "tg-";

/// Maximum accepted age of signed init data, in seconds.
pub const MAX_INIT_DATA_AGE_SECS: i64 = 86_400;

/// Why init data was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitDataError {
    #[error("missing hash parameter")]
    MissingHash,
    #[error("invalid hash, data may be tampered")]
    BadSignature,
    #[error("init data is too old ({0} seconds)")]
    Expired(i64),
    #[error("missing user parameter")]
    MissingUser,
    #[error("invalid user JSON: {0}")]
    InvalidUser(String),
}

/// The Telegram user exposed by the host platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostUser {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// Capability of the host platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostBridge {
    Present(HostUser),
    Absent,
}

/// Identity as shown in the catalog header.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub display_name: String,
    pub username: String,
    pub initials: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// False when the fallback identity is shown
    pub from_host: bool,
}

impl HostBridge {
    /// Build the bridge from raw init data.
    pub fn from_init_data(init_data: Option<&str>, bot_token: Option<&str>) -> Self {
        let Some(init_data) = init_data.filter(|d| !d.is_empty()) else {
            return HostBridge::Absent;
        };

        let result = match bot_token {
            Some(token) => validate_init_data(init_data, token, chrono::Utc::now().timestamp()),
            None => parse_user_unverified(init_data),
        };

        match result {
            Ok(user) => HostBridge::Present(user),
            Err(e) => {
                tracing::warn!("Ignoring Telegram init data: {}", e);
                HostBridge::Absent
            }
        }
    }

    pub fn user(&self) -> Option<&HostUser> {
        match self {
            HostBridge::Present(user) => Some(user),
            HostBridge::Absent => None,
        }
    }

    pub fn profile(&self) -> Profile {
        match self {
            HostBridge::Present(user) => {
                let display_name = match &user.last_name {
                    Some(last) if !last.is_empty() => format!("{} {}", user.first_name, last),
                    _ => user.first_name.clone(),
                };
                let username = match &user.username {
                    Some(name) => format!("@{}", name),
                    None => format!("id{}", user.id),
                };
                Profile {
                    initials: initials(&display_name),
                    display_name,
                    username,
                    avatar_url: user.photo_url.clone(),
                    from_host: true,
                }
            }
            HostBridge::Absent => Profile {
                display_name: "Guest".to_string(),
                username: "@guest".to_string(),
                initials: "G".to_string(),
                avatar_url: None,
                from_host: false,
            },
        }
    }

    /// Author name and user id recorded on a review. Without a host identity
    /// the review is anonymous; the display fallback is never persisted.
    pub fn review_author(&self) -> (String, Option<String>) {
        match self {
            HostBridge::Present(_) => {
                let profile = self.profile();
                let user_id = self.user().map(|u| u.id.to_string());
                (profile.display_name, user_id)
            }
            HostBridge::Absent => ("Anonymous".to_string(), None),
        }
    }
}

/// The caller of a catalog request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    /// Namespace of the caller's private values
    pub client_id: String,
    pub bridge: HostBridge,
}

impl Viewer {
    pub fn from_headers(headers: &HeaderMap, bot_token: Option<&str>) -> Self {
        let init_data = headers.get(INIT_DATA_HEADER).and_then(|v| v.to_str().ok());
        let bridge = HostBridge::from_init_data(init_data, bot_token);

        let client_id = match bridge.user() {
            Some(user) => format!("{}{}", HOST_CLIENT_PREFIX, user.id),
            None => headers
                .get(CLIENT_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(header_client_id)
                .unwrap_or_else(|| ANONYMOUS_CLIENT.to_string()),
        };

        Self { client_id, bridge }
    }

    /// Whether the caller fell back to the namespace shared by every caller
    /// without an id.
    pub fn is_anonymous(&self) -> bool {
        self.client_id == ANONYMOUS_CLIENT
    }
}

fn header_client_id(raw: &str) -> Option<String> {
    let id = raw.trim();
    if id.is_empty() || id.len() > 128 {
        return None;
    }
    if id.starts_with(HOST_CLIENT_PREFIX) {
        tracing::warn!("Ignoring client id {:?}: reserved for host users", id);
        return None;
    }
    Some(id.to_string())
}

/// Telegram share link for a URL.
pub fn share_link(url: &str, text: &str) -> String {
    format!(
        "https://t.me/share/url?url={}&text={}",
        urlencoding::encode(url),
        urlencoding::encode(text)
    )
}

/// Verify signed init data and return its user.
pub fn validate_init_data(
    init_data: &str,
    bot_token: &str,
    now: i64,
) -> Result<HostUser, InitDataError> {
    let params = parse_query(init_data);

    let received_hash = params.get("hash").ok_or(InitDataError::MissingHash)?;
    let calculated_hash = signature(&params, bot_token);
    if !bool::from(calculated_hash.as_bytes().ct_eq(received_hash.as_bytes())) {
        return Err(InitDataError::BadSignature);
    }

    if let Some(auth_date) = params.get("auth_date").and_then(|s| s.parse::<i64>().ok()) {
        let age = now - auth_date;
        if age > MAX_INIT_DATA_AGE_SECS {
            return Err(InitDataError::Expired(age));
        }
    }

    user_from_params(&params)
}

/// Read the user without checking the signature.
pub fn parse_user_unverified(init_data: &str) -> Result<HostUser, InitDataError> {
    user_from_params(&parse_query(init_data))
}

fn parse_query(init_data: &str) -> HashMap<String, String> {
    init_data
        .split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let decoded = urlencoding::decode(value).ok()?;
            Some((key.to_string(), decoded.into_owned()))
        })
        .collect()
}

/// Hex HMAC over the sorted `key=value` lines, keyed by
/// `HMAC_SHA256("WebAppData", bot_token)`.
fn signature(params: &HashMap<String, String>, bot_token: &str) -> String {
    let mut pairs: Vec<String> = params
        .iter()
        .filter(|(key, _)| key.as_str() != "hash")
        .map(|(key, value)| format!("{}={}", key, value))
        .collect();
    pairs.sort();
    let data_check_string = pairs.join("\n");

    let mut secret_mac =
        HmacSha256::new_from_slice(b"WebAppData").expect("HMAC can take key of any size");
    secret_mac.update(bot_token.as_bytes());
    let secret_key = secret_mac.finalize().into_bytes();

    let mut mac = HmacSha256::new_from_slice(&secret_key).expect("HMAC can take key of any size");
    mac.update(data_check_string.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn user_from_params(params: &HashMap<String, String>) -> Result<HostUser, InitDataError> {
    let user_json = params.get("user").ok_or(InitDataError::MissingUser)?;
    serde_json::from_str(user_json).map_err(|e| InitDataError::InvalidUser(e.to_string()))
}

fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|part| part.chars().next())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect()
}
