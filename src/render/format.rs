//! Display formatting shared by both renderers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::TokenSnapshot;

/// Direction of a price change, used for styling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChangeDisplay {
    pub text: String,
    pub trend: Trend,
}

/// Token price as shown in the ticker and the admin preview.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenDisplay {
    pub usd_price: String,
    pub rub_price: String,
    pub change_24h: ChangeDisplay,
    pub last_updated: String,
    /// Unformatted RUB price for charts
    pub rub_value: f64,
}

pub fn format_usd(price: f64) -> String {
    format!("${:.6}", price)
}

pub fn format_rub(price: f64) -> String {
    format!("₽{:.6}", price)
}

pub fn format_change(change: f64) -> ChangeDisplay {
    if change > 0.0 {
        ChangeDisplay {
            text: format!("+{:.2}%", change),
            trend: Trend::Up,
        }
    } else if change < 0.0 {
        ChangeDisplay {
            text: format!("{:.2}%", change),
            trend: Trend::Down,
        }
    } else {
        ChangeDisplay {
            text: "0.00%".to_string(),
            trend: Trend::Flat,
        }
    }
}

pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%d.%m.%Y %H:%M").to_string()
}

pub fn token_display(snapshot: &TokenSnapshot) -> TokenDisplay {
    let rub = snapshot.rub_price();
    TokenDisplay {
        usd_price: format_usd(snapshot.usd_price),
        rub_price: format_rub(rub),
        change_24h: format_change(snapshot.change_24h),
        last_updated: format_date(&snapshot.last_updated),
        rub_value: rub,
    }
}

/// Star string for a 1–5 rating, e.g. `★★★☆☆`.
pub fn stars(rating: u8) -> String {
    let filled = usize::from(rating.min(5));
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}
