//! Upgrades for values written by the browser-only mini-app (schema version 0).
//!
//! Browser storage held untyped JSON: ids were `Date.now()` numbers, timestamps
//! were either epoch milliseconds or ISO strings, and form numbers were often
//! stored as text. Version 1 is the typed layout of [`crate::models`].

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::StoreKey;

/// Schema version of values that predate versioning.
pub const LEGACY_VERSION: i64 = 0;

pub(crate) fn upgrade(key: StoreKey, value: Value, from_version: i64) -> Result<Value, String> {
    if from_version != LEGACY_VERSION {
        return Err(format!(
            "no upgrade path from schema version {} for '{}'",
            from_version,
            key.as_str()
        ));
    }

    match key {
        StoreKey::Announcements => with_object(value, |obj| {
            stringify(obj, "id");
            default_field(obj, "type", Value::from("info"));
            default_field(obj, "active", Value::Bool(true));
            timestamp(obj, "createdAt")
        }),
        StoreKey::News => with_object(value, |obj| {
            stringify(obj, "id");
            default_field(obj, "type", Value::from("update"));
            timestamp(obj, "date")
        }),
        StoreKey::Games => with_object(value, |obj| {
            stringify(obj, "id");
            if obj.get("tag").and_then(Value::as_str) == Some("") {
                obj.remove("tag");
            }
            Ok(())
        }),
        StoreKey::UserReviews => with_object(value, |obj| {
            if !obj.contains_key("id") {
                obj.insert("id".into(), Value::from(uuid::Uuid::new_v4().to_string()));
            }
            stringify(obj, "id");
            stringify(obj, "gameId");
            stringify(obj, "userId");
            integer(obj, "rating")?;
            timestamp(obj, "timestamp")
        }),
        StoreKey::TokenData => with_object(value, |obj| {
            number(obj, "usdPrice")?;
            number(obj, "change24h")?;
            number(obj, "usdToRubRate")?;
            if !obj.contains_key("lastUpdated") {
                obj.insert("lastUpdated".into(), Value::from(Utc::now().to_rfc3339()));
            }
            timestamp(obj, "lastUpdated")
        }),
        StoreKey::GameRatings => with_object(value, |obj| {
            for rating in obj.values_mut() {
                if let Some(n) = rating.as_str().and_then(|s| s.trim().parse::<u8>().ok()) {
                    *rating = Value::from(n);
                }
            }
            Ok(())
        }),
        StoreKey::UserStats => with_object(value, |_| Ok(())),
        StoreKey::Theme => Ok(value),
        StoreKey::AnnouncementClosed => match value {
            Value::String(s) => Ok(Value::Bool(s == "true")),
            other => Ok(other),
        },
    }
}

fn with_object(
    value: Value,
    f: impl FnOnce(&mut Map<String, Value>) -> Result<(), String>,
) -> Result<Value, String> {
    match value {
        Value::Object(mut obj) => {
            f(&mut obj)?;
            Ok(Value::Object(obj))
        }
        other => Err(format!("expected an object, found {}", other)),
    }
}

fn default_field(obj: &mut Map<String, Value>, field: &str, default: Value) {
    obj.entry(field).or_insert(default);
}

fn stringify(obj: &mut Map<String, Value>, field: &str) {
    if let Some(Value::Number(n)) = obj.get(field) {
        let s = n.to_string();
        obj.insert(field.to_string(), Value::String(s));
    }
}

fn number(obj: &mut Map<String, Value>, field: &str) -> Result<(), String> {
    if let Some(Value::String(s)) = obj.get(field) {
        let parsed: f64 = s
            .trim()
            .parse()
            .map_err(|_| format!("{} is not a number: {:?}", field, s))?;
        obj.insert(field.to_string(), Value::from(parsed));
    }
    Ok(())
}

fn integer(obj: &mut Map<String, Value>, field: &str) -> Result<(), String> {
    if let Some(Value::String(s)) = obj.get(field) {
        let parsed: u64 = s
            .trim()
            .parse()
            .map_err(|_| format!("{} is not an integer: {:?}", field, s))?;
        obj.insert(field.to_string(), Value::from(parsed));
    }
    Ok(())
}

/// Normalize epoch milliseconds or an ISO string to RFC 3339.
fn timestamp(obj: &mut Map<String, Value>, field: &str) -> Result<(), String> {
    let normalized = match obj.get(field) {
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .ok_or_else(|| format!("{} is not a valid epoch timestamp", field))?,
        Some(Value::String(s)) => parse_timestamp(s)
            .ok_or_else(|| format!("{} is not a recognizable date: {:?}", field, s))?,
        Some(other) => return Err(format!("{} has unexpected value {}", field, other)),
        None => return Err(format!("missing {}", field)),
    };
    obj.insert(field.to_string(), Value::from(normalized.to_rfc3339()));
    Ok(())
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    s.trim()
        .parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
}
