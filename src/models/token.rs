//! Token price snapshot model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single displayed token price. Saving overwrites the previous snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenSnapshot {
    pub usd_price: f64,
    pub change_24h: f64,
    pub usd_to_rub_rate: f64,
    pub last_updated: DateTime<Utc>,
}

impl TokenSnapshot {
    pub fn rub_price(&self) -> f64 {
        self.usd_price * self.usd_to_rub_rate
    }
}

/// A form field that may arrive either as a JSON number or as the raw text typed
/// into an input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum NumericField {
    Number(f64),
    Text(String),
}

impl NumericField {
    /// Returns the value only when it is a finite number.
    pub fn parse(&self) -> Option<f64> {
        let value = match self {
            NumericField::Number(n) => *n,
            NumericField::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for NumericField {
    fn from(value: f64) -> Self {
        NumericField::Number(value)
    }
}

impl From<&str> for NumericField {
    fn from(value: &str) -> Self {
        NumericField::Text(value.to_string())
    }
}

/// Request body for saving the token snapshot from the admin form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveTokenRequest {
    pub usd_price: NumericField,
    pub change_24h: NumericField,
    pub usd_to_rub_rate: NumericField,
}

/// A price quote returned by the external price source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub usd_price: f64,
    pub change_24h: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_field_accepts_numbers_and_text() {
        assert_eq!(NumericField::from(95.2).parse(), Some(95.2));
        assert_eq!(NumericField::from(" -3.5 ").parse(), Some(-3.5));
        assert_eq!(NumericField::from("0.00001234").parse(), Some(0.00001234));
    }

    #[test]
    fn numeric_field_rejects_garbage_and_non_finite() {
        assert_eq!(NumericField::from("abc").parse(), None);
        assert_eq!(NumericField::from("").parse(), None);
        assert_eq!(NumericField::from("NaN").parse(), None);
        assert_eq!(NumericField::from("inf").parse(), None);
        assert_eq!(NumericField::Number(f64::NAN).parse(), None);
    }

    #[test]
    fn save_request_accepts_mixed_field_shapes() {
        let request: SaveTokenRequest = serde_json::from_str(
            r#"{"usdPrice": "0.00001234", "change24h": -3.5, "usdToRubRate": "95.2"}"#,
        )
        .unwrap();
        assert_eq!(request.usd_price.parse(), Some(0.00001234));
        assert_eq!(request.change_24h.parse(), Some(-3.5));
        assert_eq!(request.usd_to_rub_rate.parse(), Some(95.2));
    }
}
