//! External price quote source.
//!
//! The core only consumes `Result<Option<PriceQuote>, FetchError>`: `Ok(None)`
//! means the source answered but had no trading pair for the query term.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::errors::AppError;
use crate::models::PriceQuote;

/// Why a quote could not be obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("price request failed: {0}")]
    Transport(String),
    #[error("price API returned status {0}")]
    Status(u16),
    #[error("invalid price API response: {0}")]
    Decode(String),
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        AppError::FetchFailed(err.to_string())
    }
}

/// Anything that can produce a token price quote.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_quote(&self) -> Result<Option<PriceQuote>, FetchError>;
}

/// DexScreener-style search API: `GET {api_url}?q={query}`.
pub struct DexScreenerSource {
    client: reqwest::Client,
    api_url: String,
    query: String,
}

impl DexScreenerSource {
    pub fn new(api_url: &str, query: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_url: api_url.to_string(),
            query: query.to_string(),
        })
    }
}

#[async_trait]
impl PriceSource for DexScreenerSource {
    async fn fetch_quote(&self) -> Result<Option<PriceQuote>, FetchError> {
        tracing::debug!("Fetching price quote for '{}'", self.query);

        let response = self
            .client
            .get(&self.api_url)
            .query(&[("q", self.query.as_str())])
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        quote_from_response(body)
    }
}

/// Search response body. Only the fields the quote needs are read.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub pairs: Option<Vec<Pair>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pair {
    #[serde(default)]
    pub price_usd: Option<String>,
    #[serde(default)]
    pub price_change: Option<PriceChange>,
}

#[derive(Debug, Deserialize)]
pub struct PriceChange {
    #[serde(default)]
    pub h24: Option<f64>,
}

/// Take the first pair that reports a USD price.
pub fn quote_from_response(body: SearchResponse) -> Result<Option<PriceQuote>, FetchError> {
    let Some(pair) = body
        .pairs
        .unwrap_or_default()
        .into_iter()
        .find(|p| p.price_usd.is_some())
    else {
        return Ok(None);
    };

    let raw_price = pair.price_usd.unwrap_or_default();
    let usd_price = raw_price
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .ok_or_else(|| FetchError::Decode(format!("priceUsd is not a number: {:?}", raw_price)))?;
    let change_24h = pair.price_change.and_then(|c| c.h24).unwrap_or(0.0);

    Ok(Some(PriceQuote {
        usd_price,
        change_24h,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<Option<PriceQuote>, FetchError> {
        quote_from_response(serde_json::from_str(body).unwrap())
    }

    #[test]
    fn test_first_priced_pair_wins() {
        let quote = parse(
            r#"{"pairs": [
                {"chainId": "ton"},
                {"priceUsd": "0.00001234", "priceChange": {"h1": 0.1, "h24": -3.5}},
                {"priceUsd": "1.0"}
            ]}"#,
        )
        .unwrap()
        .unwrap();

        assert_eq!(quote.usd_price, 0.00001234);
        assert_eq!(quote.change_24h, -3.5);
    }

    #[test]
    fn test_missing_change_defaults_to_zero() {
        let quote = parse(r#"{"pairs": [{"priceUsd": "2.5"}]}"#).unwrap().unwrap();
        assert_eq!(quote.change_24h, 0.0);
    }

    #[test]
    fn test_no_pairs_is_none() {
        assert_eq!(parse(r#"{"pairs": []}"#), Ok(None));
        assert_eq!(parse(r#"{"pairs": null}"#), Ok(None));
        assert_eq!(parse(r#"{}"#), Ok(None));
    }

    #[test]
    fn test_bad_price_is_decode_error() {
        let err = parse(r#"{"pairs": [{"priceUsd": "n/a"}]}"#).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn test_fetch_error_maps_to_fetch_failed() {
        let err: AppError = FetchError::Status(503).into();
        assert_eq!(err.error_code(), "FETCH_FAILED");
    }
}
