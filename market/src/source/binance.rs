//! Binance spot klines.
//!
//! Rows are `[open_time, open, high, low, close, volume, close_time, ..]`
//! with prices as strings. Symbols drop the `_` separator used in config
//! (`BTC_USDT` → `BTCUSDT`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};

use super::errors::SourceError;
use super::interval::Interval;
use super::parse::{as_f64, as_ts_ms, check_status, normalize};
use super::{PriceSource, http_client};
use crate::types::PriceSample;

pub const BINANCE_SPOT_BASE: &str = "https://api.binance.com";

/// Maximum klines per request (Binance limit is 1000).
const MAX_KLINES_PER_REQUEST: usize = 1_000;

/// Binance error code for an unknown symbol.
const INVALID_SYMBOL: i64 = -1121;

#[derive(Clone)]
pub struct BinanceSpotSource {
    http: Client,
    base_url: String,
    interval: Interval,
}

impl BinanceSpotSource {
    pub fn new(
        base_url: impl Into<String>,
        interval: Interval,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            interval,
        })
    }

    pub fn venue_symbol(symbol: &str) -> String {
        symbol
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | '/'))
            .collect::<String>()
            .to_ascii_uppercase()
    }
}

#[async_trait]
impl PriceSource for BinanceSpotSource {
    #[instrument(skip(self), fields(venue = "binance"), level = "debug")]
    async fn fetch_klines(&self, symbol: &str, limit: usize) -> Result<Vec<PriceSample>, SourceError> {
        let venue_symbol = Self::venue_symbol(symbol);
        let url = format!("{}/api/v3/klines", self.base_url);
        let limit = limit.clamp(1, MAX_KLINES_PER_REQUEST);

        let resp = self
            .http
            .get(&url)
            .query(&[
                ("symbol", venue_symbol.clone()),
                ("interval", self.interval.binance_str().to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?;

        let resp = check_status(&venue_symbol, resp)
            .await
            .map_err(|e| unknown_symbol_as_not_found(&venue_symbol, e))?;
        let body: Value = resp.json().await?;

        let samples = parse_kline_body(&venue_symbol, body, limit)?;

        debug!(count = samples.len(), "binance klines fetched");
        Ok(samples)
    }

    fn name(&self) -> &str {
        "binance"
    }
}

/// Binance answers an unknown symbol with 400 and code -1121, not 404.
fn unknown_symbol_as_not_found(venue_symbol: &str, err: SourceError) -> SourceError {
    match err {
        SourceError::Status { status: 400, ref body } if is_invalid_symbol(body) => {
            SourceError::NotFound(venue_symbol.to_string())
        }
        other => other,
    }
}

fn is_invalid_symbol(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("code").and_then(Value::as_i64))
        == Some(INVALID_SYMBOL)
}

pub(crate) fn parse_kline_body(
    symbol: &str,
    body: Value,
    limit: usize,
) -> Result<Vec<PriceSample>, SourceError> {
    let rows = match body {
        Value::Array(rows) => rows,
        Value::Object(obj) => {
            let code = obj.get("code").and_then(Value::as_i64).unwrap_or(-1);
            let message = obj
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Err(SourceError::Venue { code, message });
        }
        _ => {
            return Err(SourceError::Parse(format!(
                "unexpected kline payload for {symbol}"
            )));
        }
    };

    let samples = rows
        .iter()
        .filter_map(|row| {
            let row = row.as_array()?;
            if row.len() < 5 {
                return None;
            }
            Some(PriceSample::new(as_ts_ms(&row[0])?, as_f64(&row[4])?))
        })
        .collect();

    Ok(normalize(samples, limit))
}
