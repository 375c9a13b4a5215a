//! MEXC futures (contract) klines.
//!
//! The venue has been seen returning three shapes for the same endpoint:
//! - `{"success":true,"data":{"time":[..],"close":[..],..}}`   (columns)
//! - `{"data":[{"t":..,"c":".."}, ..]}`                          (objects)
//! - `[[time, open, high, low, close, volume], ..]`              (rows)
//!
//! All three reduce to `(ts_ms, close)`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use super::errors::SourceError;
use super::interval::Interval;
use super::parse::{as_f64, as_ts_ms, check_status, normalize};
use super::{PriceSource, http_client};
use crate::types::PriceSample;

pub const MEXC_CONTRACT_BASE: &str = "https://contract.mexc.com";

#[derive(Clone)]
pub struct MexcFuturesSource {
    http: Client,
    base_url: String,
    interval: Interval,
}

impl MexcFuturesSource {
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

    /// MEXC futures symbols are already `BASE_QUOTE`.
    pub fn venue_symbol(symbol: &str) -> String {
        symbol.trim().to_ascii_uppercase()
    }
}

#[async_trait]
impl PriceSource for MexcFuturesSource {
    #[instrument(skip(self), fields(venue = "mexc"), level = "debug")]
    async fn fetch_klines(&self, symbol: &str, limit: usize) -> Result<Vec<PriceSample>, SourceError> {
        let venue_symbol = Self::venue_symbol(symbol);
        let url = format!("{}/api/v1/contract/kline/{}", self.base_url, venue_symbol);

        let resp = self
            .http
            .get(&url)
            .query(&[
                ("interval", self.interval.mexc_str().to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?;
        let resp = check_status(&venue_symbol, resp).await?;
        let body: Value = resp.json().await?;

        let samples = parse_kline_body(&venue_symbol, body, limit)?;

        debug!(count = samples.len(), "mexc klines fetched");
        Ok(samples)
    }

    fn name(&self) -> &str {
        "mexc"
    }
}

pub(crate) fn parse_kline_body(
    symbol: &str,
    body: Value,
    limit: usize,
) -> Result<Vec<PriceSample>, SourceError> {
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        let code = body.get("code").and_then(Value::as_i64).unwrap_or(-1);
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(SourceError::Venue { code, message });
    }

    let data = match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(d) => d,
            None => Value::Object(map),
        },
        other => other,
    };

    let samples = match &data {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().filter_map(parse_item).collect(),
        Value::Object(cols) if cols.contains_key("time") => parse_columns(symbol, cols)?,
        _ => {
            return Err(SourceError::Parse(format!(
                "unexpected kline payload for {symbol}"
            )));
        }
    };

    Ok(normalize(samples, limit))
}

/// One row, either `{"t":..,"c":..}` / `{"time":..,"close":..}` or
/// `[time, open, high, low, close, ..]`.
fn parse_item(item: &Value) -> Option<PriceSample> {
    match item {
        Value::Object(obj) => {
            let ts = obj.get("t").or_else(|| obj.get("time"))?;
            let close = obj.get("c").or_else(|| obj.get("close"))?;
            Some(PriceSample::new(as_ts_ms(ts)?, as_f64(close)?))
        }
        Value::Array(row) if row.len() >= 5 => {
            Some(PriceSample::new(as_ts_ms(&row[0])?, as_f64(&row[4])?))
        }
        _ => None,
    }
}

fn parse_columns(symbol: &str, cols: &Map<String, Value>) -> Result<Vec<PriceSample>, SourceError> {
    let column = |name: &str| {
        cols.get(name)
            .and_then(Value::as_array)
            .ok_or_else(|| SourceError::Parse(format!("missing `{name}` column for {symbol}")))
    };
    let times = column("time")?;
    let closes = column("close")?;

    Ok(times
        .iter()
        .zip(closes)
        .filter_map(|(t, c)| Some(PriceSample::new(as_ts_ms(t)?, as_f64(c)?)))
        .collect())
}
