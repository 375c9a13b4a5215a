//! Response helpers shared by venue adapters.

use reqwest::{Response, StatusCode};
use serde_json::Value;

use super::errors::SourceError;
use crate::types::PriceSample;

/// Timestamps below this are taken to be in seconds.
const SECONDS_CUTOFF: u64 = 100_000_000_000;

const MAX_ERROR_BODY: usize = 200;

/// A JSON number or numeric string.
pub(crate) fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Epoch timestamp in ms; second-resolution values are scaled up.
pub(crate) fn as_ts_ms(v: &Value) -> Option<u64> {
    let raw = match v {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64))?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    if raw < SECONDS_CUTOFF {
        Some(raw * 1_000)
    } else {
        Some(raw)
    }
}

/// Drops unusable closes, sorts ascending, keeps the last value per
/// timestamp and truncates to the newest `limit`.
pub(crate) fn normalize(mut samples: Vec<PriceSample>, limit: usize) -> Vec<PriceSample> {
    samples.retain(PriceSample::is_valid);
    samples.sort_by_key(|s| s.ts_ms);

    let mut out: Vec<PriceSample> = Vec::with_capacity(samples.len());
    for s in samples {
        match out.last_mut() {
            Some(last) if last.ts_ms == s.ts_ms => *last = s,
            _ => out.push(s),
        }
    }

    let skip = out.len().saturating_sub(limit);
    out.split_off(skip)
}

/// Passes 2xx responses through; anything else becomes a [`SourceError`].
pub(crate) async fn check_status(symbol: &str, resp: Response) -> Result<Response, SourceError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(status_error(symbol, status, &body))
}

/// Error for a non-2xx reply: 404 and 429 get their own variants, the rest
/// keep the status and a truncated body.
pub(crate) fn status_error(symbol: &str, status: StatusCode, body: &str) -> SourceError {
    match status {
        StatusCode::NOT_FOUND => SourceError::NotFound(symbol.to_string()),
        StatusCode::TOO_MANY_REQUESTS => SourceError::RateLimited,
        _ => SourceError::Status {
            status: status.as_u16(),
            body: truncate(body),
        },
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY).collect()
}
