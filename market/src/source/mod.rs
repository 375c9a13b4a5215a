//! Market-data sources.
//!
//! The monitor only ever sees [`PriceSource`]. Each venue adapter owns its
//! symbol translation, URL layout and response shape, and hands back
//! ascending, deduplicated, strictly positive closes.

pub mod binance;
pub mod errors;
pub mod interval;
pub mod mexc;
mod parse;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

pub use binance::BinanceSpotSource;
pub use errors::SourceError;
pub use interval::Interval;
pub use mexc::MexcFuturesSource;

use crate::types::PriceSample;

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Up to `limit` most recent closes for `symbol`, oldest first.
    async fn fetch_klines(&self, symbol: &str, limit: usize) -> Result<Vec<PriceSample>, SourceError>;

    /// Short venue label for logs.
    fn name(&self) -> &str;
}

/// Shared HTTP client settings for venue adapters.
pub(crate) fn http_client(timeout: Duration) -> Result<Client, SourceError> {
    let http = Client::builder()
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(30))
        .user_agent("z-spread-monitor/0.1")
        .build()?;
    Ok(http)
}
