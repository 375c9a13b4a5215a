use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use market::source::{PriceSource, SourceError};
use market::types::PriceSample;

/// Five-minute candles, starting at an arbitrary epoch.
pub const T0: u64 = 1_717_228_800_000;
pub const STEP: u64 = 300_000;

/// In-memory price source. Each symbol has a full history; a fetch returns
/// its newest `limit` samples.
#[derive(Default)]
pub struct MockSource {
    pub series: Mutex<HashMap<String, Vec<PriceSample>>>,
    pub failing: Mutex<HashSet<String>>,
    pub hanging: Mutex<HashSet<String>>,
    pub calls: Mutex<Vec<(String, usize)>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test convenience: closes at `T0, T0 + STEP, ..`.
    pub fn with_prices(self, symbol: &str, prices: &[f64]) -> Self {
        self.set_prices(symbol, prices);
        self
    }

    pub fn set_prices(&self, symbol: &str, prices: &[f64]) {
        let samples = prices
            .iter()
            .enumerate()
            .map(|(i, p)| PriceSample::new(T0 + i as u64 * STEP, *p))
            .collect();
        self.series.lock().insert(symbol.to_string(), samples);
    }

    /// Appends one candle after the symbol's last one.
    pub fn push_price(&self, symbol: &str, price: f64) {
        let mut series = self.series.lock();
        let entry = series.entry(symbol.to_string()).or_default();
        let ts = entry.last().map_or(T0, |s| s.ts_ms + STEP);
        entry.push(PriceSample::new(ts, price));
    }

    pub fn fail(&self, symbol: &str) {
        self.failing.lock().insert(symbol.to_string());
    }

    pub fn recover(&self, symbol: &str) {
        self.failing.lock().remove(symbol);
        self.hanging.lock().remove(symbol);
    }

    pub fn hang(&self, symbol: &str) {
        self.hanging.lock().insert(symbol.to_string());
    }

    pub fn calls_for(&self, symbol: &str) -> Vec<usize> {
        self.calls
            .lock()
            .iter()
            .filter(|(s, _)| s == symbol)
            .map(|(_, l)| *l)
            .collect()
    }
}

#[async_trait]
impl PriceSource for MockSource {
    async fn fetch_klines(&self, symbol: &str, limit: usize) -> Result<Vec<PriceSample>, SourceError> {
        self.calls.lock().push((symbol.to_string(), limit));

        let hanging = self.hanging.lock().contains(symbol);
        if hanging {
            tokio::time::sleep(Duration::from_secs(3_600)).await;
        }
        if self.failing.lock().contains(symbol) {
            return Err(SourceError::RateLimited);
        }

        let series = self.series.lock();
        let all = series
            .get(symbol)
            .ok_or_else(|| SourceError::NotFound(symbol.to_string()))?;
        let skip = all.len().saturating_sub(limit);
        Ok(all[skip..].to_vec())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
