use std::fmt;

use serde::{Deserialize, Serialize};

/// One closing price observed for an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    /// Candle open time, ms since epoch.
    pub ts_ms: u64,
    /// Close price. Only finite, strictly positive values are usable.
    pub price: f64,
}

impl PriceSample {
    pub fn new(ts_ms: u64, price: f64) -> Self {
        Self { ts_ms, price }
    }

    /// `ln(price)` is defined and finite.
    pub fn is_valid(&self) -> bool {
        self.price.is_finite() && self.price > 0.0
    }
}

/// Unordered pair of two distinct instruments, stored in canonical order.
///
/// `Pair::new("ETH", "BTC")` and `Pair::new("BTC", "ETH")`
/// are the same pair with the same `id()`, so alert state keyed by the id
/// never double-counts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pair {
    pub base: String,
    pub quote: String,
}

impl Pair {
    /// Returns `None` when both legs name the same instrument.
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Option<Self> {
        let (a, b) = (a.into(), b.into());
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { base: a, quote: b }),
            std::cmp::Ordering::Greater => Some(Self { base: b, quote: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Canonical key, `"{base}/{quote}"`.
    pub fn id(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Every `C(n, 2)` pair of `instruments`, in a deterministic order.
///
/// Instruments are deduplicated and sorted first, so the enumeration does not
/// depend on configuration order.
pub fn all_pairs<S: AsRef<str>>(instruments: &[S]) -> Vec<Pair> {
    let mut symbols: Vec<&str> = instruments.iter().map(AsRef::as_ref).collect();
    symbols.sort_unstable();
    symbols.dedup();

    let mut out = Vec::with_capacity(symbols.len() * symbols.len().saturating_sub(1) / 2);
    for (i, a) in symbols.iter().enumerate() {
        for b in &symbols[i + 1..] {
            if let Some(pair) = Pair::new(*a, *b) {
                out.push(pair);
            }
        }
    }
    out
}
