use std::fmt;
use std::str::FromStr;

use crate::types::PriceSample;

/// How two windows are lined up before the spread is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignMode {
    /// Keep the last `min(len_a, len_b)` samples of each side. Assumes both
    /// instruments share a candle cadence so index ≈ time.
    #[default]
    Trailing,
    /// Keep only timestamps present on both sides. A candle missed by one
    /// venue drops that point instead of shifting the whole series.
    Timestamp,
}

impl FromStr for AlignMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trailing" => Ok(Self::Trailing),
            "timestamp" => Ok(Self::Timestamp),
            other => Err(format!("unknown align mode `{other}`")),
        }
    }
}

impl fmt::Display for AlignMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trailing => f.write_str("trailing"),
            Self::Timestamp => f.write_str("timestamp"),
        }
    }
}

/// Returns two equal-length price series, oldest first.
///
/// Both inputs must be sorted ascending by timestamp (as `PriceWindow`
/// guarantees).
pub fn align(a: &[PriceSample], b: &[PriceSample], mode: AlignMode) -> (Vec<f64>, Vec<f64>) {
    match mode {
        AlignMode::Trailing => {
            let n = a.len().min(b.len());
            (
                a[a.len() - n..].iter().map(|s| s.price).collect(),
                b[b.len() - n..].iter().map(|s| s.price).collect(),
            )
        }
        AlignMode::Timestamp => {
            let mut out_a = Vec::with_capacity(a.len().min(b.len()));
            let mut out_b = Vec::with_capacity(a.len().min(b.len()));
            let (mut i, mut j) = (0, 0);
            while i < a.len() && j < b.len() {
                match a[i].ts_ms.cmp(&b[j].ts_ms) {
                    std::cmp::Ordering::Less => i += 1,
                    std::cmp::Ordering::Greater => j += 1,
                    std::cmp::Ordering::Equal => {
                        out_a.push(a[i].price);
                        out_b.push(b[j].price);
                        i += 1;
                        j += 1;
                    }
                }
            }
            (out_a, out_b)
        }
    }
}
