//! Z-score of the log-return spread between two instruments.
//!
//! ```text
//! r_i      = ln(p_i / p_0)                 per series, over the aligned window
//! spread_i = rA_i - rB_i
//! hist     = last `period` spread values (current point included)
//! z        = (spread_last - mean(hist)) / std(hist)     Bessel-corrected std
//! ```
//!
//! `z(A, B) == -z(B, A)`; callers evaluate each unordered pair once.

use thiserror::Error;

use super::align::{AlignMode, align};
use crate::types::PriceSample;

/// Below this historical std the spread is treated as flat and no Z is produced.
pub const MIN_STD: f64 = 1e-8;

/// Why no Z-score was produced. None of these are failures of the monitor;
/// they are expected skip reasons.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpreadError {
    #[error("insufficient data: have {have} aligned samples, need {need}")]
    Insufficient { have: usize, need: usize },

    #[error("degenerate spread variance (std={std:e})")]
    DegenerateVariance { std: f64 },

    #[error("non-positive or non-finite price in window")]
    NonPositivePrice,
}

impl SpreadError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Insufficient { .. } => "insufficient",
            Self::DegenerateVariance { .. } => "degenerate",
            Self::NonPositivePrice => "bad_price",
        }
    }
}

/// Computes the Z-score of the latest spread over `period` points.
///
/// Needs `min(len_a, len_b) >= period + 1` and `period >= 2` (the sample std
/// divides by `period - 1`). Never returns NaN or infinity.
pub fn compute_z(series_a: &[f64], series_b: &[f64], period: usize) -> Result<f64, SpreadError> {
    let n = series_a.len().min(series_b.len());
    let need = (period + 1).max(3);
    if period < 2 || n < need {
        return Err(SpreadError::Insufficient { have: n, need });
    }

    let a = &series_a[series_a.len() - n..];
    let b = &series_b[series_b.len() - n..];
    if a.iter().chain(b).any(|p| !(p.is_finite() && *p > 0.0)) {
        return Err(SpreadError::NonPositivePrice);
    }

    let (a0, b0) = (a[0], b[0]);
    let spread: Vec<f64> = a
        .iter()
        .zip(b)
        .map(|(pa, pb)| (pa / a0).ln() - (pb / b0).ln())
        .collect();

    let hist = &spread[n - period..];
    let mean = hist.iter().sum::<f64>() / period as f64;
    let var = hist.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (period - 1) as f64;
    let std = var.sqrt();

    if !std.is_finite() || std < MIN_STD {
        return Err(SpreadError::DegenerateVariance { std });
    }

    let z = (spread[n - 1] - mean) / std;
    if !z.is_finite() {
        return Err(SpreadError::DegenerateVariance { std });
    }
    Ok(z)
}

/// Aligns two instrument windows with `mode`, then runs [`compute_z`].
pub fn pair_z(
    a: &[PriceSample],
    b: &[PriceSample],
    period: usize,
    mode: AlignMode,
) -> Result<f64, SpreadError> {
    let (pa, pb) = align(a, b, mode);
    compute_z(&pa, &pb, period)
}
