//! Pairwise divergence signal.
//!
//! `align` turns two instrument windows into equal-length price series;
//! `zscore` standardises the current log-return spread against its recent
//! history. Both are pure: no I/O, no clock, no shared state.

pub mod align;
pub mod zscore;

pub use align::{AlignMode, align};
pub use zscore::{MIN_STD, SpreadError, compute_z, pair_z};
