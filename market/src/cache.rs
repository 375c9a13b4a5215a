use std::collections::HashMap;

use crate::rolling_window::{AppendOutcome, PriceWindow};
use crate::types::PriceSample;

/// Per-instrument rolling price windows.
///
/// Every window is bounded to `period + margin` samples; a window is usable
/// for statistics only once it holds `period + 1` samples. Entries never
/// expire: an instrument whose fetches keep failing simply stops advancing.
#[derive(Debug, Clone)]
pub struct PriceCache {
    windows: HashMap<String, PriceWindow>,
    period: usize,
    margin: usize,
}

impl PriceCache {
    /// `margin` is clamped to at least 1 so a full window always satisfies
    /// `period + 1`.
    pub fn new(period: usize, margin: usize) -> Self {
        Self {
            windows: HashMap::new(),
            period,
            margin: margin.max(1),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Maximum samples held per instrument.
    pub fn capacity(&self) -> usize {
        self.period + self.margin
    }

    /// Samples required before a window may feed statistics.
    pub fn min_samples(&self) -> usize {
        self.period + 1
    }

    /// Replaces `instrument`'s window wholesale with the newest samples.
    /// Returns the number of samples kept.
    pub fn initialize(&mut self, instrument: &str, samples: Vec<PriceSample>) -> usize {
        let capacity = self.capacity();
        self.windows
            .entry(instrument.to_string())
            .or_insert_with(|| PriceWindow::new(capacity))
            .initialize(samples)
    }

    /// Appends `sample` if strictly newer than the last stored one. Creates
    /// the window on first use.
    pub fn append_if_newer(&mut self, instrument: &str, sample: PriceSample) -> AppendOutcome {
        let capacity = self.capacity();
        self.windows
            .entry(instrument.to_string())
            .or_insert_with(|| PriceWindow::new(capacity))
            .append_if_newer(sample)
    }

    /// Ordered copy of the window, or `None` if it is absent or insufficient.
    pub fn snapshot(&self, instrument: &str) -> Option<Vec<PriceSample>> {
        let window = self.windows.get(instrument)?;
        if !window.is_sufficient(self.min_samples()) {
            return None;
        }
        Some(window.to_vec())
    }

    pub fn is_sufficient(&self, instrument: &str) -> bool {
        self.windows
            .get(instrument)
            .is_some_and(|w| w.is_sufficient(self.min_samples()))
    }

    /// Stored samples for `instrument` (0 when unknown).
    pub fn len_of(&self, instrument: &str) -> usize {
        self.windows.get(instrument).map_or(0, PriceWindow::len)
    }

    pub fn latest(&self, instrument: &str) -> Option<PriceSample> {
        self.windows.get(instrument).and_then(PriceWindow::latest)
    }
}
