use std::collections::VecDeque;

use crate::types::PriceSample;

/// Result of offering one sample to a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// Timestamp not strictly after the newest stored sample (duplicate poll
    /// of a still-open candle, or out of order).
    Stale,
    /// Non-positive or non-finite price.
    Invalid,
}

/// Bounded, strictly time-ordered buffer of recent closes for one instrument.
///
/// Invariants:
/// - `len() <= capacity()`
/// - timestamps are strictly increasing front to back
/// - every stored price is finite and > 0
#[derive(Debug, Clone)]
pub struct PriceWindow {
    values: VecDeque<PriceSample>,
    capacity: usize,
}

impl PriceWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Replaces the contents with the newest `capacity` valid samples of
    /// `samples`, sorted ascending. For duplicate timestamps the sample that
    /// came last in `samples` wins. Returns the resulting length.
    pub fn initialize(&mut self, samples: impl IntoIterator<Item = PriceSample>) -> usize {
        let mut sorted: Vec<PriceSample> = samples.into_iter().filter(|s| s.is_valid()).collect();
        // stable: equal timestamps keep input order
        sorted.sort_by_key(|s| s.ts_ms);

        let mut deduped: Vec<PriceSample> = Vec::with_capacity(sorted.len());
        for s in sorted {
            match deduped.last_mut() {
                Some(last) if last.ts_ms == s.ts_ms => *last = s,
                _ => deduped.push(s),
            }
        }

        let skip = deduped.len().saturating_sub(self.capacity);
        self.values.clear();
        self.values.extend(deduped.into_iter().skip(skip));
        self.values.len()
    }

    /// Appends `sample` only if it is strictly newer than the last stored
    /// sample, then trims the oldest samples down to capacity.
    pub fn append_if_newer(&mut self, sample: PriceSample) -> AppendOutcome {
        if !sample.is_valid() {
            return AppendOutcome::Invalid;
        }

        if let Some(last) = self.values.back() {
            if sample.ts_ms <= last.ts_ms {
                return AppendOutcome::Stale;
            }
        }

        self.values.push_back(sample);
        self.evict_overflow();
        AppendOutcome::Appended
    }

    /// FIFO eviction down to capacity.
    fn evict_overflow(&mut self) {
        while self.values.len() > self.capacity {
            self.values.pop_front();
        }
    }

    /// At least `min_len` samples are stored.
    pub fn is_sufficient(&self, min_len: usize) -> bool {
        self.values.len() >= min_len
    }

    pub fn latest(&self) -> Option<PriceSample> {
        self.values.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PriceSample> {
        self.values.iter()
    }

    pub fn to_vec(&self) -> Vec<PriceSample> {
        self.values.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
