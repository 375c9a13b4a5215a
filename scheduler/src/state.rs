//! Alert bookkeeping owned by the scheduler.

use std::collections::HashMap;

/// Wall-clock time (ms) of the last dispatched alert, keyed by pair id.
///
/// Entries are only written when an alert is dispatched and are never
/// removed; an old entry just means the pair is past its cooldown.
#[derive(Debug, Default, Clone)]
pub struct AlertState {
    inner: HashMap<String, u64>,
}

impl AlertState {
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    pub fn last_alert_ms(&self, pair_id: &str) -> Option<u64> {
        self.inner.get(pair_id).copied()
    }

    pub fn set(&mut self, pair_id: &str, now_ms: u64) {
        self.inner.insert(pair_id.to_string(), now_ms);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
