use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cumulative counters for operational visibility. Cloning shares the
/// underlying atomics, so a handle taken before `run` keeps observing.
#[derive(Clone, Default, Debug)]
pub struct Counters {
    pub cycles: Arc<AtomicU64>,
    pub fetch_failures: Arc<AtomicU64>,
    pub recoveries: Arc<AtomicU64>,

    pub alerts_fired: Arc<AtomicU64>,
    pub batches_delivered: Arc<AtomicU64>,
    pub delivery_failures: Arc<AtomicU64>,

    // skip reasons
    pub skip_cooldown: Arc<AtomicU64>,
    pub skip_insufficient: Arc<AtomicU64>,
    pub skip_degenerate: Arc<AtomicU64>,
}

impl Counters {
    pub(crate) fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let a = Counters::default();
        let b = a.clone();

        Counters::add(&a.alerts_fired, 3);

        assert_eq!(Counters::get(&b.alerts_fired), 3);
    }
}
