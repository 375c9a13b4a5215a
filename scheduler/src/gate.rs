//! Per-pair cooldown gate.
//
//  Pure: no async, no IO, no clock. Query and commit are separate so the
//  caller can check the threshold between them.

use super::state::AlertState;

/// `true` when `pair_id` has never alerted, or its last alert is at least
/// `cooldown_ms` old.
pub fn should_fire(pair_id: &str, now_ms: u64, cooldown_ms: u64, state: &AlertState) -> bool {
    match state.last_alert_ms(pair_id) {
        None => true,
        Some(last) => now_ms.saturating_sub(last) >= cooldown_ms,
    }
}

/// Time left before `pair_id` may alert again, or `None` if it already may.
pub fn cooldown_remaining_ms(
    pair_id: &str,
    now_ms: u64,
    cooldown_ms: u64,
    state: &AlertState,
) -> Option<u64> {
    let last = state.last_alert_ms(pair_id)?;
    let elapsed = now_ms.saturating_sub(last);
    (elapsed < cooldown_ms).then(|| cooldown_ms - elapsed)
}

/// Restarts the cooldown clock for `pair_id`.
pub fn record(pair_id: &str, now_ms: u64, state: &mut AlertState) {
    state.set(pair_id, now_ms);
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOLDOWN_MS: u64 = 300_000;

    #[test]
    fn fresh_pair_fires() {
        let state = AlertState::new();
        assert!(should_fire("A/B", 0, COOLDOWN_MS, &state));
    }

    #[test]
    fn query_does_not_record() {
        let state = AlertState::new();

        should_fire("A/B", 10, COOLDOWN_MS, &state);

        assert!(state.is_empty());
    }

    #[test]
    fn cooldown_boundary() {
        let mut state = AlertState::new();
        record("A/B", 0, &mut state);

        assert!(!should_fire("A/B", 299_000, COOLDOWN_MS, &state));
        assert!(!should_fire("A/B", 299_999, COOLDOWN_MS, &state));
        assert!(should_fire("A/B", 300_000, COOLDOWN_MS, &state));
    }

    #[test]
    fn cooldown_is_per_pair() {
        let mut state = AlertState::new();
        record("A/B", 1_000, &mut state);

        assert!(!should_fire("A/B", 2_000, COOLDOWN_MS, &state));
        assert!(should_fire("A/C", 2_000, COOLDOWN_MS, &state));
    }

    #[test]
    fn zero_cooldown_always_fires() {
        let mut state = AlertState::new();
        record("A/B", 5, &mut state);

        assert!(should_fire("A/B", 5, 0, &state));
    }

    #[test]
    fn clock_going_backwards_keeps_gate_closed() {
        let mut state = AlertState::new();
        record("A/B", 10_000, &mut state);

        assert!(!should_fire("A/B", 9_000, COOLDOWN_MS, &state));
    }

    #[test]
    fn remaining_time() {
        let mut state = AlertState::new();
        assert_eq!(cooldown_remaining_ms("A/B", 0, COOLDOWN_MS, &state), None);

        record("A/B", 0, &mut state);

        assert_eq!(
            cooldown_remaining_ms("A/B", 100_000, COOLDOWN_MS, &state),
            Some(200_000)
        );
        assert_eq!(cooldown_remaining_ms("A/B", 300_000, COOLDOWN_MS, &state), None);
    }

    #[test]
    fn record_overwrites() {
        let mut state = AlertState::new();
        record("A/B", 1, &mut state);
        record("A/B", 2, &mut state);

        assert_eq!(state.last_alert_ms("A/B"), Some(2));
        assert_eq!(state.len(), 1);
    }
}
