//! Jittered exponential backoff for retrying a lost compare-and-swap.
//!
//! Contenders that collided once must not retry in lockstep, so the delay is
//! drawn uniformly from the upper half of the exponential step.

use rand::Rng;
use std::time::Duration;

/// Delay before retry `round` (1-based). Round 0 never waits.
pub fn calculate_backoff(round: u32, base_ms: u64, max_ms: u64) -> Duration {
    if round == 0 || base_ms == 0 {
        return Duration::ZERO;
    }

    let step = base_ms
        .saturating_mul(2u64.saturating_pow(round - 1))
        .min(max_ms.max(base_ms));
    let floor = step / 2;

    Duration::from_millis(rand::thread_rng().gen_range(floor..=step))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        for _ in 0..50 {
            let first = calculate_backoff(1, 10, 200).as_millis();
            assert!((5..=10).contains(&first));

            let third = calculate_backoff(3, 10, 200).as_millis();
            assert!((20..=40).contains(&third));

            let capped = calculate_backoff(30, 10, 200).as_millis();
            assert!((100..=200).contains(&capped));
        }
    }

    #[test]
    fn test_no_wait_cases() {
        assert_eq!(calculate_backoff(0, 10, 200), Duration::ZERO);
        assert_eq!(calculate_backoff(3, 0, 200), Duration::ZERO);
    }
}
