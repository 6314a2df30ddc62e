use super::*;

#[test]
fn delay_never_exceeds_max_even_after_many_attempts() {
    let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(30));
    for _ in 0..50 {
        let delay = backoff.next_delay();
        assert!(delay <= Duration::from_secs(30));
    }
}

#[test]
fn delay_grows_across_early_attempts() {
    // Full jitter makes any single draw unpredictable, but the ceiling each
    // attempt is sampled from should be monotonically non-decreasing until
    // it saturates at `max`.
    let mut backoff = Backoff::new(Duration::from_millis(50), Duration::from_secs(10));
    let ceilings: Vec<u128> = (0..5)
        .map(|_| {
            let before = backoff.clone();
            let _ = backoff.next_delay();
            before.base.saturating_mul(1u32.checked_shl(before.attempt).unwrap_or(u32::MAX)).min(before.max).as_millis()
        })
        .collect();
    for pair in ceilings.windows(2) {
        assert!(pair[1] >= pair[0]);
    }
}

#[test]
fn reset_returns_to_initial_ceiling() {
    let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(30));
    backoff.next_delay();
    backoff.next_delay();
    backoff.reset();
    assert_eq!(backoff.attempt, 0);
}
