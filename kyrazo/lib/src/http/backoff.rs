//! Retry backoff schedule.

use std::time::Duration;

/// Delay before the first retry.
pub const BASE_DELAY: Duration = Duration::from_millis(100);

/// Delay to wait after failed attempt `attempt` (zero-based).
///
/// Pure exponential, no jitter: 100ms, 200ms, 400ms, ... Saturates instead
/// of overflowing for absurd attempt counts.
pub fn backoff_delay(attempt: u32) -> Duration {
    let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
    BASE_DELAY.saturating_mul(factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff_delay(0), Duration::from_millis(100));
        assert_eq!(backoff_delay(1), Duration::from_millis(200));
        assert_eq!(backoff_delay(2), Duration::from_millis(400));
        assert_eq!(backoff_delay(5), Duration::from_millis(3200));
    }

    #[test]
    fn test_backoff_saturates() {
        assert!(backoff_delay(64) >= backoff_delay(31));
    }
}
