//! Retry policy: decides backoff delays.

use std::time::Duration;

/// Retry policy for tasks whose handler asked for a retry.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Base delay for the first retry.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,
}

impl RetryPolicy {
    pub fn default_policy() -> Self {
        Self {
            base_delay: Duration::from_secs(2),
            multiplier: 2.0,
        }
    }

    /// Calculate delay for the next retry based on attempt number.
    ///
    /// `attempts` is the number of attempts already made (1-indexed).
    /// delay = base_delay * multiplier^(attempts - 1)
    ///
    /// Example with base_delay=2s, multiplier=2.0:
    /// - attempt 1 (first failure): 2s
    /// - attempt 2: 4s
    /// - attempt 3: 8s
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let base_secs = self.base_delay.as_secs_f64();
        let delay_secs = base_secs * self.multiplier.powi(attempts.saturating_sub(1) as i32);
        Duration::from_secs_f64(delay_secs)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::default_policy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_has_reasonable_values() {
        let policy = RetryPolicy::default_policy();
        assert_eq!(policy.base_delay, Duration::from_secs(2));
        assert_eq!(policy.multiplier, 2.0);
    }

    #[test]
    fn exponential_backoff_increases() {
        let policy = RetryPolicy::default_policy();

        let d1 = policy.next_delay(1);
        let d2 = policy.next_delay(2);
        let d3 = policy.next_delay(3);

        assert_eq!(d1, Duration::from_secs(2));
        assert_eq!(d2, Duration::from_secs(4));
        assert_eq!(d3, Duration::from_secs(8));
    }

    #[test]
    fn attempt_zero_uses_base_delay() {
        let policy = RetryPolicy::default_policy();
        assert_eq!(policy.next_delay(0), policy.base_delay);
    }
}
