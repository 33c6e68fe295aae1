//! # Backoff
//!
//! Exponential, capped, jittered delays for throttled and unknown remote errors.

use crate::config::ControllerConfig;
use crate::constants::{DEFAULT_BACKOFF_JITTER, DEFAULT_BACKOFF_MULTIPLIER};
use std::time::Duration;

/// Exponential backoff configuration
#[derive(Clone, Debug)]
pub struct BackoffConfig {
    /// Initial delay for first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for each subsequent retry
    pub multiplier: f64,
    /// Random jitter factor (0.0 to 1.0)
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::from(&ControllerConfig::default())
    }
}

impl From<&ControllerConfig> for BackoffConfig {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            initial_delay: config.backoff_initial,
            max_delay: config.backoff_max,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            jitter: DEFAULT_BACKOFF_JITTER,
        }
    }
}

impl BackoffConfig {
    /// Calculate the backoff delay for a given retry attempt (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base_delay_secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !base_delay_secs.is_finite() || base_delay_secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }

        let jitter_range = base_delay_secs * self.jitter;
        let jitter = rand::random::<f64>() * jitter_range * 2.0 - jitter_range;
        let delay_with_jitter = (base_delay_secs + jitter).max(0.0);

        let capped_delay = delay_with_jitter.min(self.max_delay.as_secs_f64());

        Duration::from_secs_f64(capped_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BackoffConfig {
        BackoffConfig {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(300),
            multiplier: 2.0,
            jitter: 0.1,
        }
    }

    #[test]
    fn test_first_attempt_near_initial_delay() {
        let delay = config().delay_for_attempt(0).as_secs_f64();
        assert!((0.45..=0.55).contains(&delay), "got {delay}");
    }

    #[test]
    fn test_delay_grows_exponentially() {
        let delay = config().delay_for_attempt(3).as_secs_f64();
        assert!((3.6..=4.4).contains(&delay), "got {delay}");
    }

    #[test]
    fn test_delay_is_capped() {
        let cfg = config();
        assert_eq!(cfg.delay_for_attempt(20), Duration::from_secs(300));
        assert_eq!(cfg.delay_for_attempt(u32::MAX), Duration::from_secs(300));
    }

    #[test]
    fn test_zero_jitter_is_deterministic() {
        let cfg = BackoffConfig {
            jitter: 0.0,
            ..config()
        };
        assert_eq!(cfg.delay_for_attempt(1), Duration::from_secs(1));
    }
}
