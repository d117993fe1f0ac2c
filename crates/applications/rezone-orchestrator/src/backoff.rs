//! Growing-delay schedule shared by operation polling and create retries

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Geometric backoff schedule
///
/// ```text
/// delay(n) = min(base × multiplier^n, cap)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Backoff {
    /// Delay before the second attempt
    #[serde(with = "secs_f64")]
    pub base: Duration,

    /// Upper bound for any single delay
    #[serde(with = "secs_f64")]
    pub cap: Duration,

    /// Growth factor between consecutive delays
    pub multiplier: f64,
}

impl Backoff {
    /// Create a backoff schedule
    pub const fn new(base: Duration, cap: Duration, multiplier: f64) -> Self {
        Self {
            base,
            cap,
            multiplier,
        }
    }

    /// Constant delay between attempts
    pub const fn fixed(delay: Duration) -> Self {
        Self::new(delay, delay, 1.0)
    }

    /// Default schedule for polling long-running operations
    pub const fn polling() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(30), 1.5)
    }

    /// Delay to wait after the given zero-based attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.base.as_secs_f64() * self.multiplier.max(1.0).powi(exponent);

        if !secs.is_finite() || secs >= self.cap.as_secs_f64() {
            self.cap
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Infinite iterator over the delay schedule
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0u32..).map(|attempt| self.delay_for(attempt))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::polling()
    }
}

mod secs_f64 {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polling_schedule_grows_to_cap() {
        let backoff = Backoff::polling();
        let delays: Vec<_> = backoff.delays().take(6).collect();

        assert_eq!(delays[0], Duration::from_secs(5));
        assert_eq!(delays[1], Duration::from_millis(7500));
        assert_eq!(delays[2], Duration::from_millis(11250));
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(delays[5], Duration::from_secs(30));
    }

    #[test]
    fn test_fixed_schedule() {
        let backoff = Backoff::fixed(Duration::from_secs(10));
        assert!(backoff.delays().take(4).all(|d| d == Duration::from_secs(10)));
    }

    #[test]
    fn test_large_attempt_does_not_overflow() {
        let backoff = Backoff::polling();
        assert_eq!(backoff.delay_for(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_backoff_deserializes_seconds() {
        let json = r#"{"base": 2.0, "cap": 20.0, "multiplier": 2.0}"#;
        let backoff: Backoff = serde_json::from_str(json).unwrap();
        assert_eq!(backoff.base, Duration::from_secs(2));
        assert_eq!(backoff.delay_for(3), Duration::from_secs(16));
        assert_eq!(backoff.delay_for(4), Duration::from_secs(20));
    }
}
