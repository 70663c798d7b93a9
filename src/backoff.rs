//! Backoff curves used by [`BackoffDelay`](crate::delay::BackoffDelay).
//!
//! The input is the zero-based index of the attempt that just failed: index `0` is the pause
//! after the first failure. Constant returns `base` for every index, linear returns
//! `base * (index + 1)`, exponential returns `base * 2^index`. Results saturate at
//! [`MAX_BACKOFF`] and respect an optional cap.
//!
//! ```rust
//! use std::time::Duration;
//! use tryit::Backoff;
//!
//! let backoff = Backoff::exponential(Duration::from_millis(100))
//!     .with_max(Duration::from_secs(1))
//!     .unwrap();
//! assert_eq!(backoff.delay(0), Duration::from_millis(100));
//! assert_eq!(backoff.delay(1), Duration::from_millis(200));
//! assert_eq!(backoff.delay(5), Duration::from_secs(1)); // capped
//! ```

use std::fmt;
use std::time::Duration;

/// Ceiling applied when a computation would overflow (1 day).
pub const MAX_BACKOFF: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackoffError {
    ConstantDoesNotSupportMax,
    MaxMustBePositive,
    MaxLessThanBase { base: Duration, max: Duration },
}

impl fmt::Display for BackoffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackoffError::ConstantDoesNotSupportMax => {
                write!(f, "with_max is only valid for linear or exponential backoff")
            }
            BackoffError::MaxMustBePositive => write!(f, "max must be greater than zero"),
            BackoffError::MaxLessThanBase { base, max } => {
                write!(f, "max ({:?}) must be >= base ({:?})", max, base)
            }
        }
    }
}

impl std::error::Error for BackoffError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Curve {
    Constant,
    Linear,
    Exponential,
}

/// A backoff curve with an optional cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    curve: Curve,
    base: Duration,
    max: Option<Duration>,
}

impl Backoff {
    /// Same pause after every failure.
    pub fn constant(delay: Duration) -> Self {
        Self { curve: Curve::Constant, base: delay, max: None }
    }

    /// Pause grows by `base` after every failure.
    pub fn linear(base: Duration) -> Self {
        Self { curve: Curve::Linear, base, max: None }
    }

    /// Pause doubles after every failure.
    pub fn exponential(base: Duration) -> Self {
        Self { curve: Curve::Exponential, base, max: None }
    }

    /// Cap a growing curve. Errors on constant curves, zero caps, and caps below `base`.
    pub fn with_max(mut self, max: Duration) -> Result<Self, BackoffError> {
        if max.is_zero() {
            return Err(BackoffError::MaxMustBePositive);
        }
        if self.curve == Curve::Constant {
            return Err(BackoffError::ConstantDoesNotSupportMax);
        }
        if max < self.base {
            return Err(BackoffError::MaxLessThanBase { base: self.base, max });
        }
        self.max = Some(max);
        Ok(self)
    }

    /// Pause to apply after the attempt with zero-based index `attempt` failed.
    pub fn delay(&self, attempt: usize) -> Duration {
        let step = attempt.min(u32::MAX as usize - 1) as u32;
        let raw = match self.curve {
            Curve::Constant => self.base,
            Curve::Linear => self.base.checked_mul(step + 1).unwrap_or(MAX_BACKOFF),
            Curve::Exponential => {
                let multiplier = 2u128.saturating_pow(step);
                let nanos = self.base.as_nanos().saturating_mul(multiplier);
                Duration::from_nanos(nanos.min(MAX_BACKOFF.as_nanos()) as u64)
            }
        };
        let capped = self.max.map(|m| raw.min(m)).unwrap_or(raw);
        capped.min(MAX_BACKOFF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_backoff_returns_same_delay() {
        let backoff = Backoff::constant(Duration::from_secs(1));
        assert_eq!(backoff.delay(0), Duration::from_secs(1));
        assert_eq!(backoff.delay(1), Duration::from_secs(1));
        assert_eq!(backoff.delay(100), Duration::from_secs(1));
    }

    #[test]
    fn linear_backoff_starts_at_base() {
        let backoff = Backoff::linear(Duration::from_millis(100));
        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(200));
        assert_eq!(backoff.delay(9), Duration::from_millis(1000));
    }

    #[test]
    fn exponential_backoff_doubles_each_time() {
        let backoff = Backoff::exponential(Duration::from_millis(100));
        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(200));
        assert_eq!(backoff.delay(2), Duration::from_millis(400));
        assert_eq!(backoff.delay(4), Duration::from_millis(1600));
    }

    #[test]
    fn exponential_backoff_respects_max() {
        let backoff = Backoff::exponential(Duration::from_millis(100))
            .with_max(Duration::from_secs(1))
            .unwrap();
        assert_eq!(backoff.delay(3), Duration::from_millis(800));
        assert_eq!(backoff.delay(4), Duration::from_secs(1));
        assert_eq!(backoff.delay(10), Duration::from_secs(1));
    }

    #[test]
    fn linear_with_cap_progression() {
        let backoff =
            Backoff::linear(Duration::from_secs(10)).with_max(Duration::from_secs(25)).unwrap();
        assert_eq!(backoff.delay(0), Duration::from_secs(10));
        assert_eq!(backoff.delay(1), Duration::from_secs(20));
        assert_eq!(backoff.delay(2), Duration::from_secs(25));
    }

    #[test]
    fn large_attempts_saturate() {
        assert_eq!(Backoff::exponential(Duration::from_secs(1)).delay(1_000_000_000), MAX_BACKOFF);
        assert_eq!(Backoff::linear(Duration::from_secs(u64::MAX / 2)).delay(1_000), MAX_BACKOFF);
        assert_eq!(Backoff::exponential(Duration::from_secs(2)).delay(usize::MAX), MAX_BACKOFF);
    }

    #[test]
    fn invalid_caps_are_rejected() {
        assert_eq!(
            Backoff::constant(Duration::from_secs(5)).with_max(Duration::from_secs(10)),
            Err(BackoffError::ConstantDoesNotSupportMax)
        );
        assert_eq!(
            Backoff::linear(Duration::from_secs(1)).with_max(Duration::ZERO),
            Err(BackoffError::MaxMustBePositive)
        );
        assert!(matches!(
            Backoff::linear(Duration::from_secs(100)).with_max(Duration::from_secs(50)),
            Err(BackoffError::MaxLessThanBase { .. })
        ));
    }

    #[test]
    fn zero_base_stays_zero() {
        assert_eq!(Backoff::linear(Duration::ZERO).delay(5), Duration::ZERO);
        assert_eq!(Backoff::exponential(Duration::ZERO).delay(3), Duration::ZERO);
    }
}
