//! Error types for retry chains
use std::fmt;
use std::sync::Arc;

/// Raised synchronously while configuring a chain; never deferred to execution.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A runner must be allowed at least one attempt.
    #[error("retry count must be 1 or greater (got {0})")]
    InvalidRetryCount(usize),
}

/// Cooperative cancellation was observed.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[error("operation canceled")]
pub struct Canceled;

/// One entry of a runner's exception list.
///
/// Errors are shared behind `Arc` so the list can be snapshotted into a [`RetryError`]
/// without requiring `E: Clone`.
#[derive(Debug)]
pub enum Failure<E> {
    /// The operation failed and the error policy allowed a retry.
    Operation(Arc<E>),
    /// The error policy rejected this failure; the runner stopped immediately.
    Rejected(Arc<E>),
    /// The operation succeeded but the success policy vetoed the result.
    SuccessPolicy(Arc<E>),
}

impl<E> Clone for Failure<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Operation(e) => Self::Operation(e.clone()),
            Self::Rejected(e) => Self::Rejected(e.clone()),
            Self::SuccessPolicy(e) => Self::SuccessPolicy(e.clone()),
        }
    }
}

impl<E> Failure<E> {
    /// Borrow the underlying error regardless of how it was recorded.
    pub fn error(&self) -> &E {
        match self {
            Self::Operation(e) | Self::Rejected(e) | Self::SuccessPolicy(e) => e,
        }
    }

    /// Shared handle to the underlying error.
    pub fn shared(&self) -> Arc<E> {
        match self {
            Self::Operation(e) | Self::Rejected(e) | Self::SuccessPolicy(e) => e.clone(),
        }
    }

    pub fn is_operation(&self) -> bool {
        matches!(self, Self::Operation(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    pub fn is_success_policy(&self) -> bool {
        matches!(self, Self::SuccessPolicy(_))
    }
}

impl<E: fmt::Display> fmt::Display for Failure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operation(e) => write!(f, "{}", e),
            Self::Rejected(e) => write!(f, "rejected by error policy: {}", e),
            Self::SuccessPolicy(e) => write!(f, "success policy vetoed result: {}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for Failure<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.error())
    }
}

/// Terminal outcome of a chain that did not produce a value.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every runner ran out of attempts. Carries the full ordered exception history.
    Exhausted { attempts: usize, failures: Arc<[Failure<E>]> },
    /// The last runner to execute was stopped by its error policy. `error` is the original,
    /// unwrapped failure; `failures` is the full history including earlier runners.
    Rejected { error: Arc<E>, failures: Arc<[Failure<E>]> },
    /// A cancellation token fired before the chain could finish.
    Canceled,
    /// The blocking entry point could not start its runtime, or was called inside one.
    Runtime(std::io::Error),
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { attempts, failures } => {
                if let Some(last) = failures.last() {
                    write!(
                        f,
                        "retry chain exhausted after {} attempts ({} recorded failures); last error: {}",
                        attempts,
                        failures.len(),
                        last
                    )
                } else {
                    write!(f, "retry chain exhausted after {} attempts; no recorded failures", attempts)
                }
            }
            Self::Rejected { error, .. } => write!(f, "{}", error),
            Self::Canceled => write!(f, "retry chain canceled"),
            Self::Runtime(e) => write!(f, "failed to start blocking runtime: {}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Exhausted { failures, .. } => {
                failures.last().map(|f| f as &dyn std::error::Error)
            }
            Self::Rejected { error, .. } => Some(&**error),
            Self::Canceled => None,
            Self::Runtime(e) => Some(e),
        }
    }
}

impl<E> From<Canceled> for RetryError<E> {
    fn from(_: Canceled) -> Self {
        Self::Canceled
    }
}

impl<E> RetryError<E> {
    /// Build an `Exhausted` error from a snapshot of the exception list.
    pub fn exhausted(attempts: usize, failures: Vec<Failure<E>>) -> Self {
        Self::Exhausted { attempts, failures: failures.into() }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Full ordered exception history, if the chain ran to a failure.
    pub fn failures(&self) -> Option<&[Failure<E>]> {
        match self {
            Self::Exhausted { failures, .. } | Self::Rejected { failures, .. } => Some(&failures[..]),
            _ => None,
        }
    }

    /// Borrow the original error that an error policy refused to retry.
    pub fn rejected(&self) -> Option<&E> {
        match self {
            Self::Rejected { error, .. } => Some(&**error),
            _ => None,
        }
    }

    /// Take the original error that an error policy refused to retry.
    pub fn into_rejected(self) -> Option<Arc<E>> {
        match self {
            Self::Rejected { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Attempt count reported by an `Exhausted` error.
    pub fn attempts(&self) -> Option<usize> {
        match self {
            Self::Exhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct DummyError(&'static str);
    impl fmt::Display for DummyError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }
    impl std::error::Error for DummyError {}

    #[test]
    fn config_error_display() {
        let msg = ConfigError::InvalidRetryCount(0).to_string();
        assert!(msg.contains("1 or greater"));
        assert!(msg.contains("got 0"));
    }

    #[test]
    fn failure_variants_share_the_same_error() {
        let err = Arc::new(DummyError("boom"));
        let f = Failure::Rejected(err.clone());
        assert!(f.is_rejected());
        assert!(!f.is_operation());
        assert_eq!(f.error(), &DummyError("boom"));
        assert!(Arc::ptr_eq(&f.shared(), &err));
        assert!(f.to_string().contains("rejected by error policy"));
        assert!(f.source().is_some());
    }

    #[test]
    fn exhausted_display_includes_last_error() {
        let err = RetryError::exhausted(
            3,
            vec![
                Failure::Operation(Arc::new(DummyError("first"))),
                Failure::SuccessPolicy(Arc::new(DummyError("last"))),
            ],
        );
        let msg = err.to_string();
        assert!(msg.contains("3 attempts"));
        assert!(msg.contains("last error"));
        assert!(msg.contains("last"));
        assert_eq!(err.attempts(), Some(3));
        assert_eq!(err.failures().map(|f| f.len()), Some(2));
    }

    #[test]
    fn exhausted_display_handles_empty_failures() {
        let err: RetryError<DummyError> = RetryError::exhausted(2, vec![]);
        assert!(err.to_string().contains("no recorded failures"));
        assert!(err.source().is_none());
    }

    #[test]
    fn rejected_unwraps_to_original() {
        let original = Arc::new(DummyError("fatal"));
        let err = RetryError::Rejected {
            error: original.clone(),
            failures: vec![Failure::Rejected(original.clone())].into(),
        };
        assert!(err.is_rejected());
        assert_eq!(err.to_string(), "fatal");
        assert_eq!(err.rejected(), Some(&DummyError("fatal")));
        let inner = err.into_rejected().unwrap();
        assert!(Arc::ptr_eq(&inner, &original));
    }

    #[test]
    fn canceled_converts() {
        let err: RetryError<DummyError> = Canceled.into();
        assert!(err.is_canceled());
        assert!(err.failures().is_none());
        assert!(err.rejected().is_none());
    }
}
