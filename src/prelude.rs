//! Convenient re-exports for common TryIt types.
pub use crate::{
    backoff::{Backoff, BackoffError, MAX_BACKOFF},
    cancel::CancellationToken,
    chain::TryIt,
    delay::{BackoffDelay, Delay, NoDelay},
    error::{Canceled, ConfigError, Failure, RetryError},
    jitter::Jitter,
    operation::Operation,
    status::RetryStatus,
};
