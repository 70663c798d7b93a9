//! One operation, attempted up to a bounded number of times.
//!
//! Semantics of [`Runner::run`]:
//! - `attempts`, the exception list, and `status` are reset at the start of every run.
//! - The cancellation token is checked before each attempt and raced against each delay.
//!   Cancellation is never recorded in the exception list.
//! - An operation error is offered to the error policy with the zero-based attempt index.
//!   Accepted errors are recorded and retried after the delay (if budget remains). A rejected
//!   error is recorded as [`Failure::Rejected`] and ends the run immediately, with no delay.
//! - A success is offered to the success policy. A veto is then offered to the error policy
//!   like any operation error: accepted vetoes are recorded as [`Failure::SuccessPolicy`] and
//!   retried after the delay, a rejected veto is recorded as [`Failure::Rejected`] and ends the
//!   run immediately.
//! - A panic inside either policy is not caught.
//!
//! Invariants:
//! - `retry_count >= 1`, checked on construction.
//! - `attempts <= retry_count`, and the delay is awaited at most `retry_count - 1` times.

use crate::cancel::CancellationToken;
use crate::delay::Delay;
use crate::error::{Canceled, ConfigError, Failure};
use crate::operation::Operation;
use crate::status::RetryStatus;
use std::fmt;
use std::sync::Arc;

/// Decides whether a failure may be retried: `(error, zero-based attempt index) -> retry?`.
pub type ErrorPolicy<E> = Arc<dyn Fn(&E, usize) -> bool + Send + Sync>;

/// Runs after each successful attempt with `(attempts so far, value)`; `Err` vetoes the success.
pub type SuccessPolicy<T, E> = Arc<dyn Fn(usize, &T) -> Result<(), E> + Send + Sync>;

pub struct Runner<T, E> {
    operation: Operation<T, E>,
    retry_count: usize,
    attempts: usize,
    exceptions: Vec<Failure<E>>,
    status: RetryStatus,
    delay: Option<Arc<dyn Delay>>,
    error_policy: Option<ErrorPolicy<E>>,
    success_policy: Option<SuccessPolicy<T, E>>,
}

impl<T, E> fmt::Debug for Runner<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("retry_count", &self.retry_count)
            .field("attempts", &self.attempts)
            .field("failures", &self.exceptions.len())
            .field("status", &self.status)
            .field("delay", &self.delay)
            .field("error_policy", &self.error_policy.as_ref().map(|_| "<predicate>"))
            .field("success_policy", &self.success_policy.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

fn check_retry_count(retry_count: usize) -> Result<usize, ConfigError> {
    if retry_count == 0 {
        return Err(ConfigError::InvalidRetryCount(retry_count));
    }
    Ok(retry_count)
}

impl<T, E> Runner<T, E>
where
    T: Send + 'static,
    E: Send + Sync + 'static,
{
    /// A runner with no delay or policies of its own.
    pub fn new(operation: Operation<T, E>, retry_count: usize) -> Result<Self, ConfigError> {
        Ok(Self {
            operation,
            retry_count: check_retry_count(retry_count)?,
            attempts: 0,
            exceptions: Vec::new(),
            status: RetryStatus::NotRun,
            delay: None,
            error_policy: None,
            success_policy: None,
        })
    }

    /// A runner seeded with `previous`'s delay, policies, and operation. `operation` replaces the
    /// inherited one when given.
    pub fn inherit(
        previous: &Runner<T, E>,
        operation: Option<Operation<T, E>>,
        retry_count: usize,
    ) -> Result<Self, ConfigError> {
        let mut runner =
            Self::new(operation.unwrap_or_else(|| previous.operation.clone()), retry_count)?;
        runner.delay = previous.delay.clone();
        runner.error_policy = previous.error_policy.clone();
        runner.success_policy = previous.success_policy.clone();
        Ok(runner)
    }

    pub fn set_delay(&mut self, delay: Arc<dyn Delay>) {
        self.delay = Some(delay);
    }

    pub fn set_error_policy<F>(&mut self, policy: F)
    where
        F: Fn(&E, usize) -> bool + Send + Sync + 'static,
    {
        self.error_policy = Some(Arc::new(policy));
    }

    pub fn set_success_policy<F>(&mut self, policy: F)
    where
        F: Fn(usize, &T) -> Result<(), E> + Send + Sync + 'static,
    {
        self.success_policy = Some(Arc::new(policy));
    }

    pub fn retry_count(&self) -> usize {
        self.retry_count
    }

    /// Attempts made during the most recent run.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Failures recorded during the most recent run, in attempt order.
    pub fn exception_list(&self) -> &[Failure<E>] {
        &self.exceptions
    }

    pub fn status(&self) -> RetryStatus {
        self.status
    }

    /// The delay this runner was explicitly given, if any.
    pub fn delay(&self) -> Option<&Arc<dyn Delay>> {
        self.delay.as_ref()
    }

    /// The original error if the most recent run was stopped by the error policy.
    pub fn rejection(&self) -> Option<Arc<E>> {
        match self.exceptions.last() {
            Some(Failure::Rejected(error)) if self.status == RetryStatus::Fail => {
                Some(error.clone())
            }
            _ => None,
        }
    }

    /// Execute the attempt loop.
    ///
    /// Returns `Ok(Some(value))` on success, `Ok(None)` when the runner failed (see
    /// [`status`](Self::status) and [`exception_list`](Self::exception_list)), and
    /// `Err(Canceled)` when `cancel` fired. `fallback` is used when no delay was set.
    pub async fn run(
        &mut self,
        fallback: &Arc<dyn Delay>,
        cancel: &CancellationToken,
    ) -> Result<Option<T>, Canceled> {
        self.attempts = 0;
        self.exceptions.clear();
        self.status = RetryStatus::Running;

        let delay = self.delay.clone().unwrap_or_else(|| fallback.clone());

        for index in 0..self.retry_count {
            if cancel.is_cancelled() {
                return Err(self.canceled());
            }

            self.attempts += 1;
            let failure = match self.operation.call().await {
                Ok(value) => match self.approve(&value) {
                    Ok(()) => {
                        self.status = if index == 0 {
                            RetryStatus::Success
                        } else {
                            RetryStatus::SuccessAfterRetries
                        };
                        tracing::debug!(
                            target: "tryit::runner",
                            attempts = self.attempts,
                            status = %self.status,
                            "attempt succeeded"
                        );
                        return Ok(Some(value));
                    }
                    Err(veto) => Failure::SuccessPolicy(Arc::new(veto)),
                },
                Err(error) => Failure::Operation(Arc::new(error)),
            };

            if !self.retryable(failure.error(), index) {
                tracing::warn!(
                    target: "tryit::runner",
                    attempt = self.attempts,
                    vetoed = failure.is_success_policy(),
                    "error policy rejected failure; giving up"
                );
                self.exceptions.push(Failure::Rejected(failure.shared()));
                self.status = RetryStatus::Fail;
                return Ok(None);
            }
            tracing::debug!(
                target: "tryit::runner",
                attempt = self.attempts,
                retry_count = self.retry_count,
                vetoed = failure.is_success_policy(),
                "attempt failed"
            );
            self.exceptions.push(failure);

            if index + 1 < self.retry_count && delay.wait(index, cancel).await.is_err() {
                return Err(self.canceled());
            }
        }

        self.status = RetryStatus::Fail;
        tracing::debug!(
            target: "tryit::runner",
            attempts = self.attempts,
            failures = self.exceptions.len(),
            "retries exhausted"
        );
        Ok(None)
    }

    fn retryable(&self, error: &E, index: usize) -> bool {
        match &self.error_policy {
            Some(policy) => policy(error, index),
            None => true,
        }
    }

    fn approve(&self, value: &T) -> Result<(), E> {
        match &self.success_policy {
            Some(policy) => policy(self.attempts, value),
            None => Ok(()),
        }
    }

    fn canceled(&mut self) -> Canceled {
        self.status = RetryStatus::Canceled;
        tracing::debug!(target: "tryit::runner", attempts = self.attempts, "run canceled");
        Canceled
    }
}
