//! Ordered chain of runners: a primary operation plus fallbacks.
//!
//! Semantics of [`TryIt::go_async`]:
//! - Runners execute one at a time, in the order they were appended.
//! - The first runner to succeed wins; later runners never run.
//! - Attempts are summed and exception lists concatenated across every runner that ran.
//! - A success that follows an earlier failed runner is reported as
//!   [`RetryStatus::SuccessAfterRetries`], even when that runner succeeded on its first attempt.
//! - If no runner succeeds the chain fails with [`RetryError::Exhausted`], or with
//!   [`RetryError::Rejected`] carrying the original error when the last runner was stopped by its
//!   error policy.
//! - Cancellation propagates immediately as [`RetryError::Canceled`].
//!
//! Configuration calls (`using_delay`, `on_error`, `on_success`) act on the most recently
//! appended runner. Appending a runner seeds it with the previous runner's delay and policies.
//!
//! ```rust
//! use std::time::Duration;
//! use tryit::{BackoffDelay, TryIt};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let mut chain = TryIt::new(|| async { Err::<&str, _>("primary down") }, 3)
//!     .unwrap()
//!     .using_delay(BackoffDelay::fixed(Duration::from_millis(1)))
//!     .then_try(|| async { Ok("from replica") }, 2)
//!     .unwrap();
//!
//! assert_eq!(chain.go_async().await.unwrap(), "from replica");
//! assert_eq!(chain.attempts(), 4);
//! assert_eq!(chain.winner(), Some(1));
//! # });
//! ```

use crate::cancel::CancellationToken;
use crate::delay::{default_delay, Delay};
use crate::error::{ConfigError, Failure, RetryError};
use crate::operation::Operation;
use crate::runner::Runner;
use crate::status::RetryStatus;
use std::fmt;
use std::io;
use std::future::Future;
use std::sync::Arc;

/// Retry chain builder and executor.
pub struct TryIt<T, E> {
    runners: Vec<Runner<T, E>>,
    tail: usize,
    default_delay: Arc<dyn Delay>,
    attempts: usize,
    exceptions: Vec<Failure<E>>,
    status: RetryStatus,
    winner: Option<usize>,
}

impl<T, E> fmt::Debug for TryIt<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TryIt")
            .field("runners", &self.runners)
            .field("default_delay", &self.default_delay)
            .field("attempts", &self.attempts)
            .field("failures", &self.exceptions.len())
            .field("status", &self.status)
            .field("winner", &self.winner)
            .finish()
    }
}

impl<T, E> TryIt<T, E>
where
    T: Send + 'static,
    E: Send + Sync + 'static,
{
    /// Start a chain with an async closure and its attempt budget.
    pub fn new<F, Fut>(operation: F, retries: usize) -> Result<Self, ConfigError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::from_operation(Operation::new(operation), retries)
    }

    /// Start a chain with a prepared [`Operation`].
    pub fn from_operation(operation: Operation<T, E>, retries: usize) -> Result<Self, ConfigError> {
        Ok(Self {
            runners: vec![Runner::new(operation, retries)?],
            tail: 0,
            default_delay: default_delay(),
            attempts: 0,
            exceptions: Vec::new(),
            status: RetryStatus::NotRun,
            winner: None,
        })
    }

    /// Append a fallback operation, tried only if every earlier runner fails.
    pub fn then_try<F, Fut>(self, operation: F, retries: usize) -> Result<Self, ConfigError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.then_try_operation(Operation::new(operation), retries)
    }

    /// Append a prepared fallback [`Operation`].
    pub fn then_try_operation(
        self,
        operation: Operation<T, E>,
        retries: usize,
    ) -> Result<Self, ConfigError> {
        self.append(Some(operation), retries)
    }

    /// Append another round of the previous runner's operation with a fresh budget.
    pub fn then_retry(self, retries: usize) -> Result<Self, ConfigError> {
        self.append(None, retries)
    }

    fn append(mut self, operation: Option<Operation<T, E>>, retries: usize) -> Result<Self, ConfigError> {
        let runner = Runner::inherit(&self.runners[self.tail], operation, retries)?;
        self.runners.push(runner);
        self.tail = self.runners.len() - 1;
        Ok(self)
    }

    /// Delay for the most recently appended runner.
    pub fn using_delay<D>(self, delay: D) -> Self
    where
        D: Delay + 'static,
    {
        self.using_shared_delay(Arc::new(delay))
    }

    /// Shared delay for the most recently appended runner.
    pub fn using_shared_delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.runners[self.tail].set_delay(delay);
        self
    }

    /// Error policy for the most recently appended runner.
    pub fn on_error<F>(mut self, policy: F) -> Self
    where
        F: Fn(&E, usize) -> bool + Send + Sync + 'static,
    {
        self.runners[self.tail].set_error_policy(policy);
        self
    }

    /// Success policy for the most recently appended runner.
    pub fn on_success<F>(mut self, policy: F) -> Self
    where
        F: Fn(usize, &T) -> Result<(), E> + Send + Sync + 'static,
    {
        self.runners[self.tail].set_success_policy(policy);
        self
    }

    /// Replace the delay used by runners that were not given one. Defaults to [`default_delay`].
    pub fn with_default_delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.default_delay = delay;
        self
    }

    /// Total attempts across every runner that ran in the most recent execution.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Every recorded failure of the most recent execution, in execution order.
    pub fn exception_list(&self) -> &[Failure<E>] {
        &self.exceptions
    }

    pub fn status(&self) -> RetryStatus {
        self.status
    }

    /// Zero-based index of the runner that succeeded, if any.
    pub fn winner(&self) -> Option<usize> {
        self.winner
    }

    /// Attempt budget of the most recently appended runner.
    pub fn retry_count(&self) -> usize {
        self.runners[self.tail].retry_count()
    }

    /// Number of runners in the chain.
    pub fn len(&self) -> usize {
        self.runners.len()
    }

    /// Always `false`: a chain starts with one runner.
    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }

    pub fn runner(&self, index: usize) -> Option<&Runner<T, E>> {
        self.runners.get(index)
    }

    pub fn runners(&self) -> &[Runner<T, E>] {
        &self.runners
    }

    /// Execute the chain.
    pub async fn go_async(&mut self) -> Result<T, RetryError<E>> {
        self.go_async_with(&CancellationToken::new()).await
    }

    /// Execute the chain, stopping early if `cancel` fires.
    pub async fn go_async_with(&mut self, cancel: &CancellationToken) -> Result<T, RetryError<E>> {
        self.status = RetryStatus::Running;
        self.attempts = 0;
        self.exceptions.clear();
        self.winner = None;

        let count = self.runners.len();
        let mut running = RetryStatus::Running;
        let mut rejected = None;

        for (index, runner) in self.runners.iter_mut().enumerate() {
            let outcome = runner.run(&self.default_delay, cancel).await;
            self.attempts += runner.attempts();
            self.exceptions.extend(runner.exception_list().iter().cloned());

            let value = match outcome {
                Ok(value) => value,
                Err(canceled) => {
                    self.status = RetryStatus::Fail;
                    tracing::debug!(
                        target: "tryit::chain",
                        runner = index,
                        attempts = self.attempts,
                        "chain canceled"
                    );
                    return Err(canceled.into());
                }
            };

            running = match runner.status() {
                RetryStatus::Success if running == RetryStatus::Fail => {
                    RetryStatus::SuccessAfterRetries
                }
                status => status,
            };

            if let Some(value) = value {
                self.status = running;
                self.winner = Some(index);
                tracing::info!(
                    target: "tryit::chain",
                    winner = index,
                    attempts = self.attempts,
                    status = %self.status,
                    "chain succeeded"
                );
                return Ok(value);
            }

            rejected = runner.rejection();
            if index + 1 < count {
                tracing::warn!(
                    target: "tryit::chain",
                    failed = index,
                    next = index + 1,
                    attempts = runner.attempts(),
                    "runner failed; falling back"
                );
            }
        }

        self.status = RetryStatus::Fail;
        tracing::info!(
            target: "tryit::chain",
            attempts = self.attempts,
            failures = self.exceptions.len(),
            "chain failed"
        );
        let failures: Arc<[Failure<E>]> = self.exceptions.clone().into();
        Err(match rejected {
            Some(error) => RetryError::Rejected { error, failures },
            None => RetryError::Exhausted { attempts: self.attempts, failures },
        })
    }

    /// Blocking form of [`go_async`](Self::go_async).
    ///
    /// Drives the chain on a private current-thread runtime. Called from within a tokio runtime
    /// it runs nothing and returns [`RetryError::Runtime`].
    pub fn go(&mut self) -> Result<T, RetryError<E>> {
        self.go_with(&CancellationToken::new())
    }

    /// Blocking form of [`go_async_with`](Self::go_async_with).
    pub fn go_with(&mut self, cancel: &CancellationToken) -> Result<T, RetryError<E>> {
        if tokio::runtime::Handle::try_current().is_ok() {
            self.status = RetryStatus::Fail;
            tracing::warn!(target: "tryit::chain", "blocking run requested inside a tokio runtime");
            return Err(RetryError::Runtime(io::Error::new(
                io::ErrorKind::Other,
                "go/go_with cannot block inside a tokio runtime; use go_async",
            )));
        }
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_time().build() {
            Ok(runtime) => runtime,
            Err(e) => {
                self.status = RetryStatus::Fail;
                return Err(RetryError::Runtime(e));
            }
        };
        runtime.block_on(self.go_async_with(cancel))
    }
}
