//! Pauses between attempts.
//!
//! A [`Delay`] is awaited after a failed attempt when the runner still has budget left. The
//! attempt index it receives is zero-based and increases monotonically across the retries of a
//! single runner. Every delay must honor the cancellation token, both before and during the wait.
//!
//! Runners without an explicit delay fall back to the chain's default, which starts out as the
//! process-wide [`default_delay`]: a stateless constant pause of [`DEFAULT_DELAY`].

use crate::backoff::Backoff;
use crate::cancel::CancellationToken;
use crate::error::Canceled;
use crate::jitter::Jitter;
use crate::sleeper::{Sleeper, TokioSleeper};
use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Pause used by [`default_delay`].
pub const DEFAULT_DELAY: Duration = Duration::from_millis(250);

/// Strategy awaited between retry attempts.
#[async_trait]
pub trait Delay: Send + Sync + fmt::Debug {
    /// Wait after the attempt with zero-based index `attempt` failed.
    ///
    /// Returns `Err(Canceled)` as soon as `cancel` fires, whether before or during the pause.
    async fn wait(&self, attempt: usize, cancel: &CancellationToken) -> Result<(), Canceled>;
}

/// Backoff curve plus jitter, slept through a [`Sleeper`].
#[derive(Clone)]
pub struct BackoffDelay {
    backoff: Backoff,
    jitter: Jitter,
    sleeper: Arc<dyn Sleeper>,
}

impl fmt::Debug for BackoffDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackoffDelay")
            .field("backoff", &self.backoff)
            .field("jitter", &self.jitter)
            .field("sleeper", &"<sleeper>")
            .finish()
    }
}

impl BackoffDelay {
    pub fn new(backoff: Backoff) -> Self {
        Self { backoff, jitter: Jitter::None, sleeper: Arc::new(TokioSleeper) }
    }

    /// Constant pause after every failure.
    pub fn fixed(pause: Duration) -> Self {
        Self::new(Backoff::constant(pause))
    }

    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    /// Provide a custom sleeper implementation.
    pub fn with_sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Jittered pause for the given zero-based attempt index.
    pub fn pause_for(&self, attempt: usize) -> Duration {
        self.jitter.apply(self.backoff.delay(attempt))
    }
}

#[async_trait]
impl Delay for BackoffDelay {
    async fn wait(&self, attempt: usize, cancel: &CancellationToken) -> Result<(), Canceled> {
        if cancel.is_cancelled() {
            return Err(Canceled);
        }
        let pause = self.pause_for(attempt);
        tracing::trace!(target: "tryit::delay", attempt, ?pause, "waiting before next attempt");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Canceled),
            _ = self.sleeper.sleep(pause) => Ok(()),
        }
    }
}

/// Retries immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelay;

#[async_trait]
impl Delay for NoDelay {
    async fn wait(&self, _attempt: usize, cancel: &CancellationToken) -> Result<(), Canceled> {
        if cancel.is_cancelled() {
            Err(Canceled)
        } else {
            Ok(())
        }
    }
}

/// The process-wide default delay. Built once, immutable, and shared by every chain.
pub fn default_delay() -> Arc<dyn Delay> {
    static DEFAULT: OnceLock<Arc<dyn Delay>> = OnceLock::new();
    DEFAULT.get_or_init(|| Arc::new(BackoffDelay::fixed(DEFAULT_DELAY))).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sleeper::TrackingSleeper;

    #[tokio::test]
    async fn backoff_delay_sleeps_per_attempt_index() {
        let sleeper = TrackingSleeper::new();
        let delay = BackoffDelay::new(Backoff::linear(Duration::from_millis(100)))
            .with_sleeper(sleeper.clone());
        let cancel = CancellationToken::new();

        for attempt in 0..3 {
            delay.wait(attempt, &cancel).await.unwrap();
        }

        assert_eq!(
            sleeper.calls(),
            vec![Duration::from_millis(100), Duration::from_millis(200), Duration::from_millis(300)]
        );
    }

    #[tokio::test]
    async fn jitter_never_exceeds_backoff() {
        let delay = BackoffDelay::fixed(Duration::from_millis(100)).with_jitter(Jitter::full());
        for attempt in 0..20 {
            assert!(delay.pause_for(attempt) <= Duration::from_millis(100));
        }
    }

    #[tokio::test]
    async fn cancelled_before_wait_skips_sleeping() {
        let sleeper = TrackingSleeper::new();
        let delay = BackoffDelay::fixed(Duration::from_secs(1)).with_sleeper(sleeper.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(delay.wait(0, &cancel).await, Err(Canceled));
        assert_eq!(sleeper.call_count(), 0);
        assert_eq!(NoDelay.wait(0, &cancel).await, Err(Canceled));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_a_long_wait() {
        let delay = BackoffDelay::fixed(Duration::from_secs(3600));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let start = tokio::time::Instant::now();
        assert_eq!(delay.wait(0, &cancel).await, Err(Canceled));
        assert!(start.elapsed() < Duration::from_secs(3600));
    }

    #[test]
    fn default_delay_is_shared() {
        let a = default_delay();
        let b = default_delay();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
