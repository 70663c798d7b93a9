#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # TryIt
//!
//! Retry chains for async Rust: run an operation up to a bounded number of times, pause between
//! attempts, let policies veto failures or successes, and fall back to alternative operations
//! when one runs out of attempts.
//!
//! ## Features
//!
//! - **Runners** with per-attempt error and success policies
//! - **Pluggable delays** built on backoff curves (constant, linear, exponential) and jitter
//! - **Fallback chains** where each runner is tried only if every earlier one failed
//! - **Cooperative cancellation** checked before each attempt and during each delay
//! - **Full failure history** aggregated across the whole chain
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use tryit::{Backoff, BackoffDelay, Jitter, TryIt};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut chain = TryIt::new(|| async { Ok::<_, std::io::Error>("done") }, 3)
//!         .unwrap()
//!         .using_delay(
//!             BackoffDelay::new(Backoff::exponential(Duration::from_millis(100)))
//!                 .with_jitter(Jitter::full()),
//!         )
//!         .on_error(|e: &std::io::Error, _attempt| e.kind() != std::io::ErrorKind::NotFound);
//!
//!     let value = chain.go_async().await.unwrap();
//!     assert_eq!(value, "done");
//! }
//! ```

pub mod backoff;
pub mod cancel;
pub mod chain;
pub mod delay;
pub mod error;
pub mod jitter;
pub mod operation;
pub mod prelude;
pub mod runner;
pub mod sleeper;
pub mod status;

// Re-exports
pub use backoff::{Backoff, BackoffError};
pub use cancel::CancellationToken;
pub use chain::TryIt;
pub use delay::{default_delay, BackoffDelay, Delay, NoDelay, DEFAULT_DELAY};
pub use error::{Canceled, ConfigError, Failure, RetryError};
pub use jitter::Jitter;
pub use operation::Operation;
pub use runner::Runner;
pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
pub use status::RetryStatus;
