//! Jitter applied on top of a backoff curve.
//!
//! - `None`: exact backoff; deterministic, the default.
//! - `Full`: uniform in `[0, delay]`.
//! - `Equal`: uniform in `[delay/2, delay]`, keeps a floor.
//!
//! Every variant is stateless, so a jittered delay can sit inside the shared default delay.
//! Randomness comes from `rand`'s thread-local RNG; tests inject one via `apply_with_rng`.

use rand::{rng, Rng};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Jitter {
    #[default]
    None,
    Full,
    Equal,
}

impl Jitter {
    pub fn full() -> Self {
        Jitter::Full
    }

    pub fn equal() -> Self {
        Jitter::Equal
    }

    /// Randomize `delay` with the thread-local RNG.
    pub fn apply(&self, delay: Duration) -> Duration {
        let mut rng = rng();
        self.apply_with_rng(delay, &mut rng)
    }

    /// Randomize `delay` with a caller-supplied RNG.
    pub fn apply_with_rng<R: Rng>(&self, delay: Duration, rng: &mut R) -> Duration {
        let nanos: u64 = delay.as_nanos().try_into().unwrap_or(u64::MAX);
        match self {
            Jitter::None => delay,
            _ if nanos == 0 => Duration::ZERO,
            Jitter::Full => Duration::from_nanos(rng.random_range(0..=nanos)),
            Jitter::Equal => Duration::from_nanos(rng.random_range(nanos - nanos / 2..=nanos)),
        }
    }
}
