//! Status vocabulary shared by runners and chains.

use std::fmt;

/// Lifecycle of a runner or of a whole chain.
///
/// `NotRun` is the initial state and `Running` is only observable mid-execution.
/// The remaining four variants are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RetryStatus {
    /// Never executed.
    #[default]
    NotRun,
    /// Currently executing.
    Running,
    /// Succeeded on the first attempt.
    Success,
    /// Succeeded after at least one failed attempt.
    SuccessAfterRetries,
    /// Exhausted every attempt, or an error policy rejected a failure.
    Fail,
    /// Aborted through a cancellation token.
    Canceled,
}

impl RetryStatus {
    /// `true` once execution has finished, whatever the outcome.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::SuccessAfterRetries | Self::Fail | Self::Canceled)
    }

    /// `true` for `Success` and `SuccessAfterRetries`.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::SuccessAfterRetries)
    }
}

impl fmt::Display for RetryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotRun => "not_run",
            Self::Running => "running",
            Self::Success => "success",
            Self::SuccessAfterRetries => "success_after_retries",
            Self::Fail => "fail",
            Self::Canceled => "canceled",
        };
        f.write_str(label)
    }
}
