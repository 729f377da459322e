//! Retry policy: a pure decision function over (error class, attempt index).
//!
//! The policy holds no request state. Given the classification of the latest
//! failure and a 0-indexed attempt counter, it answers with one of four
//! decisions; the fetch loop carries them out and owns the counter.

use std::time::Duration;

use crate::errors::ErrorClass;

/// Default maximum attempts before a failure becomes terminal.
const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// Default linear backoff unit; retry N (0-indexed) waits (N + 1) units.
const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// What to do after a failed attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryDecision {
    /// Suspend until the connectivity signal reports online, then retry.
    /// Does not consume an attempt.
    AwaitConnectivity,

    /// Suspend until a non-empty credential is published, then retry.
    AwaitCredential,

    /// Sleep for the given duration, then retry.
    Backoff(Duration),

    /// The attempt budget is exhausted; propagate the error as terminal.
    GiveUp,
}

/// Retry policy configuration.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Maximum attempts per request before giving up.
    pub max_attempts: u32,
    /// Linear backoff unit.
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
        }
    }
}

impl RetryPolicy {
    /// Decide how to respond to a failure.
    ///
    /// `attempt` is 0-indexed and counts only budget-consuming attempts.
    /// The checks are ordered: connectivity failures are handled before the
    /// budget test (they never consume attempts and may wait indefinitely),
    /// credential failures after it (a credential failure on the final
    /// attempt terminates instead of stalling), and everything else backs
    /// off linearly: 1 unit, 2 units, 3 units.
    pub fn decide(&self, class: ErrorClass, attempt: u32) -> RetryDecision {
        if class == ErrorClass::Connectivity {
            return RetryDecision::AwaitConnectivity;
        }

        if attempt >= self.max_attempts.saturating_sub(1) {
            return RetryDecision::GiveUp;
        }

        if class == ErrorClass::InvalidCredential {
            return RetryDecision::AwaitCredential;
        }

        RetryDecision::Backoff(self.backoff_unit * (attempt + 1))
    }
}
