/// Classification for retry policy.
///
/// Used to determine how the fetch loop should respond to errors from the
/// weather provider.
///
/// # Behavior Summary
///
/// | Class | Consumes Attempt Budget? | Recovery |
/// |-------|--------------------------|----------|
/// | `Connectivity` | No | Wait for the connectivity signal to report online |
/// | `InvalidCredential` | Yes | Wait for a non-empty credential to be published |
/// | `Transient` | Yes | Linear backoff, then retry |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    /// The device is offline or the host is unreachable.
    ///
    /// Retrying immediately is pointless; the fetch loop suspends until an
    /// external connectivity signal reports online, then retries once per
    /// online transition. No attempt budget is consumed.
    Connectivity,

    /// The API credential was rejected (HTTP 401 or equivalent).
    ///
    /// The fetch loop suspends until a new non-empty credential is
    /// published, then retries. Counted against the attempt budget, so a
    /// credential failure on the final attempt terminates instead of
    /// stalling.
    InvalidCredential,

    /// Any other failure: server errors, rate limiting, parse failures.
    ///
    /// Retried with linear backoff until the attempt budget is exhausted.
    Transient,
}
