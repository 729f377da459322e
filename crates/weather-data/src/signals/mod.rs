//! External event sources the fetch loop suspends on.
//!
//! The retry policy recovers two error classes by waiting for an external
//! signal instead of a timer: connectivity failures wait for the network to
//! come back, credential failures wait for a new API key. Both signals are
//! `tokio::sync::watch` channels so that a waiter always observes the latest
//! value, and late subscribers see the current state immediately.
//!
//! Cancellation is a third watch channel wrapped in an explicit scope token:
//! dropping or cancelling the scope tears down every pending wait in the
//! fetch loop.

use tokio::sync::watch;

/// Network connectivity as reported by an external probe.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConnectivityStatus {
    /// The network is reachable.
    Online,
    /// The network is unreachable.
    Offline,
}

impl ConnectivityStatus {
    /// Returns true for [`ConnectivityStatus::Online`].
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }
}

/// Sender side of the connectivity signal.
///
/// Owned by whatever probes reachability (out of scope here); the fetch loop
/// holds the receiver. The initial state is `Online` so that a fetch issued
/// before the first probe result does not stall.
pub struct ConnectivityMonitor {
    tx: watch::Sender<ConnectivityStatus>,
}

impl ConnectivityMonitor {
    /// Create a monitor reporting `Online` until told otherwise.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectivityStatus::Online);
        Self { tx }
    }

    /// Create a monitor with an explicit initial status.
    pub fn with_status(status: ConnectivityStatus) -> Self {
        let (tx, _rx) = watch::channel(status);
        Self { tx }
    }

    /// Publish a new connectivity status.
    pub fn set(&self, status: ConnectivityStatus) {
        // send_replace stores the value even while no receiver exists, so
        // late subscribers still observe it.
        self.tx.send_replace(status);
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectivityStatus> {
        self.tx.subscribe()
    }

    /// The most recently published status.
    pub fn current(&self) -> ConnectivityStatus {
        *self.tx.borrow()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Holder of the current API credential.
///
/// Starts empty; the fetch loop treats an empty credential as "not yet
/// provided" and waits for the first non-empty value after a credential
/// failure.
pub struct ApiCredentials {
    tx: watch::Sender<String>,
}

impl ApiCredentials {
    /// Create an empty credential holder.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(String::new());
        Self { tx }
    }

    /// Create a holder pre-loaded with a key.
    pub fn with_key(key: impl Into<String>) -> Self {
        let (tx, _rx) = watch::channel(key.into());
        Self { tx }
    }

    /// Publish a new credential.
    pub fn set(&self, key: impl Into<String>) {
        // Stored even while no receiver exists.
        self.tx.send_replace(key.into());
    }

    /// Subscribe to credential updates.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.tx.subscribe()
    }

    /// The most recently published credential.
    pub fn current(&self) -> String {
        self.tx.borrow().clone()
    }
}

impl Default for ApiCredentials {
    fn default() -> Self {
        Self::new()
    }
}

/// Owner side of a cancellation scope.
///
/// Cancelling the scope (or dropping it) wakes every [`CancelToken`] cloned
/// from it. Used to tear down in-flight fetches including pending backoff
/// timers and signal waits.
pub struct CancelScope {
    tx: watch::Sender<bool>,
}

impl CancelScope {
    /// Create a live scope.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Obtain a token tied to this scope.
    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }

    /// Cancel the scope, waking all tokens.
    ///
    /// Stored even while no token exists, so tokens created afterwards are
    /// born cancelled.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for CancelScope {
    fn default() -> Self {
        Self::new()
    }
}

/// A cancellation token handed to one in-flight request.
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that can never be cancelled, for callers without a scope.
    pub fn never() -> Self {
        // Process-lifetime sender so the channel never closes.
        static NEVER: std::sync::OnceLock<watch::Sender<bool>> = std::sync::OnceLock::new();
        let tx = NEVER.get_or_init(|| watch::channel(false).0);
        Self { rx: tx.subscribe() }
    }

    /// Returns true once the owning scope has been cancelled or dropped.
    pub fn is_cancelled(&self) -> bool {
        // A closed channel means the scope was dropped; treat as cancelled.
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves when the owning scope is cancelled or dropped.
    pub async fn cancelled(&mut self) {
        if *self.rx.borrow() {
            return;
        }
        // An Err means the sender is gone, which also ends the scope.
        while self.rx.changed().await.is_ok() {
            if *self.rx.borrow() {
                return;
            }
        }
    }
}
