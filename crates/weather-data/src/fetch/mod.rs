//! Fetch service: drives one weather request through retries to a
//! display-ready value.
//!
//! Each logical request runs an explicit state machine:
//!
//! ```text
//! Requesting --success--> done (cache updated)
//!     |
//!   failure --> RetryPolicy decision
//!     |-- AwaitConnectivity --> wait for online signal --> Requesting
//!     |-- AwaitCredential   --> wait for new api key   --> Requesting
//!     |-- Backoff(d)        --> sleep d                --> Requesting
//!     '-- GiveUp            --> terminal error --> fallback (cache or empty)
//! ```
//!
//! Connectivity and credential waits suspend on watch channels and consume
//! no timer; backoff is linear per the policy. Every suspension point is
//! raced against the request's cancellation token, so tearing down the
//! owning scope aborts pending sleeps and signal waits with no side effects
//! beyond cache writes that already landed.
//!
//! The consumer-facing surface never produces an error: a terminal failure
//! is substituted with the last-known-good cached report, or the empty
//! placeholder when nothing was ever cached.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::watch;

use crate::cache::ResponseCache;
use crate::display::{error_message, ErrorSink};
use crate::errors::WeatherDataError;
use crate::models::WeatherReport;
use crate::provider::WeatherProvider;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::signals::{CancelToken, ConnectivityStatus};

/// Per-request state. `attempt` counts only budget-consuming attempts.
enum FetchState {
    Requesting {
        attempt: u32,
    },
    AwaitingConnectivity {
        attempt: u32,
        error: WeatherDataError,
    },
    AwaitingCredential {
        attempt: u32,
        error: WeatherDataError,
    },
    BackingOff {
        attempt: u32,
        delay: Duration,
    },
}

/// Weather fetch service.
///
/// Owns the provider, the response cache, the retry policy and the external
/// signal receivers. The service is `&self`-shareable: retries within one
/// request are strictly sequential, while requests for different keys may
/// run concurrently on the same service.
pub struct WeatherService {
    provider: Arc<dyn WeatherProvider>,
    cache: Arc<dyn ResponseCache>,
    policy: RetryPolicy,
    connectivity: watch::Receiver<ConnectivityStatus>,
    credentials: watch::Receiver<String>,
    error_sink: Option<Arc<dyn ErrorSink>>,
}

impl WeatherService {
    /// Create a service with the default retry policy and no error sink.
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        cache: Arc<dyn ResponseCache>,
        connectivity: watch::Receiver<ConnectivityStatus>,
        credentials: watch::Receiver<String>,
    ) -> Self {
        Self {
            provider,
            cache,
            policy: RetryPolicy::default(),
            connectivity,
            credentials,
            error_sink: None,
        }
    }

    /// Replace the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Attach a sink that receives a user-facing message per failed attempt.
    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.error_sink = Some(sink);
        self
    }

    /// Fetch a report for `key`, always producing a display-ready value.
    ///
    /// Retries per the policy; on terminal failure the last-known-good
    /// cached report is substituted, or [`WeatherReport::empty`] when the
    /// key was never cached.
    pub async fn fetch(&self, key: &str) -> WeatherReport {
        match self.try_fetch(key).await {
            Ok(report) => report,
            Err(error) => self.fallback(key, &error),
        }
    }

    /// Like [`fetch`](Self::fetch), tied to a cancellation scope.
    ///
    /// Returns `None` if the scope is cancelled while the request is in
    /// flight, including during backoff sleeps and signal waits.
    pub async fn fetch_cancellable(&self, key: &str, mut token: CancelToken) -> Option<WeatherReport> {
        match self.run(key, &mut token).await? {
            Ok(report) => Some(report),
            Err(error) => Some(self.fallback(key, &error)),
        }
    }

    /// Fetch with retries but without fallback substitution.
    ///
    /// Surfaces the terminal error once the attempt budget is exhausted.
    /// [`fetch`](Self::fetch) layers the cache/empty substitution on top.
    pub async fn try_fetch(&self, key: &str) -> Result<WeatherReport, WeatherDataError> {
        let mut token = CancelToken::never();
        match self.run(key, &mut token).await {
            Some(result) => result,
            // The never-token cannot cancel.
            None => unreachable!("fetch cancelled without a cancellation scope"),
        }
    }

    /// Drive the state machine for one request.
    ///
    /// Returns `None` on cancellation, `Some(Err)` on terminal failure.
    async fn run(
        &self,
        key: &str,
        token: &mut CancelToken,
    ) -> Option<Result<WeatherReport, WeatherDataError>> {
        let mut connectivity = self.connectivity.clone();
        let mut credentials = self.credentials.clone();
        let mut state = FetchState::Requesting { attempt: 0 };

        loop {
            state = match state {
                FetchState::Requesting { attempt } => {
                    debug!(
                        "Requesting '{}' from provider '{}' (attempt {})",
                        key,
                        self.provider.id(),
                        attempt
                    );

                    let result = tokio::select! {
                        _ = token.cancelled() => return None,
                        result = self.provider.current_weather(key) => result,
                    };

                    match result {
                        Ok(report) => {
                            self.cache.put(key, report.clone());
                            return Some(Ok(report));
                        }
                        Err(error) => {
                            if let Some(sink) = &self.error_sink {
                                sink.display_error(error_message(&error));
                            }
                            match self.next_state(key, attempt, error) {
                                Ok(next) => next,
                                Err(terminal) => return Some(Err(terminal)),
                            }
                        }
                    }
                }

                FetchState::AwaitingConnectivity { attempt, error } => {
                    info!("'{}': offline, waiting for connectivity", key);
                    loop {
                        if connectivity.borrow_and_update().is_online() {
                            break;
                        }
                        let changed = tokio::select! {
                            _ = token.cancelled() => return None,
                            changed = connectivity.changed() => changed,
                        };
                        if changed.is_err() {
                            // Monitor dropped; the wait can never resume.
                            warn!("'{}': connectivity monitor gone, giving up", key);
                            return Some(Err(error));
                        }
                    }
                    info!("'{}': back online, retrying", key);
                    FetchState::Requesting { attempt }
                }

                FetchState::AwaitingCredential { attempt, error } => {
                    info!("'{}': waiting for an updated api key", key);
                    loop {
                        let changed = tokio::select! {
                            _ = token.cancelled() => return None,
                            changed = credentials.changed() => changed,
                        };
                        if changed.is_err() {
                            warn!("'{}': credential source gone, giving up", key);
                            return Some(Err(error));
                        }
                        if !credentials.borrow_and_update().is_empty() {
                            break;
                        }
                    }
                    info!("'{}': new api key received, retrying", key);
                    FetchState::Requesting { attempt }
                }

                FetchState::BackingOff { attempt, delay } => {
                    debug!("'{}': retrying after {:?}", key, delay);
                    tokio::select! {
                        _ = token.cancelled() => return None,
                        _ = tokio::time::sleep(delay) => {}
                    }
                    FetchState::Requesting { attempt }
                }
            };
        }
    }

    /// Apply the retry policy to a failed attempt.
    ///
    /// `Err` carries the error back out as terminal.
    fn next_state(
        &self,
        key: &str,
        attempt: u32,
        error: WeatherDataError,
    ) -> Result<FetchState, WeatherDataError> {
        let class = error.error_class();
        match self.policy.decide(class, attempt) {
            RetryDecision::AwaitConnectivity => {
                Ok(FetchState::AwaitingConnectivity { attempt, error })
            }
            RetryDecision::AwaitCredential => Ok(FetchState::AwaitingCredential {
                attempt: attempt + 1,
                error,
            }),
            RetryDecision::Backoff(delay) => Ok(FetchState::BackingOff {
                attempt: attempt + 1,
                delay,
            }),
            RetryDecision::GiveUp => {
                warn!("'{}': attempt budget exhausted: {}", key, error);
                Err(error)
            }
        }
    }

    /// Substitute a terminal failure with a display-ready value.
    fn fallback(&self, key: &str, error: &WeatherDataError) -> WeatherReport {
        match self.cache.get(key) {
            Some(report) => {
                info!("'{}': terminal failure ({}), serving cached report", key, error);
                report
            }
            None => {
                info!("'{}': terminal failure ({}), serving empty report", key, error);
                WeatherReport::empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::time::Instant;

    use crate::cache::InMemoryResponseCache;
    use crate::signals::{ApiCredentials, CancelScope, ConnectivityMonitor, ConnectivityStatus};

    /// Provider that replays a pre-arranged sequence of results.
    struct ScriptedProvider {
        script: Mutex<VecDeque<Result<WeatherReport, WeatherDataError>>>,
        calls: AtomicU32,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<WeatherReport, WeatherDataError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WeatherProvider for ScriptedProvider {
        fn id(&self) -> &'static str {
            "SCRIPTED"
        }

        async fn current_weather(&self, _city: &str) -> Result<WeatherReport, WeatherDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted provider ran out of responses")
        }
    }

    /// Sink that collects every displayed message.
    struct CollectingSink {
        messages: Mutex<Vec<String>>,
    }

    impl CollectingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                messages: Mutex::new(Vec::new()),
            })
        }

        fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl ErrorSink for CollectingSink {
        fn display_error(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    fn paris() -> WeatherReport {
        WeatherReport {
            city_name: "Paris".to_string(),
            temperature: 21.0,
            humidity: 60,
            icon: "01d".to_string(),
        }
    }

    fn server_error(status: u16) -> WeatherDataError {
        WeatherDataError::ServerFailure { status }
    }

    struct Fixture {
        monitor: ConnectivityMonitor,
        credentials: ApiCredentials,
        cache: Arc<InMemoryResponseCache>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                monitor: ConnectivityMonitor::new(),
                credentials: ApiCredentials::with_key("valid-key"),
                cache: Arc::new(InMemoryResponseCache::new()),
            }
        }

        fn service(&self, provider: Arc<ScriptedProvider>) -> WeatherService {
            WeatherService::new(
                provider,
                self.cache.clone(),
                self.monitor.subscribe(),
                self.credentials.subscribe(),
            )
        }
    }

    #[tokio::test]
    async fn test_success_updates_cache() {
        let fixture = Fixture::new();
        let provider = ScriptedProvider::new(vec![Ok(paris())]);
        let service = fixture.service(provider.clone());

        let report = service.fetch("Paris").await;

        assert_eq!(report, paris());
        assert_eq!(fixture.cache.get("Paris"), Some(paris()));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generic_failures_back_off_linearly() {
        let fixture = Fixture::new();
        let provider = ScriptedProvider::new(vec![
            Err(server_error(500)),
            Err(server_error(500)),
            Err(server_error(500)),
            Ok(paris()),
        ]);
        let service = fixture.service(provider.clone());

        let started = Instant::now();
        let report = service.try_fetch("Paris").await.unwrap();

        // Three retries at 1s, 2s, 3s.
        assert_eq!(started.elapsed(), Duration::from_secs(6));
        assert_eq!(report, paris());
        assert_eq!(provider.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_after_max_attempts() {
        let fixture = Fixture::new();
        let provider = ScriptedProvider::new(vec![
            Err(server_error(500)),
            Err(server_error(500)),
            Err(server_error(500)),
            Err(server_error(503)),
        ]);
        let service = fixture.service(provider.clone());

        let started = Instant::now();
        let error = service.try_fetch("Paris").await.unwrap_err();

        // The terminal error is the last one observed, after 1s + 2s + 3s.
        assert!(matches!(error, WeatherDataError::ServerFailure { status: 503 }));
        assert_eq!(started.elapsed(), Duration::from_secs(6));
        assert_eq!(provider.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_failure_falls_back_to_cached_report() {
        let fixture = Fixture::new();
        fixture.cache.put("Paris", paris());

        let provider = ScriptedProvider::new(vec![
            Err(server_error(500)),
            Err(server_error(500)),
            Err(server_error(500)),
            Err(server_error(500)),
        ]);
        let service = fixture.service(provider.clone());

        let report = service.fetch("Paris").await;

        assert_eq!(report, paris());
        assert!(!report.is_empty());
        assert_eq!(provider.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_failure_without_cache_yields_empty_report() {
        let fixture = Fixture::new();
        let provider = ScriptedProvider::new(vec![
            Err(server_error(500)),
            Err(server_error(500)),
            Err(server_error(500)),
            Err(server_error(500)),
        ]);
        let service = fixture.service(provider.clone());

        let report = service.fetch("Paris").await;

        assert!(report.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connectivity_failures_consume_no_budget() {
        let fixture = Fixture::new();
        fixture.monitor.set(ConnectivityStatus::Offline);

        // More connectivity failures than the attempt budget allows, then
        // success: only possible if they consume no attempts.
        let provider = ScriptedProvider::new(vec![
            Err(WeatherDataError::Offline),
            Err(WeatherDataError::Offline),
            Err(WeatherDataError::Offline),
            Err(WeatherDataError::Offline),
            Err(WeatherDataError::Offline),
            Ok(paris()),
        ]);
        let service = fixture.service(provider.clone());

        let monitor = &fixture.monitor;
        let started = Instant::now();

        let fetch = service.try_fetch("Paris");
        let flip = async {
            // Runs once the fetch suspends on the connectivity wait.
            tokio::task::yield_now().await;
            monitor.set(ConnectivityStatus::Online);
        };
        let (report, _) = tokio::join!(fetch, flip);

        // No backoff timers were involved.
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(report.unwrap(), paris());
        assert_eq!(provider.calls(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_credential_failure_waits_for_new_key() {
        let fixture = Fixture::new();
        let provider = ScriptedProvider::new(vec![
            Err(WeatherDataError::InvalidApiKey),
            Ok(paris()),
        ]);
        let service = fixture.service(provider.clone());

        let credentials = &fixture.credentials;
        let started = Instant::now();

        let fetch = service.try_fetch("Paris");
        let publish = async {
            tokio::task::yield_now().await;
            credentials.set("fresh-key");
        };
        let (report, _) = tokio::join!(fetch, publish);

        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(report.unwrap(), paris());
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_credential_failure_on_final_attempt_is_terminal() {
        let fixture = Fixture::new();
        let provider = ScriptedProvider::new(vec![
            Err(server_error(500)),
            Err(server_error(500)),
            Err(server_error(500)),
            Err(WeatherDataError::InvalidApiKey),
        ]);
        let service = fixture.service(provider.clone());

        let error = service.try_fetch("Paris").await.unwrap_err();

        assert!(matches!(error, WeatherDataError::InvalidApiKey));
        assert_eq!(provider.calls(), 4);
    }

    #[tokio::test]
    async fn test_repeated_credential_failures_exhaust_budget() {
        let fixture = Fixture::new();
        let provider = ScriptedProvider::new(vec![
            Err(WeatherDataError::InvalidApiKey),
            Err(WeatherDataError::InvalidApiKey),
            Err(WeatherDataError::InvalidApiKey),
            Err(WeatherDataError::InvalidApiKey),
        ]);
        let service = fixture.service(provider.clone());

        let credentials = &fixture.credentials;
        let fetch = service.try_fetch("Paris");
        let publish = async {
            // Keep publishing fresh keys; every rejection still consumes an
            // attempt, so the budget runs out regardless.
            for n in 0..8 {
                tokio::task::yield_now().await;
                credentials.set(format!("fresh-key-{}", n));
            }
        };
        let (result, _) = tokio::join!(fetch, publish);

        assert!(matches!(result.unwrap_err(), WeatherDataError::InvalidApiKey));
        assert_eq!(provider.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_backoff() {
        let fixture = Fixture::new();
        let provider = ScriptedProvider::new(vec![Err(server_error(500))]);
        let service = fixture.service(provider.clone());

        let scope = CancelScope::new();
        let token = scope.token();

        let fetch = service.fetch_cancellable("Paris", token);
        let cancel = async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            scope.cancel();
        };
        let (result, _) = tokio::join!(fetch, cancel);

        // Cancelled half-way through the first 1s backoff.
        assert_eq!(result, None);
        assert_eq!(provider.calls(), 1);
        assert!(fixture.cache.get("Paris").is_none());
    }

    #[tokio::test]
    async fn test_cancellation_during_connectivity_wait() {
        let fixture = Fixture::new();
        fixture.monitor.set(ConnectivityStatus::Offline);

        let provider = ScriptedProvider::new(vec![Err(WeatherDataError::Offline)]);
        let service = fixture.service(provider.clone());

        let scope = CancelScope::new();
        let token = scope.token();

        let fetch = service.fetch_cancellable("Paris", token);
        let cancel = async {
            tokio::task::yield_now().await;
            scope.cancel();
        };
        let (result, _) = tokio::join!(fetch, cancel);

        assert_eq!(result, None);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_sink_receives_display_messages() {
        let fixture = Fixture::new();
        let provider = ScriptedProvider::new(vec![
            Err(WeatherDataError::CityNotFound("Paris".to_string())),
            Err(server_error(500)),
            Ok(paris()),
        ]);
        let sink = CollectingSink::new();
        let service = fixture.service(provider).with_error_sink(sink.clone());

        let report = service.fetch("Paris").await;

        assert_eq!(report, paris());
        assert_eq!(sink.messages(), vec!["City Name is invalid", "Server error"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_policy_is_honored() {
        let fixture = Fixture::new();
        let provider = ScriptedProvider::new(vec![
            Err(server_error(500)),
            Err(server_error(500)),
        ]);
        let service = fixture.service(provider.clone()).with_policy(RetryPolicy {
            max_attempts: 2,
            backoff_unit: Duration::from_millis(100),
        });

        let started = Instant::now();
        let error = service.try_fetch("Paris").await.unwrap_err();

        assert!(matches!(error, WeatherDataError::ServerFailure { status: 500 }));
        assert_eq!(started.elapsed(), Duration::from_millis(100));
        assert_eq!(provider.calls(), 2);
    }
}
