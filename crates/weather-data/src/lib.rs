//! Weathercast Weather Data Crate
//!
//! This crate provides the resilient weather-lookup core for the Weathercast
//! application: classification-driven retry over a flaky HTTP provider, a
//! last-known-good response cache, and display-safe fallback.
//!
//! # Overview
//!
//! The weather data crate supports:
//! - Current-weather lookup by city name
//! - Error classification into connectivity, credential and transient failures
//! - Signal-gated recovery: offline requests wait for connectivity, rejected
//!   keys wait for a credential update
//! - Bounded linear backoff for everything else
//! - Fallback substitution so consumers never observe a raw error
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+
//! |     Consumer     | --> |  WeatherService  |  (per-request state machine)
//! +------------------+     +------------------+
//!                             |      |      |
//!               +-------------+      |      +--------------+
//!               v                    v                     v
//!       +---------------+   +---------------+   +------------------+
//!       |  RetryPolicy  |   | WeatherProvider|  |  ResponseCache   |
//!       | (pure decide) |   |  (HTTP source) |  | (last-known-good)|
//!       +---------------+   +---------------+   +------------------+
//!               |
//!               v
//!       +-----------------------------+
//!       | signals: connectivity watch |
//!       |          credential watch   |
//!       |          cancel scope/token |
//!       +-----------------------------+
//! ```
//!
//! # Core Types
//!
//! - [`WeatherService`] - Drives a request through retries to a value
//! - [`WeatherReport`] - Display-ready result, including the empty placeholder
//! - [`RetryPolicy`] / [`RetryDecision`] - Pure decision over (class, attempt)
//! - [`WeatherDataError`] / [`ErrorClass`] - Failures and their classification
//! - [`ResponseCache`] - Injected last-known-good store
//! - [`CancelScope`] / [`CancelToken`] - Explicit request teardown

pub mod cache;
pub mod display;
pub mod errors;
pub mod fetch;
pub mod models;
pub mod provider;
pub mod retry;
pub mod signals;

// Re-export the public interface
pub use cache::{InMemoryResponseCache, ResponseCache};
pub use display::{error_message, ErrorSink};
pub use errors::{ErrorClass, WeatherDataError};
pub use fetch::WeatherService;
pub use models::{QueryKey, WeatherReport};
pub use retry::{RetryDecision, RetryPolicy};
pub use signals::{
    ApiCredentials, CancelScope, CancelToken, ConnectivityMonitor, ConnectivityStatus,
};

// Re-export provider types
pub use provider::{OpenWeatherProvider, WeatherProvider};
