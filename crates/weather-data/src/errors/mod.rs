//! Error types and retry classification for the weather data crate.
//!
//! This module provides:
//! - [`WeatherDataError`]: The main error enum for all weather data operations
//! - [`ErrorClass`]: Classification for determining retry behavior

mod retry;

pub use retry::ErrorClass;

use thiserror::Error;

/// Errors that can occur during weather data operations.
///
/// Each variant is classified into an [`ErrorClass`] via the
/// [`error_class`](Self::error_class) method, which determines how the fetch
/// loop handles the error: wait for connectivity, wait for a new credential,
/// or back off and retry.
#[derive(Error, Debug)]
pub enum WeatherDataError {
    /// The device is offline or the weather host is unreachable.
    /// Recovered by waiting for the connectivity signal, not by backoff.
    #[error("Network unreachable")]
    Offline,

    /// The API key was rejected by the provider.
    /// Recovered by waiting for an updated credential.
    #[error("Invalid API key")]
    InvalidApiKey,

    /// The requested city was not found by the provider.
    #[error("City not found: {0}")]
    CityNotFound(String),

    /// The provider returned a server-side error (HTTP 5xx).
    #[error("Server failure: HTTP {status}")]
    ServerFailure {
        /// The HTTP status code returned by the provider
        status: u16,
    },

    /// The provider rate limited the request (HTTP 429).
    #[error("Rate limited")]
    RateLimited,

    /// Failed to parse the provider response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A network error occurred while communicating with the provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl WeatherDataError {
    /// Returns the retry classification for this error.
    ///
    /// - [`ErrorClass::Connectivity`]: suspend until online, no budget consumed
    /// - [`ErrorClass::InvalidCredential`]: suspend until a credential arrives
    /// - [`ErrorClass::Transient`]: back off linearly and retry
    ///
    /// # Examples
    ///
    /// ```
    /// use weathercast_weather_data::errors::{ErrorClass, WeatherDataError};
    ///
    /// let error = WeatherDataError::Offline;
    /// assert_eq!(error.error_class(), ErrorClass::Connectivity);
    ///
    /// let error = WeatherDataError::InvalidApiKey;
    /// assert_eq!(error.error_class(), ErrorClass::InvalidCredential);
    /// ```
    pub fn error_class(&self) -> ErrorClass {
        match self {
            Self::Offline => ErrorClass::Connectivity,

            // Connection refused / host unreachable behaves like offline;
            // timeouts and body errors are ordinary transient failures.
            Self::Network(e) if e.is_connect() => ErrorClass::Connectivity,

            Self::InvalidApiKey => ErrorClass::InvalidCredential,

            Self::CityNotFound(_)
            | Self::ServerFailure { .. }
            | Self::RateLimited
            | Self::Parse(_)
            | Self::Network(_) => ErrorClass::Transient,
        }
    }
}
