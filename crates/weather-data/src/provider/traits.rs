//! Weather provider trait definitions.
//!
//! This module defines the `WeatherProvider` trait that all weather data
//! sources must implement.

use async_trait::async_trait;

use crate::errors::WeatherDataError;
use crate::models::WeatherReport;

/// Trait for weather data sources.
///
/// Implement this trait to back the fetch service with a new source. The
/// service treats the provider as a single-shot request: each retry calls
/// `current_weather` again from scratch.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use weathercast_weather_data::provider::WeatherProvider;
///
/// struct MyProvider;
///
/// #[async_trait]
/// impl WeatherProvider for MyProvider {
///     fn id(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     async fn current_weather(&self, city: &str) -> Result<WeatherReport, WeatherDataError> {
///         // ... perform the request
///     }
/// }
/// ```
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// Should be a constant string like "OPEN_WEATHER". Used for logging.
    fn id(&self) -> &'static str;

    /// Fetch the current weather for a city.
    ///
    /// # Arguments
    ///
    /// * `city` - The city name to look up
    ///
    /// # Returns
    ///
    /// A display-ready report on success, or a `WeatherDataError` on failure.
    async fn current_weather(&self, city: &str) -> Result<WeatherReport, WeatherDataError>;
}
