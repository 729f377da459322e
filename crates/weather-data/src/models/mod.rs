//! Data model for weather lookups.

use serde::{Deserialize, Serialize};

/// Type alias for a cacheable request identifier (a city name).
pub type QueryKey = String;

/// City name used by the placeholder report.
const EMPTY_CITY: &str = "Unknown";

/// A display-ready weather report for one city.
///
/// This is the single value type flowing out of the fetch pipeline. Consumers
/// always receive one, either fresh from the provider, replayed from the
/// response cache, or the [`empty`](Self::empty) placeholder.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct WeatherReport {
    /// Resolved city name as reported by the provider.
    pub city_name: String,
    /// Temperature in degrees Celsius.
    pub temperature: f64,
    /// Relative humidity, 0-100.
    pub humidity: u8,
    /// Provider icon code (e.g., "01d").
    pub icon: String,
}

impl WeatherReport {
    /// The designated placeholder shown when no data is available.
    ///
    /// Substituted on terminal failure when the cache holds nothing for the
    /// requested key.
    pub fn empty() -> Self {
        Self {
            city_name: EMPTY_CITY.to_string(),
            temperature: 0.0,
            humidity: 0,
            icon: String::new(),
        }
    }

    /// Returns true if this report is the placeholder.
    pub fn is_empty(&self) -> bool {
        self.city_name == EMPTY_CITY && self.icon.is_empty()
    }
}
