//! OpenWeather current-weather provider implementation.
//!
//! Fetches current conditions from the OpenWeather API `/weather` endpoint
//! (`?q={city}&units=metric&appid={key}`). The API key is read from the
//! credential signal at request time, so a key published after a 401 is
//! picked up by the next retry without rebuilding the provider.
//!
//! API documentation: https://openweathermap.org/current

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::errors::WeatherDataError;
use crate::models::WeatherReport;
use crate::provider::WeatherProvider;

const BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
const PROVIDER_ID: &str = "OPEN_WEATHER";

// ============================================================================
// API Response Structures
// ============================================================================

/// Response from /weather endpoint
#[derive(Debug, Deserialize)]
struct WeatherResponse {
    /// Resolved city name
    name: String,
    /// Temperature and humidity block
    main: MainBlock,
    /// Weather conditions; the first entry carries the icon
    weather: Vec<ConditionBlock>,
}

/// "main" block of the /weather response
#[derive(Debug, Deserialize)]
struct MainBlock {
    /// Temperature (Celsius with units=metric)
    temp: f64,
    /// Relative humidity percentage
    humidity: u8,
}

/// One entry of the "weather" array
#[derive(Debug, Deserialize)]
struct ConditionBlock {
    /// Icon code, e.g. "01d"
    icon: String,
}

// ============================================================================
// OpenWeatherProvider
// ============================================================================

/// OpenWeather current-weather provider.
///
/// Free tier is limited to 60 calls per minute; the bounded retry budget of
/// the fetch service keeps well under that.
pub struct OpenWeatherProvider {
    client: Client,
    api_key: watch::Receiver<String>,
    base_url: String,
}

impl OpenWeatherProvider {
    /// Create a new provider reading its key from the credential signal.
    pub fn new(api_key: watch::Receiver<String>) -> Self {
        Self::with_base_url(api_key, BASE_URL)
    }

    /// Create a provider against a custom base URL.
    pub fn with_base_url(api_key: watch::Receiver<String>, base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn current_weather(&self, city: &str) -> Result<WeatherReport, WeatherDataError> {
        let key = self.api_key.borrow().clone();
        if key.is_empty() {
            // No point hitting the API; it would answer 401 anyway.
            return Err(WeatherDataError::InvalidApiKey);
        }

        let url = format!("{}/weather", self.base_url);
        debug!(city, "Fetching current weather");

        let response = self
            .client
            .get(&url)
            .query(&[("q", city), ("units", "metric"), ("appid", key.as_str())])
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            warn!(city, status = status.as_u16(), "Weather request failed");
            return Err(error_for_status(status, city));
        }

        let body = response.text().await.map_err(classify_request_error)?;
        parse_weather_response(&body)
    }
}

/// Map a transport-level reqwest error onto our error type.
///
/// Connection failures become `Offline` so the retry policy classifies them
/// as connectivity rather than transient.
fn classify_request_error(error: reqwest::Error) -> WeatherDataError {
    if error.is_connect() {
        WeatherDataError::Offline
    } else {
        WeatherDataError::Network(error)
    }
}

/// Map a non-success HTTP status onto our error type.
fn error_for_status(status: StatusCode, city: &str) -> WeatherDataError {
    match status {
        StatusCode::UNAUTHORIZED => WeatherDataError::InvalidApiKey,
        StatusCode::NOT_FOUND => WeatherDataError::CityNotFound(city.to_string()),
        StatusCode::TOO_MANY_REQUESTS => WeatherDataError::RateLimited,
        s => WeatherDataError::ServerFailure {
            status: s.as_u16(),
        },
    }
}

/// Parse a /weather response body into a report.
fn parse_weather_response(body: &str) -> Result<WeatherReport, WeatherDataError> {
    let response: WeatherResponse =
        serde_json::from_str(body).map_err(|e| WeatherDataError::Parse(e.to_string()))?;

    let icon = response
        .weather
        .first()
        .map(|c| c.icon.clone())
        .unwrap_or_default();

    Ok(WeatherReport {
        city_name: response.name,
        temperature: response.main.temp,
        humidity: response.main.humidity,
        icon,
    })
}
