//! Weather data providers.

pub mod open_weather;
mod traits;

pub use open_weather::OpenWeatherProvider;
pub use traits::WeatherProvider;
