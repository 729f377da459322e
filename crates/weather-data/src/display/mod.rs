//! UI error-display seam.
//!
//! The fetch service never surfaces raw errors; it reports a display-ready
//! message through this sink as each attempt fails, and the final value it
//! returns is always a report. Rendering is entirely the consumer's concern.

use crate::errors::WeatherDataError;

/// Sink for user-facing error messages.
pub trait ErrorSink: Send + Sync {
    /// Display a message to the user.
    fn display_error(&self, message: &str);
}

/// Map an error onto the message shown to the user.
pub fn error_message(error: &WeatherDataError) -> &'static str {
    match error {
        WeatherDataError::CityNotFound(_) => "City Name is invalid",
        WeatherDataError::ServerFailure { .. } => "Server error",
        WeatherDataError::InvalidApiKey => "Key is invalid",
        _ => "An error occurred",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_errors_have_specific_messages() {
        assert_eq!(
            error_message(&WeatherDataError::CityNotFound("Atlantis".to_string())),
            "City Name is invalid"
        );
        assert_eq!(
            error_message(&WeatherDataError::ServerFailure { status: 500 }),
            "Server error"
        );
        assert_eq!(
            error_message(&WeatherDataError::InvalidApiKey),
            "Key is invalid"
        );
    }

    #[test]
    fn test_other_errors_get_generic_message() {
        assert_eq!(
            error_message(&WeatherDataError::Offline),
            "An error occurred"
        );
        assert_eq!(
            error_message(&WeatherDataError::RateLimited),
            "An error occurred"
        );
    }
}
