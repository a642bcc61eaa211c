//! Error types and handling for the `astroatmos` forecast pipeline

use thiserror::Error;

/// Main error type for the forecast pipeline
#[derive(Error, Debug)]
pub enum ForecastError {
    /// Configuration-related errors (missing or invalid values)
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Network or API communication errors
    #[error("API error: {message}")]
    Api { message: String },

    /// A source answered, but not in the format we expect
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// The configured location is outside a source's coverage
    #[error("Unsupported location: {message}")]
    UnsupportedLocation { message: String },

    /// Cache operation errors
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// Chart rendering errors
    #[error("Render error: {message}")]
    Render { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl ForecastError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a new unsupported-location error
    pub fn unsupported_location<S: Into<String>>(message: S) -> Self {
        Self::UnsupportedLocation {
            message: message.into(),
        }
    }

    /// Create a new cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Create a new render error
    pub fn render<S: Into<String>>(message: S) -> Self {
        Self::Render {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_unsupported_location(&self) -> bool {
        matches!(self, Self::UnsupportedLocation { .. })
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            ForecastError::Config { message } => {
                format!("Configuration error: {message}. Please check your forecast location file.")
            }
            ForecastError::Api { .. } => {
                "Unable to reach a forecast data source. Please check your internet connection."
                    .to_string()
            }
            ForecastError::Parse { .. } => {
                "A forecast data source returned data in an unexpected format.".to_string()
            }
            ForecastError::UnsupportedLocation { message } => {
                format!("Location not supported: {message}")
            }
            ForecastError::Cache { .. } => {
                "Cache operation failed. You may need to clear your cache.".to_string()
            }
            ForecastError::Render { message } => format!("Could not draw the forecast: {message}"),
            ForecastError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

impl From<reqwest_middleware::Error> for ForecastError {
    fn from(err: reqwest_middleware::Error) -> Self {
        ForecastError::api(err.to_string())
    }
}

impl From<reqwest::Error> for ForecastError {
    fn from(err: reqwest::Error) -> Self {
        ForecastError::api(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = ForecastError::config("missing lat");
        assert!(matches!(config_err, ForecastError::Config { .. }));

        let api_err = ForecastError::api("connection failed");
        assert!(matches!(api_err, ForecastError::Api { .. }));

        let unsupported = ForecastError::unsupported_location("outside NWS coverage");
        assert!(unsupported.is_unsupported_location());
        assert!(!api_err.is_unsupported_location());
    }

    #[test]
    fn test_user_messages() {
        let config_err = ForecastError::config("missing lat");
        assert!(config_err.user_message().contains("missing lat"));

        let api_err = ForecastError::api("test");
        assert!(api_err.user_message().contains("Unable to reach"));

        let unsupported = ForecastError::unsupported_location("51.5N, 0.1W");
        assert!(unsupported.user_message().contains("51.5N, 0.1W"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ForecastError = io_err.into();
        assert!(matches!(err, ForecastError::Io { .. }));
    }
}
