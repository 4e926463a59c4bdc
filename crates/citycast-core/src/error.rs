//! Centralized error types for CityCast.
//!
//! Every layer converts into [`AppError`]; `user_message()` yields the short
//! text shown inline in the affected dashboard panel, while `Display` keeps
//! the full context for logs.

use thiserror::Error;

/// Top-level application error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Weather service error: {0}")]
    Weather(#[from] WeatherError),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a message suitable for inline display in a panel.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Network(e) => e.user_message().to_string(),
            AppError::Storage(e) => e.user_message().to_string(),
            AppError::Config(e) => e.user_message().to_string(),
            AppError::Weather(e) => e.user_message(),
            // Validation text is already written for the user.
            AppError::Validation(e) => e.to_string(),
            AppError::Io(_) => "A file operation failed. Please try again.".to_string(),
            AppError::Other(_) => "An unexpected error occurred. Please try again.".to_string(),
        }
    }

    /// True for errors caused by user input rather than the environment.
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to connect. Check your internet connection."
            }
            NetworkError::Timeout => "The request timed out. Please try again.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The server is experiencing issues. Please try again later."
            }
            NetworkError::ServerError { .. } => "The request failed. Please try again.",
            NetworkError::InvalidResponse(_) => {
                "Received an unexpected response. Please try again."
            }
        }
    }
}

/// Local storage errors (the saved city list).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Stored data is corrupted: {0}")]
    Corruption(String),
}

impl StorageError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StorageError::Unavailable(_) => {
                "Unable to access saved cities. Try restarting the app."
            }
            StorageError::WriteFailed(_) => "Saving your cities failed. Please try again.",
            StorageError::Corruption(_) => {
                "Saved cities may be corrupted. Consider resetting app data."
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
            ConfigError::MissingSetting(_) => "A required setting is missing. Check your settings.",
        }
    }
}

/// Weather service errors as seen by the application layer.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("City \"{0}\" not found")]
    CityNotFound(String),

    #[error("Weather API error: {0}")]
    ApiError(String),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Rate limited")]
    RateLimited,

    #[error("Service unavailable")]
    ServiceUnavailable,
}

impl WeatherError {
    pub fn user_message(&self) -> String {
        match self {
            WeatherError::CityNotFound(city) => format!("City \"{}\" not found", city),
            WeatherError::ApiError(_) => "Failed to fetch weather data. Please try again.".to_string(),
            WeatherError::InvalidApiKey => "Weather API key is invalid. Check settings.".to_string(),
            WeatherError::RateLimited => {
                "Too many weather requests. Please wait a moment.".to_string()
            }
            WeatherError::ServiceUnavailable => {
                "Weather service unavailable. Please try again later.".to_string()
            }
        }
    }
}

/// User input errors, surfaced inline and never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("City name must be at least {min} characters")]
    TooShort { min: usize },

    #[error("City name must be at most {max} characters")]
    TooLong { max: usize },

    #[error("Position {index} is out of range for {len} cities")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}

/// Extension trait for converting rusqlite errors to our error types.
pub trait RusqliteErrorExt {
    fn into_storage_error(self) -> StorageError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_storage_error(self) -> StorageError {
        match &self {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("corrupt") => {
                StorageError::Corruption(self.to_string())
            }
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::CannotOpen =>
            {
                StorageError::Unavailable(self.to_string())
            }
            _ => StorageError::WriteFailed(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_conversion() {
        let err: AppError = WeatherError::InvalidApiKey.into();
        assert!(matches!(err, AppError::Weather(WeatherError::InvalidApiKey)));
    }

    #[test]
    fn test_not_found_message_names_city() {
        let err = AppError::Weather(WeatherError::CityNotFound("Atlantis".into()));
        assert_eq!(err.user_message(), "City \"Atlantis\" not found");
    }

    #[test]
    fn test_validation_message_is_shown_verbatim() {
        let err = AppError::from(ValidationError::TooShort { min: 2 });
        assert!(err.is_validation());
        assert_eq!(err.user_message(), "City name must be at least 2 characters");
    }

    #[test]
    fn test_server_error_message_depends_on_status() {
        let server = NetworkError::ServerError {
            status: 503,
            message: "down".into(),
        };
        let client = NetworkError::ServerError {
            status: 400,
            message: "bad".into(),
        };
        assert!(server.user_message().contains("server"));
        assert_eq!(client.user_message(), "The request failed. Please try again.");
    }

    #[test]
    fn test_unexpected_errors_are_generic() {
        let err = AppError::Other(anyhow::anyhow!("boom"));
        assert_eq!(
            err.user_message(),
            "An unexpected error occurred. Please try again."
        );
    }
}
