//! Provider-level error type.

use citycast_core::retry::{is_retryable_status, RetryDecision};
use citycast_core::{AppError, NetworkError, ReqwestErrorExt};
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("City \"{0}\" not found")]
    NotFound(String),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Rate limited")]
    RateLimited,

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

impl WeatherError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited => true,
            Self::Api { status, .. } => StatusCode::from_u16(*status)
                .map(|s| is_retryable_status(s) == RetryDecision::Retry)
                .unwrap_or(false),
            Self::Network(e) => {
                if e.is_timeout() || e.is_connect() {
                    true
                } else if let Some(status) = e.status() {
                    is_retryable_status(status) == RetryDecision::Retry
                } else {
                    !e.is_decode() && !e.is_builder()
                }
            }
            Self::NotFound(_) | Self::InvalidApiKey | Self::Parse(_) | Self::InvalidUrl(_) => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        use citycast_core::WeatherError as Core;
        match e {
            WeatherError::NotFound(city) => AppError::Weather(Core::CityNotFound(city)),
            WeatherError::InvalidApiKey => AppError::Weather(Core::InvalidApiKey),
            WeatherError::RateLimited => AppError::Weather(Core::RateLimited),
            WeatherError::Api { status, .. } if status >= 500 => {
                AppError::Weather(Core::ServiceUnavailable)
            }
            WeatherError::Api { status, message } => {
                AppError::Weather(Core::ApiError(format!("{}: {}", status, message)))
            }
            WeatherError::Network(e) => AppError::Network(e.into_network_error()),
            WeatherError::Parse(msg) => AppError::Network(NetworkError::InvalidResponse(msg)),
            WeatherError::InvalidUrl(msg) => AppError::Weather(Core::ApiError(msg)),
        }
    }
}
