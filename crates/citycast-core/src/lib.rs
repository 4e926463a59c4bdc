pub mod config;
pub mod error;
pub mod retry;

pub use config::{
    CitiesConfig, Config, DefaultCity, RetrySettings, StorageConfig, Units, ValidationResult,
    WeatherSettings,
};
pub use error::{
    AppError, ConfigError, NetworkError, ReqwestErrorExt, RusqliteErrorExt, StorageError,
    ValidationError, WeatherError,
};
pub use retry::{with_retry, with_retry_if, RetryConfig, RetryDecision};

use anyhow::Result;

/// Initialize logging for the application
///
/// # Errors
/// Fails if a global subscriber has already been installed.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::debug!("CityCast core initialized");
    Ok(())
}
