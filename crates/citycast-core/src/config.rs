use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::retry::RetryConfig;

/// Environment variable consulted when `weather.api_key` is empty.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Prefix for layered overrides, e.g. `CITYCAST_RETRY__MAX_RETRIES=5`.
const ENV_PREFIX: &str = "CITYCAST";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Weather API settings
    #[serde(default)]
    pub weather: WeatherSettings,

    /// Backoff applied to every weather API request
    #[serde(default)]
    pub retry: RetrySettings,

    /// Saved city list settings
    #[serde(default)]
    pub cities: CitiesConfig,

    /// Local storage location
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Measurement system requested from the weather API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl Units {
    pub fn as_query(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
            Units::Standard => "standard",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSettings {
    /// OpenWeatherMap API key; falls back to `OPENWEATHER_API_KEY`
    #[serde(default)]
    pub api_key: String,

    /// Base URL of the current/forecast API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Base URL of the geocoding API
    #[serde(default = "default_geo_url")]
    pub geo_url: String,

    #[serde(default)]
    pub units: Units,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// How long current conditions stay fresh
    #[serde(default = "default_current_ttl_secs")]
    pub current_ttl_secs: u64,

    /// How long a forecast stays fresh
    #[serde(default = "default_forecast_ttl_secs")]
    pub forecast_ttl_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_geo_url() -> String {
    "https://api.openweathermap.org/geo/1.0".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_current_ttl_secs() -> u64 {
    300
}

fn default_forecast_ttl_secs() -> u64 {
    3600
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            geo_url: default_geo_url(),
            units: Units::default(),
            timeout_secs: default_timeout_secs(),
            current_ttl_secs: default_current_ttl_secs(),
            forecast_ttl_secs: default_forecast_ttl_secs(),
        }
    }
}

impl WeatherSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn current_ttl(&self) -> Duration {
        Duration::from_secs(self.current_ttl_secs)
    }

    pub fn forecast_ttl(&self) -> Duration {
        Duration::from_secs(self.forecast_ttl_secs)
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts per request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Also retry 4xx answers such as "city not found"
    #[serde(default)]
    pub retry_client_errors: bool,
}

fn default_max_retries() -> u32 {
    crate::retry::DEFAULT_MAX_RETRIES
}

fn default_initial_delay_ms() -> u64 {
    crate::retry::DEFAULT_INITIAL_DELAY_MS
}

fn default_max_delay_ms() -> u64 {
    crate::retry::DEFAULT_MAX_DELAY_MS
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            retry_client_errors: false,
        }
    }
}

impl RetrySettings {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.max_retries, self.initial_delay_ms, self.max_delay_ms)
    }
}

/// A city seeded into an empty list on first start
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DefaultCity {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl Default for DefaultCity {
    fn default() -> Self {
        Self {
            name: "London".to_string(),
            lat: 51.5074,
            lon: -0.1278,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitiesConfig {
    /// Maximum number of saved cities
    #[serde(default = "default_max_saved")]
    pub max_saved: usize,

    /// Seed `default_city` into an empty list on start
    #[serde(default = "default_seed")]
    pub seed_default: bool,

    #[serde(default)]
    pub default_city: DefaultCity,
}

fn default_max_saved() -> usize {
    10
}

fn default_seed() -> bool {
    true
}

impl Default for CitiesConfig {
    fn default() -> Self {
        Self {
            max_saved: default_max_saved(),
            seed_default: default_seed(),
            default_city: DefaultCity::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the local database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("citycast")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl StorageConfig {
    /// Path of the SQLite file holding the saved city list
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("cities.db")
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("citycast")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            weather: WeatherSettings::default(),
            retry: RetrySettings::default(),
            cities: CitiesConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    ///
    /// # Errors
    /// Fails if the config directory cannot be determined or the file is malformed.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from `path`, layering `CITYCAST_*` environment
    /// overrides on top of the file.
    ///
    /// # Errors
    /// Fails if the file cannot be written (first run) or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let mut config = Self::default();
            if let Some(parent) = path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(path)?;
        }

        let settings = ::config::Config::builder()
            .add_source(
                ::config::File::from(path.to_path_buf())
                    .format(::config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read config file")?;

        let mut config: Config = settings
            .try_deserialize()
            .context("Failed to parse config file")?;

        if !config.weather.has_api_key() {
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                config.weather.api_key = key;
            }
        }

        Ok(config)
    }

    /// Load configuration from `path` (or the default location) and
    /// validate it
    ///
    /// # Errors
    /// Returns an error if loading fails or validation reports errors.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult)> {
        let config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.base_url, "weather.base_url", &mut result);
        self.validate_url(&self.weather.geo_url, "weather.geo_url", &mut result);

        if !self.weather.has_api_key() {
            result.add_warning(
                "weather.api_key",
                format!("No API key configured; set it here or via {}", API_KEY_ENV),
            );
        }

        if self.weather.timeout_secs == 0 {
            result.add_error("weather.timeout_secs", "Timeout must be greater than 0");
        }

        if self.weather.current_ttl_secs == 0 {
            result.add_warning(
                "weather.current_ttl_secs",
                "Current conditions are refetched on every view (0 seconds)",
            );
        }

        if self.weather.forecast_ttl_secs == 0 {
            result.add_warning(
                "weather.forecast_ttl_secs",
                "Forecast is refetched on every view (0 seconds)",
            );
        }

        if self.retry.max_retries == 0 {
            result.add_warning("retry.max_retries", "0 attempts; requests are tried once");
        }

        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            result.add_warning(
                "retry.initial_delay_ms",
                "Initial delay exceeds max delay; every wait is capped",
            );
        }

        if self.cities.max_saved == 0 {
            result.add_error("cities.max_saved", "At least one city must be allowed");
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    ///
    /// # Errors
    /// Fails if the file cannot be serialized or written.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to `path`
    ///
    /// # Errors
    /// Fails if the file cannot be serialized or written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("citycast");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_missing_api_key_is_warning() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "weather.api_key"));
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.weather.base_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "weather.base_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.weather.geo_url = "ftp://api.openweathermap.org/geo/1.0".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_zero_max_saved_is_error() {
        let mut config = Config::default();
        config.cities.max_saved = 0;
        assert!(!config.validate().is_valid());
    }

    #[test]
    fn test_default_ttls_match_dashboard_refresh() {
        let settings = WeatherSettings::default();
        assert_eq!(settings.current_ttl(), Duration::from_secs(5 * 60));
        assert_eq!(settings.forecast_ttl(), Duration::from_secs(60 * 60));
        assert_eq!(settings.units.as_query(), "metric");
    }

    #[test]
    fn test_retry_settings_convert() {
        let retry = RetrySettings::default().to_retry_config();
        assert_eq!(retry.max_retries, 3);
        assert_eq!(retry.initial_delay, Duration::from_millis(1000));
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load_from(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config.config_dir, dir.path());
        assert_eq!(config.cities.max_saved, 10);
        assert!(config.cities.seed_default);
        assert_eq!(config.cities.default_city, DefaultCity::default());
    }

    #[test]
    fn test_load_reads_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
config_dir = "/tmp/citycast"

[weather]
api_key = "abc123"
current_ttl_secs = 60

[cities]
max_saved = 4
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.weather.api_key, "abc123");
        assert_eq!(config.weather.current_ttl_secs, 60);
        assert_eq!(config.weather.forecast_ttl_secs, 3600);
        assert_eq!(config.cities.max_saved, 4);
        assert_eq!(config.retry.max_retries, 3);
    }

    #[test]
    fn test_load_file_without_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[weather]\napi_key = \"abc\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.weather.api_key, "abc");
        assert_eq!(config.config_dir, default_config_dir());
        assert_eq!(config.cities.max_saved, 10);
    }

    #[test]
    fn test_load_validated_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[weather]\nbase_url = \"not-a-url\"\n").unwrap();

        let err = Config::load_validated(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("weather.base_url"));
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
