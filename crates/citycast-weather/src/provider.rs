//! OpenWeatherMap client: current conditions, 5-day forecast and direct
//! geocoding.

use citycast_core::retry::with_retry_if;
use citycast_core::{RetryConfig, RetrySettings, Units, WeatherSettings};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use crate::error::WeatherError;
use crate::forecast::{daily_forecast, ForecastSlot};
use crate::geocode::{normalize_query, GeoEntry, DEFAULT_SUGGESTIONS};
use crate::types::{CitySearchResult, ForecastData, WeatherCondition, WeatherData};

const USER_AGENT: &str = concat!("CityCast/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct OwmCondition {
    id: i32,
    main: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    #[serde(default)]
    feels_like: f64,
    #[serde(default)]
    humidity: u8,
    #[serde(default)]
    temp_min: f64,
    #[serde(default)]
    temp_max: f64,
}

#[derive(Debug, Deserialize, Default)]
struct OwmWind {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    name: String,
    dt: i64,
    main: OwmMain,
    #[serde(default)]
    wind: OwmWind,
    #[serde(default)]
    weather: Vec<OwmCondition>,
}

#[derive(Debug, Deserialize)]
struct ForecastEntry {
    dt: i64,
    main: OwmMain,
    #[serde(default)]
    weather: Vec<OwmCondition>,
}

#[derive(Debug, Deserialize)]
struct ForecastCity {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Vec<ForecastEntry>,
    city: ForecastCity,
}

fn first_condition(weather: &[OwmCondition]) -> Result<&OwmCondition, WeatherError> {
    weather
        .first()
        .ok_or_else(|| WeatherError::Parse("response has no weather condition".to_string()))
}

impl CurrentResponse {
    fn into_weather_data(self) -> Result<WeatherData, WeatherError> {
        let condition = first_condition(&self.weather)?;
        Ok(WeatherData {
            city: self.name,
            temperature: self.main.temp,
            feels_like: self.main.feels_like,
            humidity: self.main.humidity,
            wind_speed: self.wind.speed,
            condition: condition.main.clone(),
            condition_icon: condition.icon.clone(),
            category: WeatherCondition::from_owm_id(condition.id),
            timestamp: self.dt,
        })
    }
}

impl ForecastResponse {
    fn into_forecast_data(self) -> Result<ForecastData, WeatherError> {
        let slots = self
            .list
            .iter()
            .map(|entry| {
                let condition = first_condition(&entry.weather)?;
                Ok(ForecastSlot {
                    dt: entry.dt,
                    temp_min: entry.main.temp_min,
                    temp_max: entry.main.temp_max,
                    condition: condition.main.clone(),
                    condition_icon: condition.icon.clone(),
                    condition_id: condition.id,
                })
            })
            .collect::<Result<Vec<_>, WeatherError>>()?;

        Ok(ForecastData {
            city: self.city.name,
            forecast: daily_forecast(&slots),
        })
    }
}

/// OpenWeatherMap error bodies look like `{"cod": "404", "message": "city not found"}`
fn api_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Client,
    api_key: String,
    base_url: String,
    geo_url: String,
    units: Units,
    retry: RetryConfig,
    retry_client_errors: bool,
}

impl WeatherProvider {
    /// Build a provider from configuration.
    ///
    /// # Errors
    /// Fails if the HTTP client cannot be constructed.
    pub fn new(settings: &WeatherSettings, retry: &RetrySettings) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .user_agent(USER_AGENT)
            .build()?;

        if !settings.has_api_key() {
            tracing::warn!("No OpenWeatherMap API key configured; requests will be rejected");
        }

        Ok(Self {
            client,
            api_key: settings.api_key.trim().to_string(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            geo_url: settings.geo_url.trim_end_matches('/').to_string(),
            units: settings.units,
            retry: retry.to_retry_config(),
            retry_client_errors: retry.retry_client_errors,
        })
    }

    fn endpoint(&self, base: &str, path: &str, params: &[(&str, &str)]) -> Result<Url, WeatherError> {
        let mut query: Vec<(&str, &str)> = params.to_vec();
        query.push(("appid", self.api_key.as_str()));
        Url::parse_with_params(&format!("{}/{}", base, path), &query)
            .map_err(|e| WeatherError::InvalidUrl(e.to_string()))
    }

    /// Current conditions for a city name.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_current(&self, city: &str) -> Result<WeatherData, WeatherError> {
        let url = self.endpoint(
            &self.base_url,
            "weather",
            &[("q", city), ("units", self.units.as_query())],
        )?;

        let response: CurrentResponse = self.get_with_retry(&url, city).await?;
        let data = response.into_weather_data()?;
        tracing::debug!("Current weather for {}: {}°, {}", data.city, data.temperature, data.condition);
        Ok(data)
    }

    /// Five daily entries reduced from the 3-hour forecast.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_forecast(&self, city: &str) -> Result<ForecastData, WeatherError> {
        let url = self.endpoint(
            &self.base_url,
            "forecast",
            &[("q", city), ("units", self.units.as_query())],
        )?;

        let response: ForecastResponse = self.get_with_retry(&url, city).await?;
        let data = response.into_forecast_data()?;
        tracing::debug!("Forecast for {}: {} days", data.city, data.forecast.len());
        Ok(data)
    }

    /// Best geocoding match for a city name.
    ///
    /// # Errors
    /// `NotFound` when the API knows no place by that name.
    #[instrument(skip(self), level = "info")]
    pub async fn geocode(&self, name: &str) -> Result<CitySearchResult, WeatherError> {
        self.search_cities(name, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::NotFound(name.to_string()))
    }

    /// Up to `limit` geocoding matches.
    #[instrument(skip(self), level = "debug")]
    pub async fn search_cities(
        &self,
        query: &str,
        limit: u8,
    ) -> Result<Vec<CitySearchResult>, WeatherError> {
        let limit = limit.to_string();
        let url = self.endpoint(&self.geo_url, "direct", &[("q", query), ("limit", &limit)])?;

        let entries: Vec<GeoEntry> = self.get_with_retry(&url, query).await?;
        Ok(entries.into_iter().map(CitySearchResult::from).collect())
    }

    /// Autocomplete suggestions. Short queries and failures yield an empty list.
    pub async fn suggest(&self, query: &str) -> Vec<CitySearchResult> {
        let Some(query) = normalize_query(query) else {
            return Vec::new();
        };

        match self.search_cities(query, DEFAULT_SUGGESTIONS).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!("City search for {:?} failed: {}", query, e);
                Vec::new()
            }
        }
    }

    async fn get_with_retry<T: DeserializeOwned>(
        &self,
        url: &Url,
        subject: &str,
    ) -> Result<T, WeatherError> {
        let retry_all = self.retry_client_errors;
        with_retry_if(
            &self.retry,
            move || self.get_json(url, subject),
            move |e: &WeatherError| retry_all || e.is_retryable(),
        )
        .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        subject: &str,
    ) -> Result<T, WeatherError> {
        let response = self.client.get(url.clone()).send().await?;
        Self::handle_response(response, subject).await
    }

    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
        subject: &str,
    ) -> Result<T, WeatherError> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body).map_err(|e| WeatherError::Parse(e.to_string()))
        } else if status == StatusCode::NOT_FOUND {
            Err(WeatherError::NotFound(subject.to_string()))
        } else if status == StatusCode::UNAUTHORIZED {
            Err(WeatherError::InvalidApiKey)
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            Err(WeatherError::RateLimited)
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(WeatherError::Api {
                status: status.as_u16(),
                message: api_message(&text),
            })
        }
    }
}
