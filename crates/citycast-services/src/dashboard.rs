//! Dashboard orchestration: saved cities, cached weather panels and
//! background revalidation.

use std::sync::Arc;
use std::time::Duration;

use citycast_core::{AppError, Config};
use citycast_weather::{
    City, CitySearchResult, ForecastData, MapView, RevalidatingCache, WeatherData,
    WeatherProvider,
};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::city_store::{validate_city_name, AddOutcome, CityStore};
use crate::storage::CityStorage;

fn current_key(city: &str) -> String {
    format!("weather-{}", city)
}

fn forecast_key(city: &str) -> String {
    format!("forecast-{}", city)
}

/// One section of the dashboard. Panels fail independently.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum Panel<T> {
    /// Nothing selected
    Empty,
    Ready(T),
    /// Message for inline display
    Failed(String),
}

impl<T> Panel<T> {
    fn from_result(result: Result<T, AppError>, what: &str) -> Self {
        match result {
            Ok(value) => Panel::Ready(value),
            Err(e) => {
                tracing::warn!("Failed to load {}: {}", what, e);
                Panel::Failed(e.user_message())
            }
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Panel::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Panel::Failed(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub cities: Vec<City>,
    pub selected: Option<City>,
    pub current: Panel<WeatherData>,
    pub forecast: Panel<ForecastData>,
    pub map: Option<MapView>,
}

pub struct Dashboard {
    store: Mutex<CityStore>,
    provider: WeatherProvider,
    current: RevalidatingCache<WeatherData>,
    forecast: RevalidatingCache<ForecastData>,
}

impl Dashboard {
    pub fn new(
        store: CityStore,
        provider: WeatherProvider,
        current_ttl: Duration,
        forecast_ttl: Duration,
    ) -> Self {
        Self {
            store: Mutex::new(store),
            provider,
            current: RevalidatingCache::new(current_ttl),
            forecast: RevalidatingCache::new(forecast_ttl),
        }
    }

    /// Build a dashboard from configuration, loading saved cities from
    /// `storage` and seeding the default city into an empty list.
    pub fn from_config(config: &Config, storage: Box<dyn CityStorage>) -> Result<Self, AppError> {
        let mut store = CityStore::open(storage, config.cities.max_saved)?;
        if config.cities.seed_default {
            store.initialize_default(&config.cities.default_city)?;
        }

        let provider = WeatherProvider::new(&config.weather, &config.retry)?;

        Ok(Self::new(
            store,
            provider,
            config.weather.current_ttl(),
            config.weather.forecast_ttl(),
        ))
    }

    pub fn cities(&self) -> Vec<City> {
        self.store.lock().cities().to_vec()
    }

    pub fn selected_city(&self) -> Option<City> {
        self.store.lock().selected_city().cloned()
    }

    pub fn find_city(&self, name: &str) -> Option<City> {
        self.store.lock().find_by_name(name).cloned()
    }

    /// Validate, geocode and save a city typed by the user.
    ///
    /// The saved name is the one the geocoder returns, so "paris" is stored
    /// as "Paris".
    pub async fn add_city(&self, name: &str) -> Result<AddOutcome, AppError> {
        let name = validate_city_name(name)?;

        {
            let store = self.store.lock();
            if let Some(existing) = store.find_by_name(name) {
                return Ok(AddOutcome::Duplicate(existing.clone()));
            }
            if store.len() >= store.max_saved() {
                return Ok(AddOutcome::LimitReached {
                    max: store.max_saved(),
                });
            }
        }

        let place = self.provider.geocode(name).await?;
        let outcome = self.store.lock().add(&place.name, place.lat, place.lon)?;
        Ok(outcome)
    }

    pub fn remove_city(&self, id: &str) -> Result<bool, AppError> {
        let (removed, result) = {
            let mut store = self.store.lock();
            let name = store.find_by_id(id).map(|c| c.name.clone());
            (name, store.remove(id))
        };

        // The city is gone from memory even when the save failed
        if let Some(name) = &removed {
            self.current.remove(&current_key(name));
            self.forecast.remove(&forecast_key(name));
        }
        result?;
        Ok(removed.is_some())
    }

    pub fn reorder(&self, from: usize, to: usize) -> Result<(), AppError> {
        self.store.lock().reorder(from, to)?;
        Ok(())
    }

    /// Select a city by id or clear the selection. False for unknown ids.
    pub fn select(&self, id: Option<&str>) -> bool {
        self.store.lock().select(id)
    }

    /// Current conditions, served from cache while fresh.
    pub async fn current(&self, city: &str) -> Result<WeatherData, AppError> {
        let data = self
            .current
            .get_or_fetch(&current_key(city), || self.provider.fetch_current(city))
            .await?;
        Ok(data)
    }

    /// Daily forecast, served from cache while fresh.
    pub async fn forecast(&self, city: &str) -> Result<ForecastData, AppError> {
        let data = self
            .forecast
            .get_or_fetch(&forecast_key(city), || self.provider.fetch_forecast(city))
            .await?;
        Ok(data)
    }

    /// Snapshot of everything the dashboard shows.
    pub async fn view(&self) -> DashboardView {
        let (cities, selected) = {
            let store = self.store.lock();
            (store.cities().to_vec(), store.selected_city().cloned())
        };

        let Some(city) = selected.clone() else {
            return DashboardView {
                cities,
                selected,
                current: Panel::Empty,
                forecast: Panel::Empty,
                map: None,
            };
        };

        let (current, forecast) = tokio::join!(self.current(&city.name), self.forecast(&city.name));

        DashboardView {
            cities,
            map: Some(MapView::for_city(&city)),
            selected,
            current: Panel::from_result(current, "current weather"),
            forecast: Panel::from_result(forecast, "forecast"),
        }
    }

    /// Autocomplete suggestions for the add-city box
    pub async fn search(&self, query: &str) -> Vec<CitySearchResult> {
        self.provider.suggest(query).await
    }

    /// Mark the selected city's data stale so the next read refetches.
    pub fn invalidate_selected(&self) {
        if let Some(city) = self.selected_city() {
            self.current.invalidate(&current_key(&city.name));
            self.forecast.invalidate(&forecast_key(&city.name));
        }
    }

    /// Refetch whatever is stale for the selected city.
    pub async fn revalidate_selected(&self) {
        let Some(city) = self.selected_city() else {
            return;
        };

        let (current, forecast) = tokio::join!(self.current(&city.name), self.forecast(&city.name));
        if let Err(e) = current {
            tracing::warn!("Revalidating current weather for {} failed: {}", city.name, e);
        }
        if let Err(e) = forecast {
            tracing::warn!("Revalidating forecast for {} failed: {}", city.name, e);
        }
    }

    /// Revalidate the selected city every `interval` until the handle is
    /// stopped or dropped.
    pub fn spawn_revalidation(self: &Arc<Self>, interval: Duration) -> RevalidationHandle {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let dashboard = Arc::clone(self);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        tracing::debug!("Revalidating selected city");
                        dashboard.revalidate_selected().await;
                    }
                }
            }
            tracing::debug!("Revalidation task stopped");
        });

        RevalidationHandle {
            token,
            task: Some(task),
        }
    }
}

/// Stops the revalidation task when dropped.
#[derive(Debug)]
pub struct RevalidationHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RevalidationHandle {
    /// Stop the task and wait for it to finish.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Revalidation task ended abnormally: {}", e);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for RevalidationHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
