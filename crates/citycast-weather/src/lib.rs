//! Weather data for CityCast
//!
//! OpenWeatherMap current conditions, 5-day forecast and geocoding, with a
//! revalidating in-memory cache and map view helpers.

pub mod cache;
pub mod error;
pub mod forecast;
pub mod geocode;
pub mod map;
pub mod provider;
pub mod types;

pub use cache::RevalidatingCache;
pub use error::WeatherError;
pub use forecast::{daily_forecast, FORECAST_DAYS};
pub use map::{icon_url, tile_url, MapView};
pub use provider::WeatherProvider;
pub use types::*;
