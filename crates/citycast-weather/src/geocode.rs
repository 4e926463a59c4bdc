//! Direct geocoding: city name to coordinates.
//!
//! Response shapes of the OpenWeatherMap `/geo/1.0/direct` endpoint and
//! the conversion into [`CitySearchResult`].

use serde::Deserialize;

use crate::types::CitySearchResult;

/// Queries shorter than this are not sent to the API
pub const MIN_QUERY_LEN: usize = 2;

/// Default number of autocomplete suggestions
pub const DEFAULT_SUGGESTIONS: u8 = 5;

#[derive(Debug, Deserialize)]
pub(crate) struct GeoEntry {
    name: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    country: String,
    #[serde(default)]
    state: Option<String>,
}

impl From<GeoEntry> for CitySearchResult {
    fn from(entry: GeoEntry) -> Self {
        Self {
            name: entry.name,
            country: entry.country,
            state: entry.state.filter(|s| !s.is_empty()),
            lat: entry.lat,
            lon: entry.lon,
        }
    }
}

/// Trim a user query. Returns `None` when it is too short to search for.
pub fn normalize_query(query: &str) -> Option<&str> {
    let trimmed = query.trim();
    (trimmed.chars().count() >= MIN_QUERY_LEN).then_some(trimmed)
}
