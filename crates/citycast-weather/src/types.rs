use serde::{Deserialize, Serialize};

/// A saved dashboard entry.
///
/// `order` is a sort rank; it is unique within a saved list but only its
/// relative value matters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub order: i64,
}

/// Weather condition categories mapped from OpenWeatherMap condition ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Convert an OpenWeatherMap condition id to a category
    /// See: https://openweathermap.org/weather-conditions
    pub fn from_owm_id(id: i32) -> Self {
        match id {
            200..=232 => Self::Thunderstorm,
            300..=321 => Self::Drizzle,
            511 => Self::Sleet, // Freezing rain
            502..=504 | 522 | 531 => Self::HeavyRain,
            500..=531 => Self::Rain,
            611..=616 => Self::Sleet,
            600..=622 => Self::Snow,
            701..=781 => Self::Fog,
            800 => Self::Clear,
            801 | 802 => Self::PartlyCloudy,
            803 | 804 => Self::Cloudy,
            _ => Self::Clear, // Unknown ids default to clear
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }
}

/// Current conditions for one city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherData {
    /// City name as reported by the API
    pub city: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u8,
    pub wind_speed: f64,
    /// Short condition text, e.g. "Clouds"
    pub condition: String,
    /// Icon code, e.g. "04d"
    pub condition_icon: String,
    pub category: WeatherCondition,
    /// Observation time (unix seconds)
    pub timestamp: i64,
}

/// One day of the 5-day forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastItem {
    /// Calendar date, `YYYY-MM-DD`
    pub date: String,
    pub min_temp: f64,
    pub max_temp: f64,
    pub condition: String,
    pub condition_icon: String,
    pub category: WeatherCondition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastData {
    pub city: String,
    pub forecast: Vec<ForecastItem>,
}

/// A geocoding match, used for autocomplete and for adding cities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitySearchResult {
    pub name: String,
    pub country: String,
    pub state: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

impl CitySearchResult {
    /// "State, Country" when a state is known, otherwise just the country
    pub fn location_label(&self) -> String {
        match self.state.as_deref().filter(|s| !s.is_empty()) {
            Some(state) => format!("{}, {}", state, self.country),
            None => self.country.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owm_id_thunderstorm() {
        assert_eq!(WeatherCondition::from_owm_id(200), WeatherCondition::Thunderstorm);
        assert_eq!(WeatherCondition::from_owm_id(232), WeatherCondition::Thunderstorm);
    }

    #[test]
    fn test_owm_id_drizzle() {
        assert_eq!(WeatherCondition::from_owm_id(300), WeatherCondition::Drizzle);
        assert_eq!(WeatherCondition::from_owm_id(321), WeatherCondition::Drizzle);
    }

    #[test]
    fn test_owm_id_rain_variants() {
        assert_eq!(WeatherCondition::from_owm_id(500), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::from_owm_id(501), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::from_owm_id(520), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::from_owm_id(502), WeatherCondition::HeavyRain);
        assert_eq!(WeatherCondition::from_owm_id(531), WeatherCondition::HeavyRain);
        assert_eq!(WeatherCondition::from_owm_id(511), WeatherCondition::Sleet);
    }

    #[test]
    fn test_owm_id_snow_and_sleet() {
        assert_eq!(WeatherCondition::from_owm_id(600), WeatherCondition::Snow);
        assert_eq!(WeatherCondition::from_owm_id(622), WeatherCondition::Snow);
        assert_eq!(WeatherCondition::from_owm_id(611), WeatherCondition::Sleet);
        assert_eq!(WeatherCondition::from_owm_id(616), WeatherCondition::Sleet);
    }

    #[test]
    fn test_owm_id_atmosphere_and_clouds() {
        assert_eq!(WeatherCondition::from_owm_id(741), WeatherCondition::Fog);
        assert_eq!(WeatherCondition::from_owm_id(800), WeatherCondition::Clear);
        assert_eq!(WeatherCondition::from_owm_id(801), WeatherCondition::PartlyCloudy);
        assert_eq!(WeatherCondition::from_owm_id(804), WeatherCondition::Cloudy);
    }

    #[test]
    fn test_owm_id_unknown_defaults_to_clear() {
        assert_eq!(WeatherCondition::from_owm_id(999), WeatherCondition::Clear);
        assert_eq!(WeatherCondition::from_owm_id(-1), WeatherCondition::Clear);
    }

    #[test]
    fn test_location_label() {
        let mut result = CitySearchResult {
            name: "Portland".into(),
            country: "US".into(),
            state: Some("Oregon".into()),
            lat: 45.5,
            lon: -122.6,
        };
        assert_eq!(result.location_label(), "Oregon, US");

        result.state = None;
        assert_eq!(result.location_label(), "US");
    }
}
