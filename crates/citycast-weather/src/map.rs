//! Map view parameters and icon URLs.
//!
//! Nothing here talks to the network; these are the values a map widget
//! needs to center on a city and draw its marker.

use serde::Serialize;

use crate::types::City;

pub const DEFAULT_ZOOM: u8 = 10;

pub const TILE_URL_TEMPLATE: &str =
    "https://tiles.stadiamaps.com/tiles/alidade_smooth_dark/{z}/{x}/{y}{r}.png";

pub const TILE_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a>";

pub const MARKER_ICON_URL: &str =
    "https://raw.githubusercontent.com/pointhi/leaflet-color-markers/master/img/marker-icon-2x-blue.png";

pub const MARKER_SHADOW_URL: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/leaflet/0.7.7/images/marker-shadow.png";

const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";

/// Marker geometry in pixels, `[width, height]` / `[x, y]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarkerGeometry {
    pub icon_size: [u16; 2],
    pub icon_anchor: [u16; 2],
    pub popup_anchor: [i16; 2],
    pub shadow_size: [u16; 2],
}

impl Default for MarkerGeometry {
    fn default() -> Self {
        Self {
            icon_size: [30, 45],
            icon_anchor: [15, 45],
            popup_anchor: [1, -34],
            shadow_size: [41, 41],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    /// `[lat, lon]`
    pub center: [f64; 2],
    pub zoom: u8,
    pub tile_url_template: &'static str,
    pub attribution: &'static str,
    pub marker_icon_url: &'static str,
    pub marker_shadow_url: &'static str,
    pub marker: MarkerGeometry,
    /// Popup text for the marker
    pub label: String,
}

impl MapView {
    pub fn for_city(city: &City) -> Self {
        Self {
            center: [city.lat, city.lon],
            zoom: DEFAULT_ZOOM,
            tile_url_template: TILE_URL_TEMPLATE,
            attribution: TILE_ATTRIBUTION,
            marker_icon_url: MARKER_ICON_URL,
            marker_shadow_url: MARKER_SHADOW_URL,
            marker: MarkerGeometry::default(),
            label: city.name.clone(),
        }
    }

    pub fn tile_url(&self, z: u8, x: u32, y: u32, retina: bool) -> String {
        tile_url(z, x, y, retina)
    }
}

/// Expand the tile template for one tile. `retina` selects the `@2x` variant.
pub fn tile_url(z: u8, x: u32, y: u32, retina: bool) -> String {
    TILE_URL_TEMPLATE
        .replace("{z}", &z.to_string())
        .replace("{x}", &x.to_string())
        .replace("{y}", &y.to_string())
        .replace("{r}", if retina { "@2x" } else { "" })
}

/// Condition icon for an OpenWeatherMap icon code such as `04d`
pub fn icon_url(code: &str) -> String {
    format!("{}/{}.png", ICON_BASE_URL, code)
}
