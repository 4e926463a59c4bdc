//! End-to-end dashboard tests against a mocked OpenWeatherMap and a real
//! SQLite file.

#![allow(clippy::unwrap_used)]

use citycast_core::Config;
use citycast_services::{AddOutcome, Dashboard, Panel, SqliteStorage, CITIES_KEY};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// 2024-03-01T00:00:00Z
const DAY_START: i64 = 1_709_251_200;

fn test_config(server: &MockServer, dir: &TempDir, seed_default: bool) -> Config {
    let mut config = Config::default();
    config.weather.api_key = "test_key".to_string();
    config.weather.base_url = format!("{}/data/2.5", server.uri());
    config.weather.geo_url = format!("{}/geo/1.0", server.uri());
    config.retry.initial_delay_ms = 1;
    config.retry.max_delay_ms = 2;
    config.cities.seed_default = seed_default;
    config.storage.data_dir = dir.path().to_path_buf();
    config
}

fn open_dashboard(config: &Config) -> Dashboard {
    let storage = SqliteStorage::open(config.storage.database_path()).unwrap();
    Dashboard::from_config(config, Box::new(storage)).unwrap()
}

async fn mount_city(server: &MockServer, name: &str, lat: f64, lon: f64) {
    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .and(query_param("q", name))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"name": name, "lat": lat, "lon": lon, "country": "XX"}
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", name))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": name,
            "dt": DAY_START,
            "main": {"temp": 18.0, "feels_like": 17.5, "humidity": 55},
            "wind": {"speed": 2.0},
            "weather": [{"id": 801, "main": "Clouds", "icon": "02d"}]
        })))
        .mount(server)
        .await;

    let list: Vec<serde_json::Value> = (0..40)
        .map(|i| {
            let dt = DAY_START + i * 3 * 3600;
            serde_json::json!({
                "dt": dt,
                "main": {"temp": 15.0, "temp_min": 11.0, "temp_max": 19.0},
                "weather": [{"id": 800, "main": "Clear", "icon": "01d"}]
            })
        })
        .collect();

    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .and(query_param("q", name))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "list": list,
            "city": {"name": name}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_saved_cities_survive_restart() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_city(&server, "Paris", 48.8566, 2.3522).await;
    mount_city(&server, "Rome", 41.9028, 12.4964).await;

    let config = test_config(&server, &dir, false);

    {
        let dashboard = open_dashboard(&config);
        assert!(dashboard.add_city("Paris").await.unwrap().is_added());
        assert!(dashboard.add_city("Rome").await.unwrap().is_added());
        dashboard.reorder(1, 0).unwrap();
    }

    let dashboard = open_dashboard(&config);
    let cities = dashboard.cities();
    assert_eq!(cities.len(), 2);
    assert_eq!(cities[0].name, "Rome");
    assert_eq!(cities[0].order, 0);
    assert_eq!(cities[1].name, "Paris");
    // Selection is not persisted; the first city is selected on open
    assert_eq!(dashboard.selected_city().unwrap().name, "Rome");

    let storage = SqliteStorage::open(config.storage.database_path()).unwrap();
    let raw = storage.get(CITIES_KEY).unwrap().unwrap();
    assert!(raw.contains("\"name\":\"Rome\""));
}

#[tokio::test]
async fn test_view_for_selected_city() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_city(&server, "Paris", 48.8566, 2.3522).await;

    let dashboard = open_dashboard(&test_config(&server, &dir, false));
    dashboard.add_city("Paris").await.unwrap();

    let view = dashboard.view().await;

    let current = view.current.ready().unwrap();
    assert_eq!(current.city, "Paris");
    assert_eq!(current.condition, "Clouds");

    let forecast = view.forecast.ready().unwrap();
    assert_eq!(forecast.forecast.len(), 5);
    assert_eq!(forecast.forecast[0].date, "2024-03-01");
    assert_eq!(forecast.forecast[0].max_temp, 19.0);

    let map = view.map.unwrap();
    assert_eq!(map.center, [48.8566, 2.3522]);
    assert_eq!(map.zoom, 10);
}

#[tokio::test]
async fn test_default_city_seeded_once() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, &dir, true);

    let dashboard = open_dashboard(&config);
    let cities = dashboard.cities();
    assert_eq!(cities.len(), 1);
    assert_eq!(cities[0].name, "London");
    assert_eq!(cities[0].lat, 51.5074);
    drop(dashboard);

    let dashboard = open_dashboard(&config);
    assert_eq!(dashboard.cities().len(), 1);
}

#[tokio::test]
async fn test_unknown_city_leaves_list_unchanged() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let dashboard = open_dashboard(&test_config(&server, &dir, false));
    let err = dashboard.add_city("Atlantis").await.unwrap_err();

    assert_eq!(err.user_message(), "City \"Atlantis\" not found");
    assert!(dashboard.cities().is_empty());
    assert_eq!(dashboard.view().await.current, Panel::Empty);
}

#[tokio::test]
async fn test_limit_reached() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_city(&server, "Oslo", 59.91, 10.75).await;
    mount_city(&server, "Bergen", 60.39, 5.32).await;

    let mut config = test_config(&server, &dir, false);
    config.cities.max_saved = 1;

    let dashboard = open_dashboard(&config);
    dashboard.add_city("Oslo").await.unwrap();
    let outcome = dashboard.add_city("Bergen").await.unwrap();

    assert_eq!(outcome, AddOutcome::LimitReached { max: 1 });
}
