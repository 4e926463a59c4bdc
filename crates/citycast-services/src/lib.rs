//! Saved cities and dashboard orchestration for CityCast.

pub mod city_store;
pub mod dashboard;
pub mod storage;

pub use city_store::{validate_city_name, AddOutcome, CityStore, ReorderError, DEFAULT_MAX_SAVED};
pub use dashboard::{Dashboard, DashboardView, Panel, RevalidationHandle};
pub use storage::{CityStorage, MemoryStorage, SqliteStorage, CITIES_KEY};
