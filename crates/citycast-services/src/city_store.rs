//! Saved city list with selection and persistence.
//!
//! The store keeps the list sorted by `order` and writes every mutation
//! through its [`CityStorage`] before returning. A failed write is logged and
//! reported, but the in-memory change is kept so the session stays usable.

use citycast_core::{DefaultCity, StorageError, ValidationError};
use citycast_weather::City;

use crate::storage::CityStorage;

/// Default number of cities a user can save
pub const DEFAULT_MAX_SAVED: usize = 10;

pub const MIN_NAME_LEN: usize = 2;
pub const MAX_NAME_LEN: usize = 50;

/// Trim a city name typed by the user and check its length.
pub fn validate_city_name(name: &str) -> Result<&str, ValidationError> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if len < MIN_NAME_LEN {
        return Err(ValidationError::TooShort { min: MIN_NAME_LEN });
    }
    if len > MAX_NAME_LEN {
        return Err(ValidationError::TooLong { max: MAX_NAME_LEN });
    }
    Ok(trimmed)
}

/// Result of [`CityStore::add`]
#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    Added(City),
    /// A city with the same name (ignoring case) is already saved
    Duplicate(City),
    LimitReached { max: usize },
}

impl AddOutcome {
    pub fn is_added(&self) -> bool {
        matches!(self, AddOutcome::Added(_))
    }
}

pub struct CityStore {
    storage: Box<dyn CityStorage>,
    cities: Vec<City>,
    selected: Option<String>,
    max_saved: usize,
}

impl std::fmt::Debug for CityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CityStore")
            .field("cities", &self.cities)
            .field("selected", &self.selected)
            .field("max_saved", &self.max_saved)
            .finish_non_exhaustive()
    }
}

impl CityStore {
    /// Load the saved list. The first city is selected when there is one.
    pub fn open(storage: Box<dyn CityStorage>, max_saved: usize) -> Result<Self, StorageError> {
        let mut cities = storage.load()?;
        cities.sort_by_key(|c| c.order);
        let selected = cities.first().map(|c| c.id.clone());

        tracing::info!("Loaded {} saved cities", cities.len());

        Ok(Self {
            storage,
            cities,
            selected,
            max_saved,
        })
    }

    /// Seed `default` into an empty list. Returns the added city, if any.
    pub fn initialize_default(
        &mut self,
        default: &DefaultCity,
    ) -> Result<Option<City>, StorageError> {
        if !self.cities.is_empty() {
            return Ok(None);
        }

        tracing::info!("No saved cities, adding default city {}", default.name);
        match self.add(&default.name, default.lat, default.lon)? {
            AddOutcome::Added(city) => Ok(Some(city)),
            _ => Ok(None),
        }
    }

    /// Cities in display order
    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn max_saved(&self) -> usize {
        self.max_saved
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_city(&self) -> Option<&City> {
        let id = self.selected.as_deref()?;
        self.cities.iter().find(|c| c.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&City> {
        let needle = name.trim().to_lowercase();
        self.cities.iter().find(|c| c.name.to_lowercase() == needle)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&City> {
        self.cities.iter().find(|c| c.id == id)
    }

    /// Order value for the next added city
    pub fn next_order(&self) -> i64 {
        self.cities.iter().map(|c| c.order).max().map_or(0, |max| max + 1)
    }

    pub fn add(&mut self, name: &str, lat: f64, lon: f64) -> Result<AddOutcome, StorageError> {
        if let Some(existing) = self.find_by_name(name) {
            tracing::debug!("City {} is already saved", existing.name);
            return Ok(AddOutcome::Duplicate(existing.clone()));
        }

        if self.cities.len() >= self.max_saved {
            tracing::debug!("Saved city limit of {} reached", self.max_saved);
            return Ok(AddOutcome::LimitReached { max: self.max_saved });
        }

        let city = City {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            lat,
            lon,
            order: self.next_order(),
        };
        self.cities.push(city.clone());

        if self.cities.len() == 1 || self.selected.is_none() {
            self.selected = Some(city.id.clone());
        }

        tracing::info!("Added city {} ({}, {})", city.name, city.lat, city.lon);
        self.persist()?;
        Ok(AddOutcome::Added(city))
    }

    /// Remove a city by id. Returns false for unknown ids.
    pub fn remove(&mut self, id: &str) -> Result<bool, StorageError> {
        let before = self.cities.len();
        self.cities.retain(|c| c.id != id);
        if self.cities.len() == before {
            return Ok(false);
        }

        renumber(&mut self.cities);

        if self.selected.as_deref() == Some(id) {
            self.selected = self.cities.first().map(|c| c.id.clone());
        }

        tracing::info!("Removed city {}", id);
        self.persist()?;
        Ok(true)
    }

    /// Move the city at `from` to position `to`.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), ReorderError> {
        let len = self.cities.len();
        for index in [from, to] {
            if index >= len {
                return Err(ValidationError::IndexOutOfRange { index, len }.into());
            }
        }

        let city = self.cities.remove(from);
        self.cities.insert(to, city);
        renumber(&mut self.cities);

        tracing::debug!("Moved city from position {} to {}", from, to);
        self.persist()?;
        Ok(())
    }

    /// Select a city by id, or clear the selection. Unknown ids are ignored
    /// and return false.
    pub fn select(&mut self, id: Option<&str>) -> bool {
        match id {
            None => {
                self.selected = None;
                true
            }
            Some(id) if self.find_by_id(id).is_some() => {
                self.selected = Some(id.to_string());
                true
            }
            Some(id) => {
                tracing::debug!("Ignoring selection of unknown city {}", id);
                false
            }
        }
    }

    fn persist(&self) -> Result<(), StorageError> {
        self.storage.save(&self.cities).map_err(|e| {
            tracing::error!("Failed to save city list: {}", e);
            e
        })
    }
}

/// Errors from [`CityStore::reorder`]
#[derive(Debug, thiserror::Error)]
pub enum ReorderError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<ReorderError> for citycast_core::AppError {
    fn from(e: ReorderError) -> Self {
        match e {
            ReorderError::Validation(e) => e.into(),
            ReorderError::Storage(e) => e.into(),
        }
    }
}

fn renumber(cities: &mut [City]) {
    for (index, city) in cities.iter_mut().enumerate() {
        city.order = index as i64;
    }
}
