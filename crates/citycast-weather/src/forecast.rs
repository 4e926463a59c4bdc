//! Reduction of the 5-day/3-hour forecast to one entry per day.

use chrono::{DateTime, NaiveDate, Timelike};

use crate::types::{ForecastItem, WeatherCondition};

/// Days shown in the forecast panel
pub const FORECAST_DAYS: usize = 5;

const TARGET_HOUR: i64 = 12;

/// A single 3-hour slot, already extracted from the API response
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSlot {
    /// Slot time (unix seconds)
    pub dt: i64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub condition: String,
    pub condition_icon: String,
    pub condition_id: i32,
}

/// Pick one slot per UTC calendar day, the one closest to noon.
///
/// Days keep the order in which they first appear; ties keep the earlier
/// slot. At most [`FORECAST_DAYS`] days are returned. Slots with an
/// out-of-range timestamp are skipped.
pub fn daily_forecast(slots: &[ForecastSlot]) -> Vec<ForecastItem> {
    let mut days: Vec<(NaiveDate, &ForecastSlot)> = Vec::new();

    for slot in slots {
        let Some(time) = DateTime::from_timestamp(slot.dt, 0) else {
            tracing::debug!("Skipping forecast slot with invalid timestamp {}", slot.dt);
            continue;
        };
        let date = time.date_naive();
        let distance = noon_distance(time.hour());

        match days.iter_mut().find(|(d, _)| *d == date) {
            Some((_, best)) => {
                let best_distance = DateTime::from_timestamp(best.dt, 0)
                    .map(|t| noon_distance(t.hour()))
                    .unwrap_or(i64::MAX);
                if distance < best_distance {
                    *best = slot;
                }
            }
            None => days.push((date, slot)),
        }
    }

    days.into_iter()
        .take(FORECAST_DAYS)
        .map(|(date, slot)| ForecastItem {
            date: date.format("%Y-%m-%d").to_string(),
            min_temp: slot.temp_min,
            max_temp: slot.temp_max,
            condition: slot.condition.clone(),
            condition_icon: slot.condition_icon.clone(),
            category: WeatherCondition::from_owm_id(slot.condition_id),
        })
        .collect()
}

fn noon_distance(hour: u32) -> i64 {
    (i64::from(hour) - TARGET_HOUR).abs()
}
