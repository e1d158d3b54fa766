//! Climate model for the harvest season: temperature, rainfall and soil moisture

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use shared::{clip, round_to, VineyardPlot};

use super::random::RandomSource;

/// Late-summer temperature plateau (°C)
pub const SEASON_PEAK_TEMPERATURE: f64 = 30.0;
/// Day of year after which the baseline starts cooling
pub const COOLING_START_DAY: u32 = 240;
/// Daily cooling past `COOLING_START_DAY` (°C/day)
pub const COOLING_RATE_PER_DAY: f64 = 0.08;
/// Temperature drop per 600 m of altitude (°C)
pub const ALTITUDE_TEMPERATURE_PENALTY: f64 = 3.0;
pub const TEMPERATURE_NOISE_SD: f64 = 1.2;

pub const RAIN_DAY_PROBABILITY: f64 = 0.20;
pub const RAIN_MEAN_MM: f64 = 6.0;
pub const RAIN_SD_MM: f64 = 5.0;

pub const MOISTURE_INITIAL_RANGE: (f64, f64) = (14.0, 24.0);
pub const MOISTURE_BOUNDS: (f64, f64) = (10.0, 40.0);
/// Share of the day's rainfall absorbed by the soil
pub const RAIN_ABSORPTION: f64 = 0.5;
pub const IRRIGATION_MOISTURE_BONUS: f64 = 5.0;
pub const EVAPOTRANSPIRATION: f64 = 2.5;

/// Temperature baseline for a calendar day, before altitude and noise
pub fn seasonal_baseline(date: NaiveDate) -> f64 {
    let days_past = date.ordinal().saturating_sub(COOLING_START_DAY);
    SEASON_PEAK_TEMPERATURE - f64::from(days_past) * COOLING_RATE_PER_DAY
}

/// Ambient temperature for a plot on a day, rounded to 0.1 °C
pub fn daily_temperature<R>(date: NaiveDate, plot: &VineyardPlot, rng: &mut R) -> f64
where
    R: RandomSource + ?Sized,
{
    let noise = rng.normal(0.0, TEMPERATURE_NOISE_SD);
    round_to(
        seasonal_baseline(date) - plot.altitude_factor() * ALTITUDE_TEMPERATURE_PENALTY + noise,
        1,
    )
}

/// Daily rainfall in mm, rounded to 0.1; most days are dry
pub fn daily_rainfall<R>(rng: &mut R) -> f64
where
    R: RandomSource + ?Sized,
{
    if rng.uniform() < RAIN_DAY_PROBABILITY {
        round_to(rng.normal(RAIN_MEAN_MM, RAIN_SD_MM).max(0.0), 1)
    } else {
        0.0
    }
}

/// Soil moisture after one day of rain, irrigation and evapotranspiration
pub fn next_soil_moisture(previous: f64, rainfall_mm: f64, irrigated: bool) -> f64 {
    let irrigation = if irrigated { IRRIGATION_MOISTURE_BONUS } else { 0.0 };
    clip(
        previous + rainfall_mm * RAIN_ABSORPTION + irrigation - EVAPOTRANSPIRATION,
        MOISTURE_BOUNDS.0,
        MOISTURE_BOUNDS.1,
    )
}

/// Per-plot soil moisture carried across the days of a run
///
/// Keyed by plot only and updated at most once per plot and day: the first
/// variety of a plot applies its rainfall and irrigation, later varieties of
/// the same day observe the level it left.
#[derive(Debug, Clone)]
pub struct SoilMoistureState {
    levels: HashMap<String, f64>,
    updated_on: HashMap<String, NaiveDate>,
}

impl SoilMoistureState {
    /// Draw the opening moisture of every plot, in plot order
    pub fn initialize<R>(plots: &[VineyardPlot], rng: &mut R) -> Self
    where
        R: RandomSource + ?Sized,
    {
        let levels = plots
            .iter()
            .map(|plot| {
                let level = rng.uniform_range(MOISTURE_INITIAL_RANGE.0, MOISTURE_INITIAL_RANGE.1);
                (plot.name.clone(), level)
            })
            .collect();
        Self {
            levels,
            updated_on: HashMap::new(),
        }
    }

    pub fn level(&self, plot: &str) -> Option<f64> {
        self.levels.get(plot).copied()
    }

    /// Level of `plot` on `date`, applying the day's update on first access
    pub fn apply(&mut self, plot: &str, date: NaiveDate, rainfall_mm: f64, irrigated: bool) -> f64 {
        let level = self
            .levels
            .entry(plot.to_string())
            .or_insert(MOISTURE_INITIAL_RANGE.0);
        if self.updated_on.get(plot) != Some(&date) {
            *level = next_soil_moisture(*level, rainfall_mm, irrigated);
            self.updated_on.insert(plot.to_string(), date);
        }
        *level
    }
}
