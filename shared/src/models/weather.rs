//! Daily field conditions observed by the harvest model

use serde::{Deserialize, Serialize};

/// Soil moisture below which a dry day counts as drought (%)
pub const DROUGHT_MOISTURE_THRESHOLD: f64 = 15.0;

/// Conditions for one plot and variety on one day
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WeatherSnapshot {
    pub temperature_celsius: f64,
    pub rainfall_mm: f64,
    /// Plot soil moisture after the day's update (%)
    pub soil_moisture_percent: f64,
}

impl WeatherSnapshot {
    pub fn new(temperature_celsius: f64, rainfall_mm: f64, soil_moisture_percent: f64) -> Self {
        Self {
            temperature_celsius,
            rainfall_mm,
            soil_moisture_percent,
        }
    }

    /// A day with no rain and soil moisture under the drought threshold
    pub fn is_drought(&self) -> bool {
        self.rainfall_mm == 0.0 && self.soil_moisture_percent < DROUGHT_MOISTURE_THRESHOLD
    }
}
