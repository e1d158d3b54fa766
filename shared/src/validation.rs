//! Validation rules for simulation inputs
//!
//! Every rule returns a static message so callers can attach the failing
//! field name and surface a configuration error before any draw is made.

use std::collections::HashSet;

use crate::models::VineyardPlot;
use crate::types::DateRange;

// ============================================================================
// Season Validations
// ============================================================================

/// Validate that the season ends on or after its first day
pub fn validate_date_range(range: &DateRange) -> Result<(), &'static str> {
    if range.end < range.start {
        return Err("Season end date must not be before the start date");
    }
    Ok(())
}

/// Validate the estate layout: at least one plot, unique non-empty names, each with varieties
pub fn validate_plots(plots: &[VineyardPlot]) -> Result<(), &'static str> {
    if plots.is_empty() {
        return Err("At least one vineyard plot is required");
    }
    let mut names = HashSet::new();
    for plot in plots {
        if plot.name.trim().is_empty() {
            return Err("Plot names cannot be empty");
        }
        if !names.insert(plot.name.as_str()) {
            return Err("Plot names must be unique");
        }
        if plot.varieties.is_empty() {
            return Err("Every plot must grow at least one variety");
        }
        let mut varieties = HashSet::new();
        for variety in &plot.varieties {
            let name = variety.to_string();
            if name.trim().is_empty() {
                return Err("Variety names cannot be empty");
            }
            if !varieties.insert(name) {
                return Err("A plot cannot list the same variety twice");
            }
        }
    }
    Ok(())
}

/// Validate that a plot altitude is plausible for a vineyard (0-2000 m)
pub fn validate_altitude(altitude_meters: i32) -> Result<(), &'static str> {
    if !(0..=2000).contains(&altitude_meters) {
        return Err("Altitude must be between 0 and 2000 meters");
    }
    Ok(())
}

// ============================================================================
// Model Parameter Validations
// ============================================================================

/// Validate a probability in [0, 1]
pub fn validate_probability(probability: f64) -> Result<(), &'static str> {
    if !(0.0..=1.0).contains(&probability) {
        return Err("Probability must be between 0 and 1");
    }
    Ok(())
}

/// Validate a fraction range with `0 <= min <= max <= 1`
pub fn validate_fraction_range(min: f64, max: f64) -> Result<(), &'static str> {
    if !(0.0..=1.0).contains(&min) || !(0.0..=1.0).contains(&max) {
        return Err("Fraction bounds must be between 0 and 1");
    }
    if min > max {
        return Err("Fraction range minimum must not exceed its maximum");
    }
    Ok(())
}

/// Validate the half-open window size bounds `[min, max)`
pub fn validate_window_bounds(min: usize, max: usize) -> Result<(), &'static str> {
    if min == 0 {
        return Err("Window size lower bound must be positive");
    }
    if max <= min {
        return Err("Window size upper bound must exceed the lower bound");
    }
    Ok(())
}

/// Validate the minimum mass a window needs to become a lot
pub fn validate_min_lot_mass(min_mass_kg: f64) -> Result<(), &'static str> {
    if !min_mass_kg.is_finite() || min_mass_kg <= 0.0 {
        return Err("Minimum lot mass must be a positive number");
    }
    Ok(())
}
