//! Fermentation lot models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Annotation attached to every lot built by the aggregator
pub const AUTO_LOT_NOTE: &str = "Automatically generated lot";

/// A fermentation batch built from consecutive harvests of one plot and variety
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FermentationLot {
    /// Deterministic code (e.g., "LOT-FAV-SYRAH-2025-09-03")
    pub lot_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub variety: String,
    pub plot: String,
    pub input_kg: f64,
    pub ferment_temp_c: f64,
    pub initial_brix: f64,
    pub final_brix: f64,
    pub volume_l: f64,
    pub discard_fraction: f64,
    pub notes: String,
}

impl FermentationLot {
    /// Whether two lots draw on overlapping harvest days
    pub fn overlaps(&self, other: &FermentationLot) -> bool {
        self.start_date <= other.end_date && other.start_date <= self.end_date
    }
}

/// Generate a lot code from the plot, the variety's first word and the window start
pub fn generate_lot_id(plot: &str, variety: &str, start_date: NaiveDate) -> String {
    let plot_code: String = plot.chars().take(3).collect::<String>().to_uppercase();
    let variety_code = variety
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_uppercase();
    format!("LOT-{}-{}-{}", plot_code, variety_code, start_date.format("%Y-%m-%d"))
}
