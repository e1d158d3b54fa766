//! Vineyard Harvest Simulator
//!
//! Seeded simulation of a grape harvest season over a small estate, producing
//! a harvest record table and the fermentation lots built from it.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod services;

pub use config::Config;
pub use error::{SimError, SimResult};
pub use pipeline::{aggregate_records, run_season, run_season_with, write_outputs, RunOutputs, SeasonRun};
