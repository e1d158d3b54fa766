//! Configuration management for the Vineyard Harvest Simulator
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code (the Corradino 2025 harvest)
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with HSIM_ prefix
//! 4. Command-line overrides applied by the binary

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use config::{Environment, File};
use serde::{Deserialize, Serialize};
use shared::{validation, DateRange, GrapeVariety, VineyardPlot};
use validator::Validate;

use crate::error::{SimError, SimResult};
use crate::services::{LotSettings, SeasonSettings};

pub const DEFAULT_START_DATE: &str = "2025-08-25";
pub const DEFAULT_END_DATE: &str = "2025-10-15";
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_IRRIGATION_PROBABILITY: f64 = 0.70;
pub const DEFAULT_DISCARD_MIN: f64 = 0.25;
pub const DEFAULT_DISCARD_MAX: f64 = 0.35;
pub const DEFAULT_WINDOW_MIN: usize = 3;
pub const DEFAULT_WINDOW_MAX: usize = 7;
pub const DEFAULT_MIN_LOT_MASS_KG: f64 = 300.0;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Season simulation parameters
    #[validate]
    pub simulation: SimulationConfig,

    /// Lot aggregation parameters
    #[validate]
    pub lots: LotConfig,

    /// Output file locations
    pub output: OutputConfig,

    /// Estate layout
    #[serde(default = "default_plots")]
    #[validate(length(min = 1, message = "at least one vineyard plot is required"))]
    pub plots: Vec<PlotConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct SimulationConfig {
    /// First harvest day (inclusive)
    pub start_date: NaiveDate,

    /// Last harvest day (inclusive)
    pub end_date: NaiveDate,

    /// Probability that a plot/variety is irrigated on a given day
    #[validate(range(min = 0.0, max = 1.0, message = "must be between 0 and 1"))]
    pub irrigation_probability: f64,

    /// Lower bound of the discard fraction draw
    #[validate(range(min = 0.0, max = 1.0, message = "must be between 0 and 1"))]
    pub discard_min: f64,

    /// Upper bound of the discard fraction draw
    #[validate(range(min = 0.0, max = 1.0, message = "must be between 0 and 1"))]
    pub discard_max: f64,

    /// Seed of the single random generator driving the run
    pub seed: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct LotConfig {
    /// Smallest window size (inclusive)
    #[validate(range(min = 1, message = "must be positive"))]
    pub window_min: usize,

    /// Largest window size (exclusive)
    pub window_max: usize,

    /// Windows lighter than this are dropped (kg)
    pub min_mass_kg: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OutputConfig {
    /// Directory receiving every output file
    pub directory: PathBuf,

    /// Harvest record table file name
    pub harvest_file: String,

    /// Fermentation lot table file name
    pub lots_file: String,

    /// Season summary file name; no summary is written when unset
    pub summary_file: Option<String>,
}

/// One vineyard plot as written in configuration files
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PlotConfig {
    pub name: String,
    #[serde(default)]
    pub altitude_m: i32,
    pub varieties: Vec<String>,
}

fn default_plots() -> Vec<PlotConfig> {
    VineyardPlot::corradino_estate()
        .into_iter()
        .map(PlotConfig::from)
        .collect()
}

impl From<VineyardPlot> for PlotConfig {
    fn from(plot: VineyardPlot) -> Self {
        Self {
            name: plot.name,
            altitude_m: plot.altitude_meters,
            varieties: plot.varieties.iter().map(ToString::to_string).collect(),
        }
    }
}

impl From<&PlotConfig> for VineyardPlot {
    fn from(plot: &PlotConfig) -> Self {
        VineyardPlot::new(
            plot.name.clone(),
            plot.altitude_m,
            plot.varieties
                .iter()
                .map(|name| GrapeVariety::from_name(name))
                .collect(),
        )
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> SimResult<Self> {
        Self::load_from(None)
    }

    /// Load configuration, reading `path` instead of the environment-specific file when given
    pub fn load_from(path: Option<&Path>) -> SimResult<Self> {
        let environment =
            std::env::var("HSIM_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(&format!("config/{}", environment)).required(false),
        };

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("simulation.start_date", DEFAULT_START_DATE)?
            .set_default("simulation.end_date", DEFAULT_END_DATE)?
            .set_default("simulation.irrigation_probability", DEFAULT_IRRIGATION_PROBABILITY)?
            .set_default("simulation.discard_min", DEFAULT_DISCARD_MIN)?
            .set_default("simulation.discard_max", DEFAULT_DISCARD_MAX)?
            .set_default("simulation.seed", DEFAULT_SEED as i64)?
            .set_default("lots.window_min", DEFAULT_WINDOW_MIN as i64)?
            .set_default("lots.window_max", DEFAULT_WINDOW_MAX as i64)?
            .set_default("lots.min_mass_kg", DEFAULT_MIN_LOT_MASS_KG)?
            .set_default("output.directory", ".")?
            .set_default("output.harvest_file", "harvest_records.csv")?
            .set_default("output.lots_file", "fermentation_lots.csv")?
            .set_default("output.summary_file", "season_summary.json")?
            .add_source(file)
            // Override with environment variables (HSIM_SIMULATION__SEED=7)
            .add_source(
                Environment::with_prefix("HSIM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.check()?;
        Ok(config)
    }

    /// Run field-level and cross-field validation
    pub fn check(&self) -> SimResult<()> {
        self.validate()?;

        validation::validate_date_range(&self.date_range()).map_err(invalid("simulation.end_date"))?;
        validation::validate_probability(self.simulation.irrigation_probability)
            .map_err(invalid("simulation.irrigation_probability"))?;
        validation::validate_fraction_range(self.simulation.discard_min, self.simulation.discard_max)
            .map_err(invalid("simulation.discard_max"))?;
        validation::validate_window_bounds(self.lots.window_min, self.lots.window_max)
            .map_err(invalid("lots.window_max"))?;
        validation::validate_min_lot_mass(self.lots.min_mass_kg)
            .map_err(invalid("lots.min_mass_kg"))?;

        for plot in &self.plots {
            validation::validate_altitude(plot.altitude_m).map_err(invalid("plots.altitude_m"))?;
        }
        validation::validate_plots(&self.vineyard_plots()).map_err(invalid("plots"))?;

        Ok(())
    }

    pub fn date_range(&self) -> DateRange {
        DateRange::new(self.simulation.start_date, self.simulation.end_date)
    }

    pub fn vineyard_plots(&self) -> Vec<VineyardPlot> {
        self.plots.iter().map(VineyardPlot::from).collect()
    }

    pub fn season_settings(&self) -> SeasonSettings {
        SeasonSettings {
            season: self.date_range(),
            plots: self.vineyard_plots(),
            irrigation_probability: self.simulation.irrigation_probability,
            discard_range: (self.simulation.discard_min, self.simulation.discard_max),
        }
    }

    pub fn lot_settings(&self) -> LotSettings {
        LotSettings {
            window_min: self.lots.window_min,
            window_max: self.lots.window_max,
            min_mass_kg: self.lots.min_mass_kg,
        }
    }

    pub fn harvest_path(&self) -> PathBuf {
        self.output.directory.join(&self.output.harvest_file)
    }

    pub fn lots_path(&self) -> PathBuf {
        self.output.directory.join(&self.output.lots_file)
    }

    pub fn summary_path(&self) -> Option<PathBuf> {
        self.output
            .summary_file
            .as_ref()
            .map(|file| self.output.directory.join(file))
    }
}

fn invalid(field: &'static str) -> impl Fn(&'static str) -> SimError {
    move |message| SimError::invalid(field, message)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            simulation: SimulationConfig::default(),
            lots: LotConfig::default(),
            output: OutputConfig::default(),
            plots: default_plots(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2025, 8, 25).unwrap_or(NaiveDate::MIN),
            end_date: NaiveDate::from_ymd_opt(2025, 10, 15).unwrap_or(NaiveDate::MIN),
            irrigation_probability: DEFAULT_IRRIGATION_PROBABILITY,
            discard_min: DEFAULT_DISCARD_MIN,
            discard_max: DEFAULT_DISCARD_MAX,
            seed: DEFAULT_SEED,
        }
    }
}

impl Default for LotConfig {
    fn default() -> Self {
        Self {
            window_min: DEFAULT_WINDOW_MIN,
            window_max: DEFAULT_WINDOW_MAX,
            min_mass_kg: DEFAULT_MIN_LOT_MASS_KG,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            harvest_file: "harvest_records.csv".to_string(),
            lots_file: "fermentation_lots.csv".to_string(),
            summary_file: Some("season_summary.json".to_string()),
        }
    }
}
