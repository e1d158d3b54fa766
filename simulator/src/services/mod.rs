//! Simulation services for the Vineyard Harvest Simulator

pub mod harvest;
pub mod lot;
pub mod random;
pub mod reporting;
pub mod weather;

pub use harvest::{SeasonSettings, SeasonSimulator};
pub use lot::{partition_harvests, LotAggregation, LotAggregator, LotSettings};
pub use random::{RandomSource, SeededRandom};
pub use reporting::{
    fingerprint, read_harvest_csv, write_harvest_csv, write_lots_csv, SeasonSummary,
    HARVEST_COLUMNS, LOT_COLUMNS,
};
pub use weather::SoilMoistureState;
