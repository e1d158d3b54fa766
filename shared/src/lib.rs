//! Shared types and models for the Vineyard Harvest Simulator
//!
//! This crate contains the domain model of the harvest season and the
//! fermentation lots derived from it, plus the numeric and validation
//! helpers the simulator and any table consumer rely on.

pub mod models;
pub mod numeric;
pub mod types;
pub mod validation;

pub use models::*;
pub use numeric::*;
pub use types::*;
pub use validation::*;
