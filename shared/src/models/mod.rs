//! Domain models for the Vineyard Harvest Simulator

mod harvest;
mod lot;
mod plot;
mod weather;

pub use harvest::*;
pub use lot::*;
pub use plot::*;
pub use weather::*;
