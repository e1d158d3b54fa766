//! Vineyard plot models

use serde::{Deserialize, Serialize};

/// Altitude that shifts the climate model by one full step
pub const ALTITUDE_REFERENCE_METERS: f64 = 600.0;

/// A vineyard parcel within the estate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VineyardPlot {
    pub name: String,
    pub altitude_meters: i32,
    pub varieties: Vec<GrapeVariety>,
}

impl VineyardPlot {
    pub fn new(name: impl Into<String>, altitude_meters: i32, varieties: Vec<GrapeVariety>) -> Self {
        Self {
            name: name.into(),
            altitude_meters,
            varieties,
        }
    }

    /// Altitude expressed in 600 m steps, the unit every altitude penalty is scaled by
    pub fn altitude_factor(&self) -> f64 {
        f64::from(self.altitude_meters) / ALTITUDE_REFERENCE_METERS
    }

    /// The three Corradino estate plots in western Sicily
    pub fn corradino_estate() -> Vec<Self> {
        vec![
            Self::new(
                "SanGiuseppeJato",
                0,
                vec![
                    GrapeVariety::NeroDAvola,
                    GrapeVariety::Malvasia,
                    GrapeVariety::Syrah,
                ],
            ),
            Self::new(
                "Favara",
                0,
                vec![GrapeVariety::NeroDAvola, GrapeVariety::Syrah],
            ),
            Self::new(
                "Castellana_Alcamo",
                600,
                vec![
                    GrapeVariety::Catarratto,
                    GrapeVariety::PetitVerdot,
                    GrapeVariety::Grillo,
                ],
            ),
        ]
    }
}

/// Grape cultivars grown on the estate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum GrapeVariety {
    NeroDAvola,
    Syrah,
    Malvasia,
    Catarratto,
    PetitVerdot,
    Grillo,
    /// Any cultivar without a calibrated profile
    Custom(String),
}

/// Per-variety calibration of the harvest model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarietyProfile {
    /// Multiplier on the base harvest mass
    pub mass_scale: f64,
    /// Added to the °Brix baseline
    pub sugar_offset: f64,
    /// Added to the acidity baseline (g/L)
    pub acidity_offset: f64,
    /// Center of the juice yield distribution (L/kg)
    pub juice_yield_mean: f64,
    /// Harvest crews favour these cultivars, raising the daily pick probability
    pub high_yield: bool,
}

impl Default for VarietyProfile {
    fn default() -> Self {
        Self {
            mass_scale: 1.0,
            sugar_offset: 0.0,
            acidity_offset: 0.0,
            juice_yield_mean: 0.64,
            high_yield: false,
        }
    }
}

impl GrapeVariety {
    /// Resolve a variety from its display name, falling back to `Custom`
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "Nero d'Avola" => GrapeVariety::NeroDAvola,
            "Syrah" => GrapeVariety::Syrah,
            "Malvasia" => GrapeVariety::Malvasia,
            "Catarratto" => GrapeVariety::Catarratto,
            "Petit Verdot" => GrapeVariety::PetitVerdot,
            "Grillo" => GrapeVariety::Grillo,
            other => GrapeVariety::Custom(other.to_string()),
        }
    }

    pub fn profile(&self) -> VarietyProfile {
        let base = VarietyProfile::default();
        match self {
            GrapeVariety::NeroDAvola => VarietyProfile {
                mass_scale: 1.2,
                sugar_offset: 1.0,
                juice_yield_mean: 0.66,
                high_yield: true,
                ..base
            },
            GrapeVariety::Syrah => VarietyProfile {
                mass_scale: 1.1,
                sugar_offset: 0.8,
                juice_yield_mean: 0.65,
                high_yield: true,
                ..base
            },
            GrapeVariety::Malvasia => VarietyProfile {
                mass_scale: 0.9,
                sugar_offset: 0.2,
                acidity_offset: -0.1,
                juice_yield_mean: 0.64,
                ..base
            },
            GrapeVariety::Catarratto => VarietyProfile {
                mass_scale: 1.0,
                sugar_offset: -0.3,
                acidity_offset: 0.2,
                juice_yield_mean: 0.63,
                ..base
            },
            GrapeVariety::PetitVerdot => VarietyProfile {
                mass_scale: 0.8,
                sugar_offset: 0.6,
                acidity_offset: -0.2,
                juice_yield_mean: 0.62,
                ..base
            },
            GrapeVariety::Grillo => VarietyProfile {
                mass_scale: 1.1,
                sugar_offset: -0.1,
                juice_yield_mean: 0.64,
                high_yield: true,
                ..base
            },
            GrapeVariety::Custom(_) => base,
        }
    }
}

impl std::fmt::Display for GrapeVariety {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrapeVariety::NeroDAvola => write!(f, "Nero d'Avola"),
            GrapeVariety::Syrah => write!(f, "Syrah"),
            GrapeVariety::Malvasia => write!(f, "Malvasia"),
            GrapeVariety::Catarratto => write!(f, "Catarratto"),
            GrapeVariety::PetitVerdot => write!(f, "Petit Verdot"),
            GrapeVariety::Grillo => write!(f, "Grillo"),
            GrapeVariety::Custom(name) => write!(f, "{}", name),
        }
    }
}

impl From<String> for GrapeVariety {
    fn from(name: String) -> Self {
        GrapeVariety::from_name(&name)
    }
}

impl From<GrapeVariety> for String {
    fn from(variety: GrapeVariety) -> Self {
        variety.to_string()
    }
}
