//! Harvest models

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::WeatherSnapshot;
use crate::types::flag;

/// One simulated observation for a day, plot and variety
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestRecord {
    pub date: NaiveDate,
    pub plot: String,
    pub altitude_meters: i32,
    pub variety: String,
    pub irrigated: bool,
    pub weather: WeatherSnapshot,
    pub drought: bool,
    pub harvested_kg: f64,
    /// Present if and only if `harvested_kg > 0`
    pub quality: Option<GrapeQuality>,
    pub economics: HarvestEconomics,
}

impl HarvestRecord {
    pub fn is_harvested(&self) -> bool {
        self.harvested_kg > 0.0
    }
}

/// Must and grape measurements taken on a harvested lot of fruit
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GrapeQuality {
    pub sugar_brix: f64,
    pub acidity_g_per_l: f64,
    pub juice_yield_l_per_kg: f64,
    /// Share of the mass lost before pressing (0-1)
    pub discard_fraction: f64,
}

/// Cost and revenue of one harvest day, in euro
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HarvestEconomics {
    pub labor_cost: Decimal,
    pub total_cost: Decimal,
    pub revenue: Decimal,
    pub margin: Decimal,
}

impl HarvestEconomics {
    /// Build the ledger from its parts; total and margin are always derived
    pub fn new(labor_cost: Decimal, other_costs: Decimal, revenue: Decimal) -> Self {
        let total_cost = labor_cost + other_costs;
        Self {
            labor_cost,
            total_cost,
            revenue,
            margin: revenue - total_cost,
        }
    }
}

/// Flat row of the harvest record table, as written to and read from CSV
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HarvestRow {
    pub date: NaiveDate,
    pub plot: String,
    pub altitude_m: i32,
    pub variety: String,
    #[serde(with = "flag")]
    pub irrigated: bool,
    pub temperature_c: f64,
    pub rainfall_mm: f64,
    pub soil_moisture_pct: f64,
    #[serde(with = "flag")]
    pub drought_flag: bool,
    pub harvested_kg: f64,
    pub sugar_brix: Option<f64>,
    pub acidity_g_l: Option<f64>,
    pub juice_yield_l_per_kg: Option<f64>,
    pub discard_fraction: Option<f64>,
    pub labor_cost_eur: Decimal,
    pub total_cost_eur: Decimal,
    pub revenue_eur: Decimal,
    pub margin_eur: Decimal,
}

/// Reasons a table row cannot be turned back into a record
#[derive(Debug, Error, PartialEq)]
pub enum HarvestRowError {
    #[error("{plot}/{variety} on {date}: harvested row is missing {field}")]
    MissingQuality {
        date: NaiveDate,
        plot: String,
        variety: String,
        field: &'static str,
    },

    #[error("{plot}/{variety} on {date}: quality fields set on an empty harvest")]
    UnexpectedQuality {
        date: NaiveDate,
        plot: String,
        variety: String,
    },

    #[error("{plot}/{variety} on {date}: margin does not equal revenue minus total cost")]
    MarginMismatch {
        date: NaiveDate,
        plot: String,
        variety: String,
    },
}

impl From<&HarvestRecord> for HarvestRow {
    fn from(record: &HarvestRecord) -> Self {
        let quality = record.quality.as_ref();
        Self {
            date: record.date,
            plot: record.plot.clone(),
            altitude_m: record.altitude_meters,
            variety: record.variety.clone(),
            irrigated: record.irrigated,
            temperature_c: record.weather.temperature_celsius,
            rainfall_mm: record.weather.rainfall_mm,
            soil_moisture_pct: record.weather.soil_moisture_percent,
            drought_flag: record.drought,
            harvested_kg: record.harvested_kg,
            sugar_brix: quality.map(|q| q.sugar_brix),
            acidity_g_l: quality.map(|q| q.acidity_g_per_l),
            juice_yield_l_per_kg: quality.map(|q| q.juice_yield_l_per_kg),
            discard_fraction: quality.map(|q| q.discard_fraction),
            labor_cost_eur: record.economics.labor_cost,
            total_cost_eur: record.economics.total_cost,
            revenue_eur: record.economics.revenue,
            margin_eur: record.economics.margin,
        }
    }
}

impl TryFrom<HarvestRow> for HarvestRecord {
    type Error = HarvestRowError;

    fn try_from(row: HarvestRow) -> Result<Self, Self::Error> {
        let quality = match (
            row.sugar_brix,
            row.acidity_g_l,
            row.juice_yield_l_per_kg,
            row.discard_fraction,
        ) {
            (Some(sugar_brix), Some(acidity_g_per_l), Some(juice_yield_l_per_kg), Some(discard_fraction)) => {
                Some(GrapeQuality {
                    sugar_brix,
                    acidity_g_per_l,
                    juice_yield_l_per_kg,
                    discard_fraction,
                })
            }
            (None, None, None, None) => None,
            (sugar, acidity, juice, _) => {
                let field = if sugar.is_none() {
                    "sugar_brix"
                } else if acidity.is_none() {
                    "acidity_g_l"
                } else if juice.is_none() {
                    "juice_yield_l_per_kg"
                } else {
                    "discard_fraction"
                };
                return Err(HarvestRowError::MissingQuality {
                    date: row.date,
                    plot: row.plot,
                    variety: row.variety,
                    field,
                });
            }
        };

        match (row.harvested_kg > 0.0, quality.is_some()) {
            (true, false) => {
                return Err(HarvestRowError::MissingQuality {
                    date: row.date,
                    plot: row.plot,
                    variety: row.variety,
                    field: "sugar_brix",
                })
            }
            (false, true) => {
                return Err(HarvestRowError::UnexpectedQuality {
                    date: row.date,
                    plot: row.plot,
                    variety: row.variety,
                })
            }
            _ => {}
        }

        if row.margin_eur != row.revenue_eur - row.total_cost_eur {
            return Err(HarvestRowError::MarginMismatch {
                date: row.date,
                plot: row.plot,
                variety: row.variety,
            });
        }

        Ok(Self {
            date: row.date,
            plot: row.plot,
            altitude_meters: row.altitude_m,
            variety: row.variety,
            irrigated: row.irrigated,
            weather: WeatherSnapshot::new(row.temperature_c, row.rainfall_mm, row.soil_moisture_pct),
            drought: row.drought_flag,
            harvested_kg: row.harvested_kg,
            quality,
            economics: HarvestEconomics {
                labor_cost: row.labor_cost_eur,
                total_cost: row.total_cost_eur,
                revenue: row.revenue_eur,
                margin: row.margin_eur,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn harvested_row() -> HarvestRow {
        HarvestRow {
            date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            plot: "Favara".to_string(),
            altitude_m: 0,
            variety: "Syrah".to_string(),
            irrigated: true,
            temperature_c: 28.4,
            rainfall_mm: 0.0,
            soil_moisture_pct: 21.3,
            drought_flag: false,
            harvested_kg: 1240.5,
            sugar_brix: Some(23.9),
            acidity_g_l: Some(6.52),
            juice_yield_l_per_kg: Some(0.651),
            discard_fraction: Some(0.284),
            labor_cost_eur: dec("306.84"),
            total_cost_eur: dec("411.84"),
            revenue_eur: dec("888.29"),
            margin_eur: dec("476.45"),
        }
    }

    #[test]
    fn test_economics_margin_is_exact() {
        let economics = HarvestEconomics::new(dec("306.84"), dec("105"), dec("888.29"));
        assert_eq!(economics.total_cost, dec("411.84"));
        assert_eq!(economics.margin, economics.revenue - economics.total_cost);
    }

    #[test]
    fn test_row_converts_to_record() {
        let record = HarvestRecord::try_from(harvested_row()).unwrap();
        assert!(record.is_harvested());
        assert_eq!(record.quality.unwrap().sugar_brix, 23.9);
        assert_eq!(HarvestRow::from(&record), harvested_row());
    }

    #[test]
    fn test_partial_quality_is_rejected() {
        let mut row = harvested_row();
        row.acidity_g_l = None;
        assert!(matches!(
            HarvestRecord::try_from(row),
            Err(HarvestRowError::MissingQuality { field: "acidity_g_l", .. })
        ));
    }

    #[test]
    fn test_quality_on_empty_harvest_is_rejected() {
        let mut row = harvested_row();
        row.harvested_kg = 0.0;
        assert!(matches!(
            HarvestRecord::try_from(row),
            Err(HarvestRowError::UnexpectedQuality { .. })
        ));
    }

    #[test]
    fn test_margin_mismatch_is_rejected() {
        let mut row = harvested_row();
        row.margin_eur = dec("476.46");
        assert!(matches!(
            HarvestRecord::try_from(row),
            Err(HarvestRowError::MarginMismatch { .. })
        ));
    }
}
