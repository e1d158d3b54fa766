//! Lot aggregator turning consecutive harvests into fermentation lots

use std::collections::BTreeMap;

use chrono::NaiveDate;
use shared::{
    generate_lot_id, mean_or_default, round_to, validation, FermentationLot, HarvestRecord,
    AUTO_LOT_NOTE,
};

use super::random::RandomSource;
use crate::error::{SimError, SimResult};

/// Cellar temperature sits this far below the field average (°C)
pub const FERMENTATION_TEMPERATURE_OFFSET: f64 = 4.0;
pub const FERMENTATION_TEMPERATURE_SD: f64 = 0.5;
/// Sugar consumed by a complete fermentation, drawn uniformly (°Brix)
pub const SUGAR_DEPLETION_RANGE: (f64, f64) = (20.0, 22.0);
/// Residual sugar never drops below this (°Brix)
pub const MIN_FINAL_BRIX: f64 = 0.2;

pub const FALLBACK_TEMPERATURE_C: f64 = 26.0;
pub const FALLBACK_SUGAR_BRIX: f64 = 22.5;
pub const FALLBACK_JUICE_YIELD: f64 = 0.64;
pub const FALLBACK_DISCARD_FRACTION: f64 = 0.30;

/// Window sizing and the mass a window needs to become a lot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LotSettings {
    /// Smallest window, inclusive
    pub window_min: usize,
    /// Largest window, exclusive
    pub window_max: usize,
    pub min_mass_kg: f64,
}

impl Default for LotSettings {
    fn default() -> Self {
        Self {
            window_min: 3,
            window_max: 7,
            min_mass_kg: 300.0,
        }
    }
}

impl LotSettings {
    pub fn validate(&self) -> SimResult<()> {
        validation::validate_window_bounds(self.window_min, self.window_max)
            .map_err(|m| SimError::invalid("window_max", m))?;
        validation::validate_min_lot_mass(self.min_mass_kg)
            .map_err(|m| SimError::invalid("min_mass_kg", m))?;
        Ok(())
    }
}

/// Lots built from a harvest table plus what was left out
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LotAggregation {
    pub lots: Vec<FermentationLot>,
    /// Windows under the mass threshold
    pub dropped_windows: usize,
    /// Harvested records that ended up in no lot
    pub unassigned_records: usize,
}

/// Groups harvested records by plot and variety and cuts them into lots
#[derive(Debug, Clone)]
pub struct LotAggregator {
    settings: LotSettings,
}

impl LotAggregator {
    pub fn new(settings: LotSettings) -> SimResult<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    /// Build the lot table. Groups are visited in (plot, variety) order.
    #[tracing::instrument(skip_all, fields(records = records.len()))]
    pub fn aggregate<R>(&self, records: &[HarvestRecord], rng: &mut R) -> LotAggregation
    where
        R: RandomSource + ?Sized,
    {
        let mut outcome = LotAggregation::default();

        for ((plot, variety), group) in partition_harvests(records) {
            let mut cursor = 0;
            while cursor < group.len() {
                let size = rng.integer(self.settings.window_min, self.settings.window_max);
                let end = (cursor + size).min(group.len());
                let window = &group[cursor..end];
                cursor += size;

                let input_kg: f64 = window.iter().map(|r| r.harvested_kg).sum();
                if input_kg < self.settings.min_mass_kg {
                    tracing::debug!(
                        %plot,
                        %variety,
                        input_kg,
                        records = window.len(),
                        "Dropped undersized window"
                    );
                    outcome.dropped_windows += 1;
                    outcome.unassigned_records += window.len();
                    continue;
                }

                outcome
                    .lots
                    .push(build_lot(&plot, &variety, window, input_kg, rng));
            }
        }

        tracing::info!(
            lots = outcome.lots.len(),
            dropped_windows = outcome.dropped_windows,
            unassigned_records = outcome.unassigned_records,
            "Fermentation lots built"
        );
        outcome
    }
}

/// Harvested records grouped by (plot, variety), each group in date order
pub fn partition_harvests(
    records: &[HarvestRecord],
) -> BTreeMap<(String, String), Vec<&HarvestRecord>> {
    let mut groups: BTreeMap<(String, String), Vec<&HarvestRecord>> = BTreeMap::new();
    for record in records.iter().filter(|r| r.is_harvested()) {
        groups
            .entry((record.plot.clone(), record.variety.clone()))
            .or_default()
            .push(record);
    }
    for group in groups.values_mut() {
        group.sort_by_key(|r| r.date);
    }
    groups
}

/// Turn a qualifying window into a lot
///
/// Draws the sugar depletion first, then the cellar temperature noise.
fn build_lot<R>(
    plot: &str,
    variety: &str,
    window: &[&HarvestRecord],
    input_kg: f64,
    rng: &mut R,
) -> FermentationLot
where
    R: RandomSource + ?Sized,
{
    // Windows are never empty here: the mass check rejects them first.
    let start_date = window.iter().map(|r| r.date).min().unwrap_or(NaiveDate::MIN);
    let end_date = window.iter().map(|r| r.date).max().unwrap_or(NaiveDate::MIN);

    let qualities: Vec<_> = window.iter().filter_map(|r| r.quality).collect();
    let mean_temperature = mean_or_default(
        window.iter().map(|r| r.weather.temperature_celsius),
        FALLBACK_TEMPERATURE_C,
    );
    let initial_brix = mean_or_default(qualities.iter().map(|q| q.sugar_brix), FALLBACK_SUGAR_BRIX);
    let juice_yield = mean_or_default(
        qualities.iter().map(|q| q.juice_yield_l_per_kg),
        FALLBACK_JUICE_YIELD,
    );
    let discard_fraction = mean_or_default(
        qualities.iter().map(|q| q.discard_fraction),
        FALLBACK_DISCARD_FRACTION,
    );

    let depletion = rng.uniform_range(SUGAR_DEPLETION_RANGE.0, SUGAR_DEPLETION_RANGE.1);
    let final_brix = round_to(initial_brix - depletion, 1)
        .max(MIN_FINAL_BRIX)
        .min(initial_brix.max(MIN_FINAL_BRIX));
    let ferment_temp = mean_temperature - FERMENTATION_TEMPERATURE_OFFSET
        + rng.normal(0.0, FERMENTATION_TEMPERATURE_SD);

    FermentationLot {
        lot_id: generate_lot_id(plot, variety, start_date),
        start_date,
        end_date,
        variety: variety.to_string(),
        plot: plot.to_string(),
        input_kg: round_to(input_kg, 1),
        ferment_temp_c: round_to(ferment_temp, 1),
        initial_brix: round_to(initial_brix, 1),
        final_brix,
        volume_l: round_to(input_kg * juice_yield * (1.0 - discard_fraction), 1),
        discard_fraction: round_to(discard_fraction, 3),
        notes: AUTO_LOT_NOTE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::random::SeededRandom;
    use shared::{GrapeQuality, HarvestEconomics, WeatherSnapshot};

    fn record(day: u32, kg: f64) -> HarvestRecord {
        HarvestRecord {
            date: NaiveDate::from_ymd_opt(2025, 9, day).unwrap(),
            plot: "Favara".to_string(),
            altitude_meters: 0,
            variety: "Syrah".to_string(),
            irrigated: true,
            weather: WeatherSnapshot::new(28.0, 0.0, 20.0),
            drought: false,
            harvested_kg: kg,
            quality: (kg > 0.0).then_some(GrapeQuality {
                sugar_brix: 24.0,
                acidity_g_per_l: 6.5,
                juice_yield_l_per_kg: 0.65,
                discard_fraction: 0.3,
            }),
            economics: HarvestEconomics::new(Default::default(), Default::default(), Default::default()),
        }
    }

    #[test]
    fn test_partition_skips_empty_and_sorts() {
        let records = vec![record(3, 100.0), record(1, 0.0), record(2, 50.0)];
        let groups = partition_harvests(&records);
        let group = &groups[&("Favara".to_string(), "Syrah".to_string())];
        assert_eq!(group.len(), 2);
        assert!(group[0].date < group[1].date);
    }

    #[test]
    fn test_lot_metrics() {
        let records = vec![record(1, 400.0), record(2, 400.0), record(3, 400.0)];
        let window: Vec<&HarvestRecord> = records.iter().collect();
        let lot = build_lot("Favara", "Syrah", &window, 1200.0, &mut SeededRandom::new(1));
        assert_eq!(lot.lot_id, "LOT-FAV-SYRAH-2025-09-01");
        assert_eq!(lot.end_date, NaiveDate::from_ymd_opt(2025, 9, 3).unwrap());
        assert_eq!(lot.initial_brix, 24.0);
        assert!((2.0..=4.0).contains(&lot.final_brix));
        assert!((lot.volume_l - 546.0).abs() < 1e-9);
        assert!((lot.ferment_temp_c - 24.0).abs() < 3.0);
        assert_eq!(lot.notes, AUTO_LOT_NOTE);
    }

    #[test]
    fn test_final_brix_is_floored() {
        let mut records = vec![record(1, 400.0)];
        records[0].quality = records[0].quality.map(|q| GrapeQuality { sugar_brix: 18.0, ..q });
        let window: Vec<&HarvestRecord> = records.iter().collect();
        let lot = build_lot("Favara", "Syrah", &window, 400.0, &mut SeededRandom::new(4));
        assert_eq!(lot.final_brix, MIN_FINAL_BRIX);
    }

    #[test]
    fn test_settings_validation() {
        assert!(LotSettings::default().validate().is_ok());
        let bad = LotSettings {
            window_min: 0,
            ..LotSettings::default()
        };
        assert!(LotAggregator::new(bad).is_err());
        let bad = LotSettings {
            min_mass_kg: -1.0,
            ..LotSettings::default()
        };
        assert!(LotAggregator::new(bad).is_err());
    }

    #[test]
    fn test_light_partition_yields_no_lot() {
        let records: Vec<_> = (1..=8).map(|d| record(d, 30.0)).collect();
        let aggregator = LotAggregator::new(LotSettings::default()).unwrap();
        let outcome = aggregator.aggregate(&records, &mut SeededRandom::new(42));
        assert!(outcome.lots.is_empty());
        assert_eq!(outcome.unassigned_records, 8);
    }
}
