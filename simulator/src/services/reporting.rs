//! Reporting service for table export and season analytics
//! Provides CSV writers and readers for both tables and the season summary

use std::collections::BTreeMap;
use std::io::{Read, Write};

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use sha2::{Digest, Sha256};
use shared::{FermentationLot, HarvestRecord, HarvestRow};

use super::lot::{FALLBACK_DISCARD_FRACTION, FALLBACK_JUICE_YIELD};
use crate::error::SimResult;

/// Column order of the harvest record table
pub const HARVEST_COLUMNS: [&str; 18] = [
    "date",
    "plot",
    "altitude_m",
    "variety",
    "irrigated",
    "temperature_c",
    "rainfall_mm",
    "soil_moisture_pct",
    "drought_flag",
    "harvested_kg",
    "sugar_brix",
    "acidity_g_l",
    "juice_yield_l_per_kg",
    "discard_fraction",
    "labor_cost_eur",
    "total_cost_eur",
    "revenue_eur",
    "margin_eur",
];

/// Column order of the fermentation lot table
pub const LOT_COLUMNS: [&str; 12] = [
    "lot_id",
    "start_date",
    "end_date",
    "variety",
    "plot",
    "input_kg",
    "ferment_temp_c",
    "initial_brix",
    "final_brix",
    "volume_l",
    "discard_fraction",
    "notes",
];

// ============================================================================
// Table export
// ============================================================================

/// Write the harvest table; the header is written even for an empty season
pub fn write_harvest_csv<W: Write>(records: &[HarvestRecord], writer: W) -> SimResult<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(HARVEST_COLUMNS)?;
    for record in records {
        wtr.serialize(HarvestRow::from(record))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the lot table; an empty table is a header line only
pub fn write_lots_csv<W: Write>(lots: &[FermentationLot], writer: W) -> SimResult<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(LOT_COLUMNS)?;
    for lot in lots {
        wtr.serialize(lot)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Export the harvest table as an in-memory CSV string
pub fn harvest_csv_string(records: &[HarvestRecord]) -> SimResult<String> {
    let mut buffer = Vec::new();
    write_harvest_csv(records, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Export the lot table as an in-memory CSV string
pub fn lots_csv_string(lots: &[FermentationLot]) -> SimResult<String> {
    let mut buffer = Vec::new();
    write_lots_csv(lots, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Read a harvest table back, checking every row against the record invariants
pub fn read_harvest_csv<R: Read>(reader: R) -> SimResult<Vec<HarvestRecord>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for row in rdr.deserialize::<HarvestRow>() {
        records.push(HarvestRecord::try_from(row?)?);
    }
    Ok(records)
}

/// Hex SHA-256 of a serialized table, used to compare runs
pub fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

// ============================================================================
// Season summary
// ============================================================================

/// Headline figures for the whole season
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SeasonSummary {
    pub season_start: Option<NaiveDate>,
    pub season_end: Option<NaiveDate>,
    pub record_count: usize,
    pub harvest_events: usize,
    pub drought_records: usize,
    pub totals: GroupTotals,
    pub mean_sugar_brix: Option<f64>,
    pub mean_acidity_g_l: Option<f64>,
    pub mean_juice_yield_l_per_kg: Option<f64>,
    pub by_plot: Vec<GroupTotals>,
    pub by_variety: Vec<GroupTotals>,
    pub by_irrigation: Vec<GroupTotals>,
    pub lots: LotTotals,
}

/// Production and cost totals for one slice of the harvest table
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GroupTotals {
    pub key: String,
    pub records: usize,
    pub harvest_events: usize,
    pub harvested_kg: f64,
    pub estimated_liters: f64,
    pub revenue_eur: Decimal,
    pub total_cost_eur: Decimal,
    pub margin_eur: Decimal,
    /// Estimated liters per euro spent, unset when nothing was spent
    pub liters_per_eur: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LotTotals {
    pub count: usize,
    pub input_kg: f64,
    pub volume_l: f64,
    pub mean_ferment_temp_c: Option<f64>,
}

/// Liters a record is expected to press: `kg × yield × (1 − discard)`
pub fn estimated_liters(record: &HarvestRecord) -> f64 {
    let (juice_yield, discard) = record
        .quality
        .map(|q| (q.juice_yield_l_per_kg, q.discard_fraction))
        .unwrap_or((FALLBACK_JUICE_YIELD, FALLBACK_DISCARD_FRACTION));
    record.harvested_kg * juice_yield * (1.0 - discard)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

fn totals<'a>(key: impl Into<String>, records: impl IntoIterator<Item = &'a HarvestRecord>) -> GroupTotals {
    let mut group = GroupTotals {
        key: key.into(),
        records: 0,
        harvest_events: 0,
        harvested_kg: 0.0,
        estimated_liters: 0.0,
        revenue_eur: Decimal::ZERO,
        total_cost_eur: Decimal::ZERO,
        margin_eur: Decimal::ZERO,
        liters_per_eur: None,
    };
    for record in records {
        group.records += 1;
        if record.is_harvested() {
            group.harvest_events += 1;
        }
        group.harvested_kg += record.harvested_kg;
        group.estimated_liters += estimated_liters(record);
        group.revenue_eur += record.economics.revenue;
        group.total_cost_eur += record.economics.total_cost;
        group.margin_eur += record.economics.margin;
    }
    group.liters_per_eur = group
        .total_cost_eur
        .to_f64()
        .filter(|cost| *cost > 0.0)
        .map(|cost| group.estimated_liters / cost);
    group
}

fn grouped<'a, F>(records: &'a [HarvestRecord], key: F) -> Vec<GroupTotals>
where
    F: Fn(&HarvestRecord) -> String,
{
    let mut groups: BTreeMap<String, Vec<&'a HarvestRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(key(record)).or_default().push(record);
    }
    groups
        .into_iter()
        .map(|(key, members)| totals(key, members))
        .collect()
}

impl SeasonSummary {
    pub fn build(records: &[HarvestRecord], lots: &[FermentationLot]) -> Self {
        let qualities: Vec<_> = records.iter().filter_map(|r| r.quality).collect();

        Self {
            season_start: records.iter().map(|r| r.date).min(),
            season_end: records.iter().map(|r| r.date).max(),
            record_count: records.len(),
            harvest_events: records.iter().filter(|r| r.is_harvested()).count(),
            drought_records: records.iter().filter(|r| r.drought).count(),
            totals: totals("season", records),
            mean_sugar_brix: mean(qualities.iter().map(|q| q.sugar_brix)),
            mean_acidity_g_l: mean(qualities.iter().map(|q| q.acidity_g_per_l)),
            mean_juice_yield_l_per_kg: mean(qualities.iter().map(|q| q.juice_yield_l_per_kg)),
            by_plot: grouped(records, |r| r.plot.clone()),
            by_variety: grouped(records, |r| r.variety.clone()),
            by_irrigation: grouped(records, |r| {
                if r.irrigated { "irrigated" } else { "not_irrigated" }.to_string()
            }),
            lots: LotTotals {
                count: lots.len(),
                input_kg: lots.iter().map(|l| l.input_kg).sum(),
                volume_l: lots.iter().map(|l| l.volume_l).sum(),
                mean_ferment_temp_c: mean(lots.iter().map(|l| l.ferment_temp_c)),
            },
        }
    }

    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{GrapeQuality, HarvestEconomics, WeatherSnapshot, AUTO_LOT_NOTE};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn record(day: u32, kg: f64, irrigated: bool) -> HarvestRecord {
        let economics = if kg > 0.0 {
            HarvestEconomics::new(dec("290"), dec("105"), dec("715"))
        } else {
            HarvestEconomics::new(dec("220"), dec("60"), Decimal::ZERO)
        };
        HarvestRecord {
            date: NaiveDate::from_ymd_opt(2025, 9, day).unwrap(),
            plot: "Favara".to_string(),
            altitude_meters: 0,
            variety: "Nero d'Avola".to_string(),
            irrigated,
            weather: WeatherSnapshot::new(27.5, 0.0, 14.2),
            drought: true,
            harvested_kg: kg,
            quality: (kg > 0.0).then_some(GrapeQuality {
                sugar_brix: 24.1,
                acidity_g_per_l: 6.25,
                juice_yield_l_per_kg: 0.65,
                discard_fraction: 0.3,
            }),
            economics,
        }
    }

    #[test]
    fn test_harvest_csv_layout() {
        let csv = harvest_csv_string(&[record(1, 1000.0, true), record(2, 0.0, false)]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], HARVEST_COLUMNS.join(","));
        assert_eq!(
            lines[1],
            "2025-09-01,Favara,0,Nero d'Avola,1,27.5,0.0,14.2,1,1000.0,24.1,6.25,0.65,0.3,290,395,715,320"
        );
        assert_eq!(
            lines[2],
            "2025-09-02,Favara,0,Nero d'Avola,0,27.5,0.0,14.2,1,0.0,,,,,220,280,0,-280"
        );
    }

    #[test]
    fn test_header_matches_serialized_fields() {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.serialize(HarvestRow::from(&record(1, 10.0, true))).unwrap();
        let text = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        assert_eq!(text.lines().next().unwrap(), HARVEST_COLUMNS.join(","));
    }

    #[test]
    fn test_empty_lot_table_has_header() {
        let csv = lots_csv_string(&[]).unwrap();
        assert_eq!(csv.trim_end(), LOT_COLUMNS.join(","));
    }

    #[test]
    fn test_lot_header_matches_serialized_fields() {
        let lot = FermentationLot {
            lot_id: "LOT-FAV-NERO-2025-09-01".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 9, 4).unwrap(),
            variety: "Nero d'Avola".to_string(),
            plot: "Favara".to_string(),
            input_kg: 2400.0,
            ferment_temp_c: 23.1,
            initial_brix: 24.0,
            final_brix: 2.6,
            volume_l: 1092.0,
            discard_fraction: 0.3,
            notes: AUTO_LOT_NOTE.to_string(),
        };
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.serialize(&lot).unwrap();
        let text = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        assert_eq!(text.lines().next().unwrap(), LOT_COLUMNS.join(","));
    }

    #[test]
    fn test_csv_reads_back() {
        let records = vec![record(1, 1000.0, true), record(2, 0.0, false)];
        let csv = harvest_csv_string(&records).unwrap();
        let parsed = read_harvest_csv(csv.as_bytes()).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let a = fingerprint(b"date,plot\n");
        assert_eq!(a.len(), 64);
        assert_eq!(a, fingerprint(b"date,plot\n"));
        assert_ne!(a, fingerprint(b"date,plot,variety\n"));
        assert_eq!(
            fingerprint(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_estimated_liters_defaults() {
        assert!((estimated_liters(&record(1, 1000.0, true)) - 455.0).abs() < 1e-9);
        assert_eq!(estimated_liters(&record(1, 0.0, true)), 0.0);
    }

    #[test]
    fn test_summary_totals() {
        let records = vec![record(1, 1000.0, true), record(2, 0.0, false)];
        let summary = SeasonSummary::build(&records, &[]);
        assert_eq!(summary.record_count, 2);
        assert_eq!(summary.harvest_events, 1);
        assert_eq!(summary.drought_records, 2);
        assert_eq!(summary.totals.revenue_eur, dec("715"));
        assert_eq!(summary.totals.total_cost_eur, dec("675"));
        assert_eq!(summary.totals.margin_eur, dec("40"));
        assert_eq!(summary.mean_sugar_brix, Some(24.1));
        assert_eq!(summary.by_irrigation.len(), 2);
        assert_eq!(summary.by_irrigation[0].key, "irrigated");
        assert_eq!(summary.lots.count, 0);
        assert!(summary.lots.mean_ferment_temp_c.is_none());
    }

    #[test]
    fn test_summary_of_empty_table() {
        let summary = SeasonSummary::build(&[], &[]);
        assert!(summary.season_start.is_none());
        assert!(summary.totals.liters_per_eur.is_none());
        assert!(summary.to_json().unwrap().contains("\"record_count\": 0"));
    }
}
