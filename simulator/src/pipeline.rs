//! End-to-end season run: simulate, aggregate, export

use std::fs;
use std::io::BufWriter;
use std::path::PathBuf;

use shared::{FermentationLot, HarvestRecord};

use crate::config::Config;
use crate::error::SimResult;
use crate::services::reporting::{harvest_csv_string, lots_csv_string};
use crate::services::{
    fingerprint, LotAggregation, LotAggregator, RandomSource, SeasonSimulator, SeasonSummary,
    SeededRandom,
};

/// Everything one seeded run produces
#[derive(Debug, Clone)]
pub struct SeasonRun {
    pub seed: u64,
    pub records: Vec<HarvestRecord>,
    pub aggregation: LotAggregation,
    pub summary: SeasonSummary,
}

impl SeasonRun {
    pub fn lots(&self) -> &[FermentationLot] {
        &self.aggregation.lots
    }
}

/// Files written by [`write_outputs`]
#[derive(Debug, Clone)]
pub struct RunOutputs {
    pub harvest_path: PathBuf,
    pub lots_path: PathBuf,
    pub summary_path: Option<PathBuf>,
    /// SHA-256 of the harvest table as written
    pub harvest_fingerprint: String,
}

/// Simulate the season and build its lots with one random stream
///
/// The aggregator continues the stream left by the simulator, so the lot
/// table depends on the seed exactly like the harvest table does.
pub fn run_season(config: &Config) -> SimResult<SeasonRun> {
    let mut rng = SeededRandom::new(config.simulation.seed);
    run_season_with(config, &mut rng)
}

/// Same as [`run_season`] with a caller supplied random source
pub fn run_season_with<R>(config: &Config, rng: &mut R) -> SimResult<SeasonRun>
where
    R: RandomSource + ?Sized,
{
    let simulator = SeasonSimulator::new(config.season_settings())?;
    let aggregator = LotAggregator::new(config.lot_settings())?;

    tracing::info!(
        seed = config.simulation.seed,
        days = config.date_range().len_days(),
        plots = config.plots.len(),
        "Starting season run"
    );

    let records = simulator.run(rng);
    let aggregation = aggregator.aggregate(&records, rng);
    if aggregation.dropped_windows > 0 {
        tracing::warn!(
            dropped_windows = aggregation.dropped_windows,
            unassigned_records = aggregation.unassigned_records,
            "Some harvest windows were too light for a lot"
        );
    }
    let summary = SeasonSummary::build(&records, &aggregation.lots);

    Ok(SeasonRun {
        seed: config.simulation.seed,
        records,
        aggregation,
        summary,
    })
}

/// Build lots for an existing harvest table with a fresh stream from `seed`
pub fn aggregate_records(
    config: &Config,
    records: &[HarvestRecord],
    seed: u64,
) -> SimResult<LotAggregation> {
    let aggregator = LotAggregator::new(config.lot_settings())?;
    Ok(aggregator.aggregate(records, &mut SeededRandom::new(seed)))
}

/// Write both tables and, when configured, the summary
pub fn write_outputs(config: &Config, run: &SeasonRun) -> SimResult<RunOutputs> {
    fs::create_dir_all(&config.output.directory)?;

    let harvest_csv = harvest_csv_string(&run.records)?;
    let harvest_path = config.harvest_path();
    fs::write(&harvest_path, &harvest_csv)?;

    let lots_path = config.lots_path();
    fs::write(&lots_path, lots_csv_string(run.lots())?)?;

    let summary_path = config.summary_path();
    if let Some(path) = &summary_path {
        let file = BufWriter::new(fs::File::create(path)?);
        serde_json::to_writer_pretty(file, &run.summary)?;
    }

    let outputs = RunOutputs {
        harvest_path,
        lots_path,
        summary_path,
        harvest_fingerprint: fingerprint(harvest_csv.as_bytes()),
    };
    tracing::info!(
        harvest = %outputs.harvest_path.display(),
        lots = %outputs.lots_path.display(),
        fingerprint = %outputs.harvest_fingerprint,
        "Tables written"
    );
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn short_config() -> Config {
        let mut config = Config::default();
        config.simulation.end_date = NaiveDate::from_ymd_opt(2025, 9, 10).unwrap();
        config
    }

    #[test]
    fn test_run_is_reproducible() {
        let config = short_config();
        let a = run_season(&config).unwrap();
        let b = run_season(&config).unwrap();
        assert_eq!(a.records, b.records);
        assert_eq!(a.aggregation, b.aggregation);
        assert_eq!(a.summary, b.summary);
    }

    #[test]
    fn test_run_rejects_invalid_config() {
        let mut config = short_config();
        config.plots.clear();
        assert!(run_season(&config).unwrap_err().is_configuration());
    }

    #[test]
    fn test_write_outputs() {
        let mut config = short_config();
        let dir = std::env::temp_dir().join(format!("harvest-sim-pipeline-{}", std::process::id()));
        config.output.directory = dir.clone();

        let run = run_season(&config).unwrap();
        let outputs = write_outputs(&config, &run).unwrap();

        let written = fs::read(&outputs.harvest_path).unwrap();
        assert_eq!(fingerprint(&written), outputs.harvest_fingerprint);
        assert!(outputs.lots_path.exists());
        assert!(outputs.summary_path.unwrap().exists());

        fs::remove_dir_all(dir).ok();
    }
}
