//! Vineyard Harvest Simulator - command line entry point
//!
//! Simulates a harvest season for the configured estate and writes the
//! harvest record table, the fermentation lot table and a season summary.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use simulator::services::{read_harvest_csv, reporting::lots_csv_string, SeasonSummary};
use simulator::{aggregate_records, run_season, write_outputs, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "harvest-sim")]
#[command(about = "Seeded vineyard harvest and fermentation lot simulator")]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Command line overrides applied on top of the loaded configuration
#[derive(Debug, Args)]
struct Overrides {
    /// Configuration file replacing config/{HSIM_ENVIRONMENT}
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// First season day (YYYY-MM-DD)
    #[arg(long, global = true)]
    start: Option<NaiveDate>,
    /// Last season day (YYYY-MM-DD)
    #[arg(long, global = true)]
    end: Option<NaiveDate>,
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,
    /// Skip the season summary file
    #[arg(long, global = true, default_value_t = false)]
    no_summary: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Simulate the season and write every output (default)
    Simulate,
    /// Rebuild fermentation lots from an existing harvest table
    Aggregate(AggregateArgs),
}

#[derive(Debug, Args)]
struct AggregateArgs {
    #[arg(long)]
    harvest: PathBuf,
    /// Lot table destination; defaults to the configured lot file
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(&cli.overrides)?;

    tracing::info!("Environment: {}", config.environment);

    match cli.command.unwrap_or(Commands::Simulate) {
        Commands::Simulate => simulate_command(&config),
        Commands::Aggregate(args) => aggregate_command(&config, &args),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "harvest_sim=info,simulator=info".into());
    let json = std::env::var("HSIM_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn load_config(overrides: &Overrides) -> Result<Config> {
    let mut config =
        Config::load_from(overrides.config.as_deref()).context("failed to load configuration")?;

    if let Some(seed) = overrides.seed {
        config.simulation.seed = seed;
    }
    if let Some(start) = overrides.start {
        config.simulation.start_date = start;
    }
    if let Some(end) = overrides.end {
        config.simulation.end_date = end;
    }
    if let Some(dir) = &overrides.output_dir {
        config.output.directory = dir.clone();
    }
    if overrides.no_summary {
        config.output.summary_file = None;
    }

    if let Err(err) = config.check() {
        tracing::error!(detail = ?err.detail(), "Configuration rejected");
        return Err(err).context("invalid configuration");
    }
    Ok(config)
}

fn simulate_command(config: &Config) -> Result<()> {
    let run = run_season(config)?;
    let outputs = write_outputs(config, &run).with_context(|| {
        format!(
            "failed to write outputs to {}",
            config.output.directory.display()
        )
    })?;

    let summary = &run.summary;
    tracing::info!(
        seed = run.seed,
        records = summary.record_count,
        harvest_events = summary.harvest_events,
        harvested_kg = summary.totals.harvested_kg,
        margin_eur = %summary.totals.margin_eur,
        lots = summary.lots.count,
        fingerprint = %outputs.harvest_fingerprint,
        "Season complete"
    );
    Ok(())
}

fn aggregate_command(config: &Config, args: &AggregateArgs) -> Result<()> {
    let file = File::open(&args.harvest)
        .with_context(|| format!("failed to open {}", args.harvest.display()))?;
    let records = read_harvest_csv(file)
        .with_context(|| format!("failed to read {}", args.harvest.display()))?;

    let aggregation = aggregate_records(config, &records, config.simulation.seed)?;
    let destination = args.output.clone().unwrap_or_else(|| config.lots_path());
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&destination, lots_csv_string(&aggregation.lots)?)
        .with_context(|| format!("failed to write {}", destination.display()))?;

    let summary = SeasonSummary::build(&records, &aggregation.lots);
    tracing::info!(
        records = records.len(),
        lots = summary.lots.count,
        volume_l = summary.lots.volume_l,
        output = %destination.display(),
        "Lots rebuilt"
    );
    Ok(())
}
