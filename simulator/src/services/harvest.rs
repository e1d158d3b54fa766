//! Season simulator producing the harvest record table

use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared::{
    clip, round_to, to_currency, validation, DateRange, GrapeQuality, GrapeVariety,
    HarvestEconomics, HarvestRecord, VarietyProfile, VineyardPlot, WeatherSnapshot,
};

use super::random::RandomSource;
use super::weather::{daily_rainfall, daily_temperature, SoilMoistureState};
use crate::error::{SimError, SimResult};

/// Daily chance that a plot/variety is picked under ideal conditions
pub const BASE_HARVEST_PROBABILITY: f64 = 0.10;
/// Temperature at which picking is most likely (°C)
pub const IDEAL_HARVEST_TEMPERATURE: f64 = 28.0;
pub const TEMPERATURE_FITNESS_BOUNDS: (f64, f64) = (0.6, 1.2);
/// Rain above this stops most crews (mm)
pub const HEAVY_RAIN_MM: f64 = 5.0;
pub const HEAVY_RAIN_PENALTY: f64 = 0.5;
pub const HIGH_YIELD_BONUS: f64 = 1.1;

/// Mean picked mass for a unit-scale, non-irrigated variety (kg)
pub const BASE_HARVEST_MASS_KG: f64 = 600.0;
pub const IRRIGATION_MASS_FACTOR: f64 = 2.0;
/// Standard deviation of the picked mass as a share of its mean
pub const MASS_VARIATION: f64 = 0.35;

pub const SUGAR_BASELINE_BRIX: f64 = 22.5;
pub const SUGAR_BOUNDS: (f64, f64) = (18.0, 26.0);
pub const ACIDITY_BASELINE_G_L: f64 = 6.8;
pub const ACIDITY_BOUNDS: (f64, f64) = (5.5, 8.2);
pub const JUICE_YIELD_SD: f64 = 0.015;
pub const JUICE_YIELD_BOUNDS: (f64, f64) = (0.60, 0.70);
/// Juice yield assumed for revenue when nothing was measured (L/kg)
pub const DEFAULT_JUICE_YIELD: f64 = 0.64;

pub const LABOR_BASE_COST: f64 = 220.0;
pub const LABOR_COST_PER_KG: f64 = 0.07;
pub const MACHINERY_COST: f64 = 60.0;
/// Irrigation surcharge on days with under 3 mm of rain
pub const DRY_IRRIGATION_COST: f64 = 45.0;
pub const WET_IRRIGATION_COST: f64 = 15.0;
pub const DRY_DAY_RAIN_MM: f64 = 3.0;
pub const REVENUE_MULTIPLIER: f64 = 1.1;

/// Inputs of one season run
#[derive(Debug, Clone)]
pub struct SeasonSettings {
    pub season: DateRange,
    pub plots: Vec<VineyardPlot>,
    pub irrigation_probability: f64,
    /// Inclusive lower and exclusive upper bound of the discard draw
    pub discard_range: (f64, f64),
}

impl SeasonSettings {
    pub fn validate(&self) -> SimResult<()> {
        validation::validate_date_range(&self.season)
            .map_err(|m| SimError::invalid("season", m))?;
        validation::validate_plots(&self.plots).map_err(|m| SimError::invalid("plots", m))?;
        validation::validate_probability(self.irrigation_probability)
            .map_err(|m| SimError::invalid("irrigation_probability", m))?;
        validation::validate_fraction_range(self.discard_range.0, self.discard_range.1)
            .map_err(|m| SimError::invalid("discard_range", m))?;
        Ok(())
    }
}

/// Walks the season day by day and emits one record per day, plot and variety
#[derive(Debug, Clone)]
pub struct SeasonSimulator {
    settings: SeasonSettings,
}

impl SeasonSimulator {
    /// Create a simulator, rejecting malformed settings before any draw
    pub fn new(settings: SeasonSettings) -> SimResult<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    /// Number of records a run produces
    pub fn expected_records(&self) -> usize {
        let triples: usize = self.settings.plots.iter().map(|p| p.varieties.len()).sum();
        self.settings.season.len_days() * triples
    }

    /// Run the season. Draw order is date, then plot, then variety.
    #[tracing::instrument(skip_all, fields(start = %self.settings.season.start, end = %self.settings.season.end))]
    pub fn run<R>(&self, rng: &mut R) -> Vec<HarvestRecord>
    where
        R: RandomSource + ?Sized,
    {
        let mut moisture = SoilMoistureState::initialize(&self.settings.plots, rng);
        let mut records = Vec::with_capacity(self.expected_records());

        for date in self.settings.season.days() {
            let day_start = records.len();
            for plot in &self.settings.plots {
                for variety in &plot.varieties {
                    records.push(self.simulate_triple(date, plot, variety, &mut moisture, rng));
                }
            }
            let day = &records[day_start..];
            tracing::debug!(
                %date,
                harvests = day.iter().filter(|r| r.is_harvested()).count(),
                kg = day.iter().map(|r| r.harvested_kg).sum::<f64>(),
                "Simulated day"
            );
        }

        tracing::info!(
            records = records.len(),
            harvests = records.iter().filter(|r| r.is_harvested()).count(),
            "Season simulated"
        );
        records
    }

    fn simulate_triple<R>(
        &self,
        date: NaiveDate,
        plot: &VineyardPlot,
        variety: &GrapeVariety,
        moisture: &mut SoilMoistureState,
        rng: &mut R,
    ) -> HarvestRecord
    where
        R: RandomSource + ?Sized,
    {
        let profile = variety.profile();

        let irrigated = rng.bernoulli(self.settings.irrigation_probability);
        let temperature = daily_temperature(date, plot, rng);
        let rainfall = daily_rainfall(rng);
        let soil_moisture = moisture.apply(&plot.name, date, rainfall, irrigated);
        let conditions = WeatherSnapshot::new(temperature, rainfall, round_to(soil_moisture, 1));
        let drought = conditions.is_drought();

        let harvested_kg = round_to(harvest_mass(&profile, temperature, rainfall, irrigated, rng), 1);
        let quality = if harvested_kg > 0.0 {
            Some(GrapeQuality {
                sugar_brix: round_to(
                    sugar_content(&profile, temperature, rainfall, plot.altitude_factor(), rng),
                    1,
                ),
                acidity_g_per_l: round_to(
                    must_acidity(&profile, temperature, plot.altitude_factor(), rng),
                    2,
                ),
                juice_yield_l_per_kg: round_to(juice_yield(&profile, rng), 3),
                discard_fraction: round_to(
                    rng.uniform_range(self.settings.discard_range.0, self.settings.discard_range.1),
                    3,
                ),
            })
        } else {
            None
        };

        let economics = harvest_economics(harvested_kg, quality.as_ref(), irrigated, rainfall);

        HarvestRecord {
            date,
            plot: plot.name.clone(),
            altitude_meters: plot.altitude_meters,
            variety: variety.to_string(),
            irrigated,
            weather: conditions,
            drought,
            harvested_kg,
            quality,
            economics,
        }
    }
}

/// Chance of a pick given the day's conditions
pub fn harvest_probability(profile: &VarietyProfile, temperature: f64, rainfall_mm: f64) -> f64 {
    let fitness = clip(
        1.0 - (temperature - IDEAL_HARVEST_TEMPERATURE).abs() / 10.0,
        TEMPERATURE_FITNESS_BOUNDS.0,
        TEMPERATURE_FITNESS_BOUNDS.1,
    );
    let rain = if rainfall_mm > HEAVY_RAIN_MM { HEAVY_RAIN_PENALTY } else { 1.0 };
    let variety = if profile.high_yield { HIGH_YIELD_BONUS } else { 1.0 };
    BASE_HARVEST_PROBABILITY * fitness * rain * variety
}

/// Picked mass in kg, zero when the crew does not pick
///
/// Always consumes the pick draw; the mass draw only happens on a pick.
pub fn harvest_mass<R>(
    profile: &VarietyProfile,
    temperature: f64,
    rainfall_mm: f64,
    irrigated: bool,
    rng: &mut R,
) -> f64
where
    R: RandomSource + ?Sized,
{
    if rng.uniform() > harvest_probability(profile, temperature, rainfall_mm) {
        return 0.0;
    }
    let irrigation = if irrigated { IRRIGATION_MASS_FACTOR } else { 1.0 };
    let mean = BASE_HARVEST_MASS_KG * profile.mass_scale * irrigation;
    rng.normal(mean, mean * MASS_VARIATION).max(0.0)
}

/// Must sugar content in °Brix
pub fn sugar_content<R>(
    profile: &VarietyProfile,
    temperature: f64,
    rainfall_mm: f64,
    altitude_factor: f64,
    rng: &mut R,
) -> f64
where
    R: RandomSource + ?Sized,
{
    let rain = if rainfall_mm > HEAVY_RAIN_MM { 0.4 } else { 0.0 };
    let base = SUGAR_BASELINE_BRIX + (temperature - 26.0) * 0.25 - altitude_factor * 0.8 - rain;
    clip(
        base + profile.sugar_offset + rng.normal(0.0, 0.6),
        SUGAR_BOUNDS.0,
        SUGAR_BOUNDS.1,
    )
}

/// Must acidity in g/L; cooler and higher sites keep more acid
pub fn must_acidity<R>(
    profile: &VarietyProfile,
    temperature: f64,
    altitude_factor: f64,
    rng: &mut R,
) -> f64
where
    R: RandomSource + ?Sized,
{
    let base = ACIDITY_BASELINE_G_L - (temperature - 26.0) * 0.1 + altitude_factor * 0.4;
    clip(
        base + profile.acidity_offset + rng.normal(0.0, 0.25),
        ACIDITY_BOUNDS.0,
        ACIDITY_BOUNDS.1,
    )
}

/// Juice yield in L/kg around the variety's mean
pub fn juice_yield<R>(profile: &VarietyProfile, rng: &mut R) -> f64
where
    R: RandomSource + ?Sized,
{
    clip(
        rng.normal(profile.juice_yield_mean, JUICE_YIELD_SD),
        JUICE_YIELD_BOUNDS.0,
        JUICE_YIELD_BOUNDS.1,
    )
}

pub fn labor_cost(harvested_kg: f64) -> f64 {
    LABOR_BASE_COST + LABOR_COST_PER_KG * harvested_kg
}

/// Machinery plus the irrigation surcharge
pub fn other_costs(irrigated: bool, rainfall_mm: f64) -> f64 {
    let irrigation = match (irrigated, rainfall_mm < DRY_DAY_RAIN_MM) {
        (true, true) => DRY_IRRIGATION_COST,
        (true, false) => WET_IRRIGATION_COST,
        (false, _) => 0.0,
    };
    MACHINERY_COST + irrigation
}

pub fn revenue(harvested_kg: f64, juice_yield_l_per_kg: Option<f64>) -> f64 {
    if harvested_kg <= 0.0 {
        return 0.0;
    }
    harvested_kg * juice_yield_l_per_kg.unwrap_or(DEFAULT_JUICE_YIELD) * REVENUE_MULTIPLIER
}

/// Cost and revenue ledger at cent precision; margin is derived, never rounded separately
pub fn harvest_economics(
    harvested_kg: f64,
    quality: Option<&GrapeQuality>,
    irrigated: bool,
    rainfall_mm: f64,
) -> HarvestEconomics {
    let labor: Decimal = to_currency(labor_cost(harvested_kg));
    let other = to_currency(other_costs(irrigated, rainfall_mm));
    let income = to_currency(revenue(harvested_kg, quality.map(|q| q.juice_yield_l_per_kg)));
    HarvestEconomics::new(labor, other, income)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::random::SeededRandom;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn settings(plots: Vec<VineyardPlot>, days: u32) -> SeasonSettings {
        let start = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        SeasonSettings {
            season: DateRange::new(start, start + chrono::Duration::days(i64::from(days) - 1)),
            plots,
            irrigation_probability: 0.7,
            discard_range: (0.25, 0.35),
        }
    }

    #[test]
    fn test_harvest_probability_peaks_at_ideal_temperature() {
        let neutral = GrapeVariety::Catarratto.profile();
        assert!((harvest_probability(&neutral, 28.0, 0.0) - 0.10).abs() < 1e-12);
        assert!((harvest_probability(&neutral, 40.0, 0.0) - 0.06).abs() < 1e-12);
    }

    #[test]
    fn test_harvest_probability_modifiers() {
        let syrah = GrapeVariety::Syrah.profile();
        let neutral = GrapeVariety::Malvasia.profile();
        assert!((harvest_probability(&syrah, 28.0, 0.0) - 0.11).abs() < 1e-12);
        assert!((harvest_probability(&neutral, 28.0, 5.1) - 0.05).abs() < 1e-12);
        assert!((harvest_probability(&neutral, 28.0, 5.0) - 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_costs() {
        assert_eq!(labor_cost(0.0), 220.0);
        assert!((labor_cost(1000.0) - 290.0).abs() < 1e-9);
        assert_eq!(other_costs(true, 0.0), 105.0);
        assert_eq!(other_costs(true, 3.0), 75.0);
        assert_eq!(other_costs(false, 0.0), 60.0);
    }

    #[test]
    fn test_revenue_defaults() {
        assert_eq!(revenue(0.0, Some(0.66)), 0.0);
        assert!((revenue(100.0, None) - 70.4).abs() < 1e-9);
        assert!((revenue(100.0, Some(0.65)) - 71.5).abs() < 1e-9);
    }

    #[test]
    fn test_economics_of_empty_day() {
        let economics = harvest_economics(0.0, None, false, 0.0);
        assert_eq!(economics.labor_cost, dec("220"));
        assert_eq!(economics.total_cost, dec("280"));
        assert_eq!(economics.revenue, Decimal::ZERO);
        assert_eq!(economics.margin, dec("-280"));
    }

    #[test]
    fn test_new_rejects_empty_estate() {
        let err = SeasonSimulator::new(settings(vec![], 5)).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_new_rejects_inverted_season() {
        let mut s = settings(VineyardPlot::corradino_estate(), 5);
        std::mem::swap(&mut s.season.start, &mut s.season.end);
        assert!(SeasonSimulator::new(s).is_err());
    }

    #[test]
    fn test_one_record_per_triple() {
        let simulator = SeasonSimulator::new(settings(VineyardPlot::corradino_estate(), 4)).unwrap();
        let records = simulator.run(&mut SeededRandom::new(42));
        assert_eq!(records.len(), 4 * 8);
        assert_eq!(records.len(), simulator.expected_records());
        // date outer, plot middle, variety inner
        assert_eq!(records[0].plot, "SanGiuseppeJato");
        assert_eq!(records[0].variety, "Nero d'Avola");
        assert_eq!(records[3].plot, "Favara");
        assert_eq!(records[7].variety, "Grillo");
        assert_eq!(records[8].date, records[0].date.succ_opt().unwrap());
    }

    #[test]
    fn test_quality_present_iff_harvested() {
        let simulator = SeasonSimulator::new(settings(VineyardPlot::corradino_estate(), 40)).unwrap();
        let records = simulator.run(&mut SeededRandom::new(7));
        assert!(records.iter().any(|r| r.is_harvested()));
        for record in &records {
            assert_eq!(record.is_harvested(), record.quality.is_some());
            if let Some(q) = record.quality {
                assert!((18.0..=26.0).contains(&q.sugar_brix));
                assert!((5.5..=8.2).contains(&q.acidity_g_per_l));
                assert!((0.60..=0.70).contains(&q.juice_yield_l_per_kg));
                assert!((0.25..=0.35).contains(&q.discard_fraction));
            }
        }
    }

    #[test]
    fn test_varieties_of_a_plot_share_daily_moisture() {
        let plot = VineyardPlot::new(
            "SanGiuseppeJato",
            0,
            vec![GrapeVariety::NeroDAvola, GrapeVariety::Malvasia, GrapeVariety::Syrah],
        );
        let mut s = settings(vec![plot], 5);
        s.irrigation_probability = 1.0;
        let records = SeasonSimulator::new(s).unwrap().run(&mut SeededRandom::new(42));

        for day in records.chunks(3) {
            let first = day[0].weather.soil_moisture_percent;
            assert!(
                day.iter().all(|r| r.weather.soil_moisture_percent == first),
                "moisture differs between varieties on {}",
                day[0].date
            );
        }
        // irrigated every day: +5 − 2.5 at most once per day
        for pair in records.chunks(3).collect::<Vec<_>>().windows(2) {
            let rise = pair[1][0].weather.soil_moisture_percent
                - pair[0][0].weather.soil_moisture_percent;
            let rain = pair[1][0].weather.rainfall_mm;
            assert!(rise <= 2.5 + rain * 0.5 + 0.11, "rise {} on {}", rise, pair[1][0].date);
        }
    }

    #[test]
    fn test_drought_flag_matches_conditions() {
        let simulator = SeasonSimulator::new(settings(VineyardPlot::corradino_estate(), 30)).unwrap();
        for record in simulator.run(&mut SeededRandom::new(3)) {
            if record.drought {
                assert_eq!(record.weather.rainfall_mm, 0.0);
                assert!(record.weather.soil_moisture_percent < 15.0);
            }
            if record.weather.rainfall_mm > 0.0 || record.weather.soil_moisture_percent >= 15.0 {
                assert!(!record.drought);
            }
        }
    }
}
