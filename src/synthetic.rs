//! Synthetic sample data for demos and local runs.
//!
//! Produces hourly transactions across a handful of portfolios and a small
//! asset register. Generation is seeded so a given [`SampleConfig`] always
//! yields the same data.

use crate::analyzers::types::AssetRecord;
use crate::analyzers::utility::round_to;
use crate::source::TransactionRecord;
use chrono::{Duration, Months, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const PORTFOLIOS: &[&str] = &["A001", "B002", "C003", "D004"];
const ASSET_TYPES: &[&str] = &["Wind", "Solar", "Gas"];
const REGIONS: &[&str] = &["North", "South", "East", "West"];
const ASSET_COUNT: usize = 12;
const HOURS_PER_WEEK: usize = 7 * 24;

/// Parameters for a synthetic dataset.
#[derive(Debug, Clone)]
pub struct SampleConfig {
    /// Number of weeks of hourly transactions.
    pub weeks: usize,
    pub seed: u64,
    /// Timestamp of the first transaction.
    pub start: NaiveDateTime,
    /// Assets become operational at some point in the ten years before this date.
    pub as_of: NaiveDate,
}

impl SampleConfig {
    pub fn new(seed: u64, as_of: NaiveDate) -> Self {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        Self {
            weeks: 4,
            seed,
            start,
            as_of,
        }
    }
}

/// A generated transaction log and asset register.
#[derive(Debug, Clone)]
pub struct SampleData {
    pub transactions: Vec<TransactionRecord>,
    pub assets: Vec<AssetRecord>,
}

/// Maps a geography label to the timezone its assets report in.
pub fn timezone_for(geography: &str) -> &'static str {
    match geography {
        "South" => "US/Central",
        "West" => "US/Pacific",
        _ => "US/Eastern",
    }
}

fn pick(rng: &mut StdRng, values: &[&str]) -> String {
    values.choose(rng).copied().unwrap_or_default().to_string()
}

/// Generates transactions and assets for `config`.
pub fn generate(config: &SampleConfig) -> SampleData {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let transactions = generate_transactions(&mut rng, config);
    let assets = generate_assets(&mut rng, config.as_of);
    SampleData {
        transactions,
        assets,
    }
}

fn generate_transactions(rng: &mut StdRng, config: &SampleConfig) -> Vec<TransactionRecord> {
    (0..config.weeks * HOURS_PER_WEEK)
        .map(|hour| TransactionRecord {
            date: config.start + Duration::hours(hour as i64),
            portfolio_id: pick(rng, PORTFOLIOS),
            asset_type: pick(rng, ASSET_TYPES),
            mwh: rng.gen_range(1..50) as f64,
            price: round_to(rng.gen_range(10.0..200.0), 2),
            year_week: None,
        })
        .collect()
}

fn generate_assets(rng: &mut StdRng, as_of: NaiveDate) -> Vec<AssetRecord> {
    let earliest = as_of
        .checked_sub_months(Months::new(120))
        .unwrap_or(as_of - Duration::days(3652));
    let span = ((as_of - earliest).num_days() + 1).max(ASSET_COUNT as i64) as usize;

    // Distinct operational dates.
    let offsets = rand::seq::index::sample(rng, span, ASSET_COUNT);

    offsets
        .iter()
        .enumerate()
        .map(|(i, offset)| {
            let geography = pick(rng, REGIONS);
            AssetRecord {
                portfolio_id: pick(rng, PORTFOLIOS),
                asset_id: format!("Asset_{:02}", i + 1),
                iso: pick(rng, REGIONS),
                operational_date: earliest + Duration::days(offset as i64),
                timezone: timezone_for(&geography).to_string(),
                geography,
            }
        })
        .collect()
}
