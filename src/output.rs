//! Output formatting and persistence for consolidated reports.
//!
//! Writes the three report artifacts as CSV (and optionally JSON), and logs
//! a readable digest of the summary.

use crate::analyzers::types::{ComparisonTable, ConsolidatedReport, EnrichedRow, SummaryRow, WeekMetrics};
use crate::error::Result;
use chrono::NaiveDate;
use csv::Writer;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

pub const COMPARISON_FILE: &str = "comparison.csv";
pub const SUMMARY_FILE: &str = "summary.csv";
pub const ALL_DATA_FILE: &str = "all_data.csv";
pub const REPORT_JSON_FILE: &str = "report.json";

/// Separator for list-valued cells such as ISO regions.
const LIST_SEPARATOR: &str = "|";

/// Comparison metrics in column order.
const COMPARISON_METRICS: [&str; 4] = ["MWh", "price", "revenue_per_mwh", "sales_amount"];

fn metric_values(m: &WeekMetrics) -> [Option<f64>; 4] {
    [Some(m.mwh), Some(m.price), m.revenue_per_mwh, Some(m.sales_amount)]
}

/// Flat CSV shape of an [`EnrichedRow`]; missing portfolio fields become empty cells.
#[derive(Serialize)]
struct EnrichedCsvRow<'a> {
    portfolio_id: &'a str,
    asset_type: &'a str,
    #[serde(rename = "MWh")]
    mwh: f64,
    price: f64,
    sales_amount: f64,
    transaction_count: usize,
    year_week: &'a str,
    asset_count: Option<usize>,
    primary_geography: Option<&'a str>,
    iso_regions: Option<String>,
    oldest_asset_date: Option<NaiveDate>,
    newest_asset_date: Option<NaiveDate>,
    timezones: Option<String>,
    portfolio_age_years: Option<f64>,
    mwh_per_asset: Option<f64>,
    revenue_per_asset: Option<f64>,
    revenue_per_mwh: Option<f64>,
}

impl<'a> From<&'a EnrichedRow> for EnrichedCsvRow<'a> {
    fn from(row: &'a EnrichedRow) -> Self {
        let p = row.portfolio.as_ref();
        Self {
            portfolio_id: &row.sales.portfolio_id,
            asset_type: &row.sales.asset_type,
            mwh: row.sales.mwh,
            price: row.sales.price,
            sales_amount: row.sales.sales_amount,
            transaction_count: row.sales.transaction_count,
            year_week: &row.sales.year_week,
            asset_count: p.map(|p| p.asset_count),
            primary_geography: p.and_then(|p| p.primary_geography.as_deref()),
            iso_regions: p.map(|p| p.iso_regions.join(LIST_SEPARATOR)),
            oldest_asset_date: p.map(|p| p.oldest_asset_date),
            newest_asset_date: p.map(|p| p.newest_asset_date),
            timezones: p.map(|p| p.timezones.join(LIST_SEPARATOR)),
            portfolio_age_years: p.map(|p| p.portfolio_age_years),
            mwh_per_asset: row.mwh_per_asset,
            revenue_per_asset: row.revenue_per_asset,
            revenue_per_mwh: row.revenue_per_mwh,
        }
    }
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Writes the full enriched dataset as CSV.
pub fn write_all_data<W: Write>(writer: W, rows: &[EnrichedRow]) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(EnrichedCsvRow::from(row))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the cross-week summary as CSV.
pub fn write_summary<W: Write>(writer: W, rows: &[SummaryRow]) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the comparison pivot as CSV with one `<metric>_<week>` column per
/// metric and week. Weeks without sales are left empty.
pub fn write_comparison<W: Write>(writer: W, table: &ComparisonTable) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);

    let mut header = vec!["portfolio_id".to_string(), "asset_type".to_string()];
    for metric in COMPARISON_METRICS {
        for week in &table.weeks {
            header.push(format!("{metric}_{week}"));
        }
    }
    wtr.write_record(&header)?;

    for row in &table.rows {
        let mut record = vec![row.portfolio_id.clone(), row.asset_type.clone()];
        let values: Vec<[Option<f64>; 4]> = row
            .cells
            .iter()
            .map(|c| c.as_ref().map(metric_values).unwrap_or_default())
            .collect();
        for metric in 0..COMPARISON_METRICS.len() {
            for week in &values {
                record.push(cell(week[metric]));
            }
        }
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes every report artifact into `dir`, creating it if needed.
pub fn write_report(dir: &Path, report: &ConsolidatedReport, json: bool) -> Result<()> {
    fs::create_dir_all(dir)?;

    write_comparison(File::create(dir.join(COMPARISON_FILE))?, &report.comparison)?;
    write_summary(File::create(dir.join(SUMMARY_FILE))?, &report.summary)?;
    write_all_data(File::create(dir.join(ALL_DATA_FILE))?, &report.all_data)?;

    if json {
        let file = File::create(dir.join(REPORT_JSON_FILE))?;
        serde_json::to_writer_pretty(file, report)?;
    }

    info!(
        dir = %dir.display(),
        json,
        pairs = report.summary.len(),
        rows = report.all_data.len(),
        "Report written"
    );
    Ok(())
}

/// Writes raw records (transactions or assets) as CSV at `path`.
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    debug!(path = %path.display(), rows = records.len(), "Records written");
    Ok(())
}

/// Logs one line per summary row.
pub fn log_summary(rows: &[SummaryRow]) {
    for row in rows {
        info!(
            portfolio_id = %row.portfolio_id,
            asset_type = %row.asset_type,
            mwh = row.mwh,
            sales_amount = row.sales_amount,
            transactions = row.transaction_count,
            avg_weekly_revenue = ?row.avg_weekly_revenue,
            avg_revenue_per_mwh = ?row.avg_revenue_per_mwh,
            "Summary"
        );
    }
}
