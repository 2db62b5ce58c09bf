//! Data types used by the aggregation pipeline.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A single sale event, already assigned to its reporting week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDateTime,
    pub portfolio_id: String,
    pub asset_type: String,
    #[serde(rename = "MWh")]
    pub mwh: f64,
    pub price: f64,
    pub year_week: String,
}

impl Transaction {
    /// Revenue of this single sale.
    pub fn sales_amount(&self) -> f64 {
        self.mwh * self.price
    }
}

/// Weekly metrics for one `(portfolio_id, asset_type)` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedRow {
    pub portfolio_id: String,
    pub asset_type: String,
    #[serde(rename = "MWh")]
    pub mwh: f64,
    /// Unweighted mean of the per-transaction prices.
    pub price: f64,
    /// Sum of the per-transaction `MWh * price` products.
    pub sales_amount: f64,
    pub transaction_count: usize,
    pub year_week: String,
}

/// One physical generation asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub portfolio_id: String,
    pub asset_id: String,
    pub geography: String,
    #[serde(rename = "ISO")]
    pub iso: String,
    pub operational_date: NaiveDate,
    pub timezone: String,
}

/// Portfolio-level facts derived from its asset records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub portfolio_id: String,
    pub asset_count: usize,
    pub primary_geography: Option<String>,
    pub iso_regions: Vec<String>,
    pub timezones: Vec<String>,
    pub oldest_asset_date: NaiveDate,
    pub newest_asset_date: NaiveDate,
    pub portfolio_age_years: f64,
}

/// An aggregated row left-joined with its portfolio summary.
///
/// `portfolio` is `None` when the sales data names a portfolio with no
/// asset records. Ratios are `None` whenever their denominator is missing
/// or zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRow {
    #[serde(flatten)]
    pub sales: AggregatedRow,
    pub portfolio: Option<PortfolioSummary>,
    pub mwh_per_asset: Option<f64>,
    pub revenue_per_asset: Option<f64>,
    pub revenue_per_mwh: Option<f64>,
}

impl EnrichedRow {
    pub fn asset_count(&self) -> Option<usize> {
        self.portfolio.as_ref().map(|p| p.asset_count)
    }

    pub fn primary_geography(&self) -> Option<&str> {
        self.portfolio
            .as_ref()
            .and_then(|p| p.primary_geography.as_deref())
    }

    pub fn portfolio_age_years(&self) -> Option<f64> {
        self.portfolio.as_ref().map(|p| p.portfolio_age_years)
    }
}

/// Metric values of one pair in one week of the comparison table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekMetrics {
    #[serde(rename = "MWh")]
    pub mwh: f64,
    pub price: f64,
    pub revenue_per_mwh: Option<f64>,
    pub sales_amount: f64,
}

/// One `(portfolio_id, asset_type)` row of the cross-week comparison.
///
/// `cells` is aligned with [`ComparisonTable::weeks`]; a `None` cell means
/// the pair had no sales that week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub portfolio_id: String,
    pub asset_type: String,
    pub cells: Vec<Option<WeekMetrics>>,
}

/// Pivot of all enriched rows: one row per pair, one column group per week.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparisonTable {
    pub weeks: Vec<String>,
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonTable {
    /// Looks up the metrics of a pair in a given week.
    pub fn cell(&self, portfolio_id: &str, asset_type: &str, week: &str) -> Option<&WeekMetrics> {
        let idx = self.weeks.iter().position(|w| w == week)?;
        self.rows
            .iter()
            .find(|r| r.portfolio_id == portfolio_id && r.asset_type == asset_type)
            .and_then(|r| r.cells.get(idx))
            .and_then(Option::as_ref)
    }
}

/// Cross-week totals for one `(portfolio_id, asset_type)` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub portfolio_id: String,
    pub asset_type: String,
    #[serde(rename = "MWh")]
    pub mwh: f64,
    pub sales_amount: f64,
    pub transaction_count: usize,
    /// Mean of the weekly mean prices.
    pub price: f64,
    pub asset_count: Option<usize>,
    pub primary_geography: Option<String>,
    pub portfolio_age_years: Option<f64>,
    pub avg_weekly_revenue: Option<f64>,
    pub avg_revenue_per_mwh: Option<f64>,
}

/// The three report artifacts produced once every week has been enriched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConsolidatedReport {
    pub comparison: ComparisonTable,
    pub summary: Vec<SummaryRow>,
    pub all_data: Vec<EnrichedRow>,
}
