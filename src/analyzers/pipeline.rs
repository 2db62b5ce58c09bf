use crate::analyzers::aggregate::aggregate_batch;
use crate::analyzers::consolidate::{consolidate, ensure_unique_weeks};
use crate::analyzers::enrich::enrich_batch;
use crate::analyzers::types::{AssetRecord, ConsolidatedReport, EnrichedRow, Transaction};
use crate::error::Result;
use chrono::NaiveDate;
use tracing::info;

/// Runs every week through aggregation and enrichment, then consolidates
/// the enriched weeks into a single report.
///
/// Weeks are processed in the order given. `as_of` is the reference date
/// for portfolio age and is shared by every week of the run, so two runs
/// over the same inputs with the same `as_of` produce identical reports.
///
/// # Errors
///
/// The first failing week aborts the run with [`ReportError::Week`];
/// no partial report is returned.
///
/// [`ReportError::Week`]: crate::error::ReportError::Week
#[tracing::instrument(skip_all, fields(weeks = weekly.len(), assets = assets.len(), as_of = %as_of))]
pub fn run_pipeline(
    weekly: &[(String, Vec<Transaction>)],
    assets: &[AssetRecord],
    as_of: NaiveDate,
) -> Result<ConsolidatedReport> {
    ensure_unique_weeks(weekly)?;

    let mut enriched: Vec<(String, Vec<EnrichedRow>)> = Vec::with_capacity(weekly.len());

    for (week, transactions) in weekly {
        let aggregated = aggregate_batch(transactions).map_err(|e| e.in_week(week))?;
        let rows = enrich_batch(&aggregated, assets, as_of).map_err(|e| e.in_week(week))?;

        info!(
            week = %week,
            transactions = transactions.len(),
            rows = rows.len(),
            "Combined with asset data for week"
        );
        enriched.push((week.clone(), rows));
    }

    info!(weeks = enriched.len(), "Processed data for all weeks");
    consolidate(&enriched)
}
