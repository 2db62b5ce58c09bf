//! Portfolio enrichment: asset facts merged onto weekly sales rows.

use crate::analyzers::types::{AggregatedRow, AssetRecord, EnrichedRow, PortfolioSummary};
use crate::analyzers::utility::{mode, ratio, round_to, unique_in_order};
use crate::error::{ReportError, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Days per year used for portfolio age. Leap years are averaged in.
const DAYS_PER_YEAR: f64 = 365.25;

/// Summarizes asset records per portfolio.
///
/// `as_of` is the reference date for `portfolio_age_years`; it is read once
/// by the caller so every portfolio in a call shares the same clock.
///
/// # Errors
///
/// Returns [`ReportError::InvalidField`] if a portfolio or asset id is empty.
pub fn summarize_portfolios(
    assets: &[AssetRecord],
    as_of: NaiveDate,
) -> Result<BTreeMap<String, PortfolioSummary>> {
    let mut by_portfolio: BTreeMap<&str, Vec<&AssetRecord>> = BTreeMap::new();

    for (row, asset) in assets.iter().enumerate() {
        if asset.portfolio_id.trim().is_empty() {
            return Err(ReportError::invalid(row, "portfolio_id", "must not be empty"));
        }
        if asset.asset_id.trim().is_empty() {
            return Err(ReportError::invalid(row, "asset_id", "must not be empty"));
        }
        by_portfolio
            .entry(asset.portfolio_id.as_str())
            .or_default()
            .push(asset);
    }

    let mut summaries = BTreeMap::new();
    for (portfolio_id, group) in by_portfolio {
        if let Some(summary) = summarize_group(portfolio_id, &group, as_of) {
            summaries.insert(portfolio_id.to_string(), summary);
        }
    }

    Ok(summaries)
}

fn summarize_group(
    portfolio_id: &str,
    group: &[&AssetRecord],
    as_of: NaiveDate,
) -> Option<PortfolioSummary> {
    let oldest = group.iter().map(|a| a.operational_date).min()?;
    let newest = group.iter().map(|a| a.operational_date).max()?;

    let age_days = (as_of - oldest).num_days();
    if age_days < 0 {
        warn!(portfolio_id, %oldest, %as_of, "Oldest asset is dated after the reference date");
    }

    Some(PortfolioSummary {
        portfolio_id: portfolio_id.to_string(),
        asset_count: group.len(),
        primary_geography: mode(group.iter().map(|a| a.geography.as_str())),
        iso_regions: unique_in_order(group.iter().map(|a| a.iso.as_str())),
        timezones: unique_in_order(group.iter().map(|a| a.timezone.as_str())),
        oldest_asset_date: oldest,
        newest_asset_date: newest,
        portfolio_age_years: round_to(age_days as f64 / DAYS_PER_YEAR, 1),
    })
}

/// Left-joins aggregated rows with precomputed portfolio summaries and
/// derives per-asset and per-MWh metrics. Every input row is kept.
pub fn merge_with_summaries(
    batch: &[AggregatedRow],
    summaries: &BTreeMap<String, PortfolioSummary>,
) -> Vec<EnrichedRow> {
    batch
        .iter()
        .map(|sales| {
            let portfolio = summaries.get(&sales.portfolio_id).cloned();
            let asset_count = portfolio.as_ref().map(|p| p.asset_count as f64);

            EnrichedRow {
                mwh_per_asset: ratio(sales.mwh, asset_count),
                revenue_per_asset: ratio(sales.sales_amount, asset_count),
                revenue_per_mwh: ratio(sales.sales_amount, Some(sales.mwh)),
                sales: sales.clone(),
                portfolio,
            }
        })
        .collect()
}

/// Enriches one aggregated week with asset-portfolio facts.
///
/// Portfolios with sales but no assets keep their row with `portfolio`
/// set to `None`.
pub fn enrich_batch(
    batch: &[AggregatedRow],
    assets: &[AssetRecord],
    as_of: NaiveDate,
) -> Result<Vec<EnrichedRow>> {
    let summaries = summarize_portfolios(assets, as_of)?;
    let rows = merge_with_summaries(batch, &summaries);

    let unmatched = rows.iter().filter(|r| r.portfolio.is_none()).count();
    debug!(
        rows = rows.len(),
        portfolios = summaries.len(),
        unmatched,
        "Enriched batch"
    );

    Ok(rows)
}
