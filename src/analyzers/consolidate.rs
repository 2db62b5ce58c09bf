//! Cross-week consolidation of enriched weekly tables.

use crate::analyzers::types::{
    ComparisonRow, ComparisonTable, ConsolidatedReport, EnrichedRow, SummaryRow, WeekMetrics,
};
use crate::analyzers::utility::{mean, mean_present, ratio};
use crate::error::{ReportError, Result};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

type PairKey = (String, String);

/// Rejects weekly mappings that name the same week twice.
pub(crate) fn ensure_unique_weeks<T>(weekly: &[(String, T)]) -> Result<()> {
    let mut seen = HashSet::new();
    for (week, _) in weekly {
        if !seen.insert(week.as_str()) {
            return Err(ReportError::DuplicateWeek(week.clone()));
        }
    }
    Ok(())
}

#[derive(Default)]
struct CellAccumulator {
    mwh: f64,
    price: f64,
    sales_amount: f64,
    count: usize,
    revenue_per_mwh: Vec<Option<f64>>,
}

impl CellAccumulator {
    fn add(&mut self, row: &EnrichedRow) {
        self.mwh += row.sales.mwh;
        self.price += row.sales.price;
        self.sales_amount += row.sales.sales_amount;
        self.count += 1;
        self.revenue_per_mwh.push(row.revenue_per_mwh);
    }

    fn finish(&self) -> WeekMetrics {
        let n = self.count as f64;
        WeekMetrics {
            mwh: self.mwh / n,
            price: self.price / n,
            revenue_per_mwh: mean_present(self.revenue_per_mwh.iter().copied()),
            sales_amount: self.sales_amount / n,
        }
    }
}

/// Pivots enriched rows into one row per `(portfolio_id, asset_type)` and
/// one column group per `year_week`.
///
/// Rows and week columns are both sorted by key. A pair absent from a week
/// gets a `None` cell; if a pair appears more than once in the same week
/// its values are averaged.
pub fn build_comparison(all_data: &[EnrichedRow]) -> ComparisonTable {
    let weeks: Vec<String> = all_data
        .iter()
        .map(|row| row.sales.year_week.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut pivot: BTreeMap<PairKey, BTreeMap<&str, CellAccumulator>> = BTreeMap::new();
    for row in all_data {
        pivot
            .entry((row.sales.portfolio_id.clone(), row.sales.asset_type.clone()))
            .or_default()
            .entry(row.sales.year_week.as_str())
            .or_default()
            .add(row);
    }

    let rows = pivot
        .into_iter()
        .map(|((portfolio_id, asset_type), cells)| ComparisonRow {
            portfolio_id,
            asset_type,
            cells: weeks
                .iter()
                .map(|week| cells.get(week.as_str()).map(CellAccumulator::finish))
                .collect(),
        })
        .collect();

    ComparisonTable { weeks, rows }
}

#[derive(Default)]
struct SummaryAccumulator {
    mwh: f64,
    sales_amount: f64,
    transaction_count: usize,
    prices: Vec<f64>,
    asset_count: Option<usize>,
    primary_geography: Option<String>,
    portfolio_age_years: Option<f64>,
}

impl SummaryAccumulator {
    fn add(&mut self, row: &EnrichedRow) {
        self.mwh += row.sales.mwh;
        self.sales_amount += row.sales.sales_amount;
        self.transaction_count += row.sales.transaction_count;
        self.prices.push(row.sales.price);

        // Portfolio constants: keep the first value that is present.
        if self.asset_count.is_none() {
            self.asset_count = row.asset_count();
        }
        if self.primary_geography.is_none() {
            self.primary_geography = row.primary_geography().map(str::to_string);
        }
        if self.portfolio_age_years.is_none() {
            self.portfolio_age_years = row.portfolio_age_years();
        }
    }
}

/// Totals each `(portfolio_id, asset_type)` pair across all weeks.
///
/// `week_count` is the number of weeks in the run, which divides the total
/// revenue into `avg_weekly_revenue` even for pairs that only sold in some
/// of those weeks.
pub fn build_summary(all_data: &[EnrichedRow], week_count: usize) -> Vec<SummaryRow> {
    let mut groups: BTreeMap<PairKey, SummaryAccumulator> = BTreeMap::new();

    for row in all_data {
        groups
            .entry((row.sales.portfolio_id.clone(), row.sales.asset_type.clone()))
            .or_default()
            .add(row);
    }

    groups
        .into_iter()
        .map(|((portfolio_id, asset_type), acc)| SummaryRow {
            portfolio_id,
            asset_type,
            mwh: acc.mwh,
            sales_amount: acc.sales_amount,
            transaction_count: acc.transaction_count,
            price: mean(&acc.prices).unwrap_or_default(),
            asset_count: acc.asset_count,
            primary_geography: acc.primary_geography,
            portfolio_age_years: acc.portfolio_age_years,
            avg_weekly_revenue: ratio(acc.sales_amount, Some(week_count as f64)),
            avg_revenue_per_mwh: ratio(acc.sales_amount, Some(acc.mwh)),
        })
        .collect()
}

/// Builds the comparison, summary and full dataset from enriched weeks.
///
/// `all_data` concatenates the weekly tables in the order given.
///
/// # Errors
///
/// Returns [`ReportError::DuplicateWeek`] if a week label repeats.
pub fn consolidate(weekly: &[(String, Vec<EnrichedRow>)]) -> Result<ConsolidatedReport> {
    ensure_unique_weeks(weekly)?;

    let all_data: Vec<EnrichedRow> = weekly
        .iter()
        .flat_map(|(_, rows)| rows.iter().cloned())
        .collect();

    let comparison = build_comparison(&all_data);
    let summary = build_summary(&all_data, weekly.len());

    debug!(
        weeks = weekly.len(),
        rows = all_data.len(),
        pairs = summary.len(),
        "Consolidated report"
    );

    Ok(ConsolidatedReport {
        comparison,
        summary,
        all_data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::types::{AggregatedRow, PortfolioSummary};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn portfolio(id: &str, assets: usize) -> PortfolioSummary {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        PortfolioSummary {
            portfolio_id: id.to_string(),
            asset_count: assets,
            primary_geography: Some("North".to_string()),
            iso_regions: vec!["PJM".to_string()],
            timezones: vec!["US/Eastern".to_string()],
            oldest_asset_date: date,
            newest_asset_date: date,
            portfolio_age_years: 3.0,
        }
    }

    fn row(p: &str, t: &str, week: &str, mwh: f64, price: f64, sales: f64, count: usize) -> EnrichedRow {
        let summary = if p == "orphan" { None } else { Some(portfolio(p, 2)) };
        let assets = summary.as_ref().map(|s| s.asset_count as f64);
        EnrichedRow {
            sales: AggregatedRow {
                portfolio_id: p.to_string(),
                asset_type: t.to_string(),
                mwh,
                price,
                sales_amount: sales,
                transaction_count: count,
                year_week: week.to_string(),
            },
            portfolio: summary,
            mwh_per_asset: ratio(mwh, assets),
            revenue_per_asset: ratio(sales, assets),
            revenue_per_mwh: ratio(sales, Some(mwh)),
        }
    }

    fn two_weeks() -> Vec<(String, Vec<EnrichedRow>)> {
        vec![
            (
                "2023-01".to_string(),
                vec![
                    row("A001", "Wind", "2023-01", 100.0, 40.0, 4200.0, 3),
                    row("B002", "Solar", "2023-01", 50.0, 60.0, 3100.0, 2),
                ],
            ),
            (
                "2023-02".to_string(),
                vec![row("A001", "Wind", "2023-02", 300.0, 50.0, 14800.0, 4)],
            ),
        ]
    }

    #[test]
    fn test_all_data_concatenates_in_order() {
        let report = consolidate(&two_weeks()).unwrap();
        let weeks: Vec<_> = report
            .all_data
            .iter()
            .map(|r| (r.sales.portfolio_id.as_str(), r.sales.year_week.as_str()))
            .collect();
        assert_eq!(
            weeks,
            vec![("A001", "2023-01"), ("B002", "2023-01"), ("A001", "2023-02")]
        );
    }

    #[test]
    fn test_summary_sums_across_weeks() {
        let report = consolidate(&two_weeks()).unwrap();
        assert_eq!(report.summary.len(), 2);

        let wind = &report.summary[0];
        assert_eq!(wind.portfolio_id, "A001");
        assert_eq!(wind.mwh, 400.0);
        assert_eq!(wind.sales_amount, 19000.0);
        assert_eq!(wind.transaction_count, 7);
        assert_eq!(wind.price, 45.0);
        assert_eq!(wind.avg_weekly_revenue, Some(9500.0));
        assert_eq!(wind.avg_revenue_per_mwh, Some(47.5));
        assert_eq!(wind.asset_count, Some(2));
        assert_eq!(wind.primary_geography.as_deref(), Some("North"));
        assert_eq!(wind.portfolio_age_years, Some(3.0));

        // Divided by the number of weeks in the run, not weeks with sales.
        let solar = &report.summary[1];
        assert_eq!(solar.avg_weekly_revenue, Some(1550.0));
    }

    #[test]
    fn test_comparison_leaves_missing_weeks_empty() {
        let report = consolidate(&two_weeks()).unwrap();
        let comparison = &report.comparison;

        assert_eq!(comparison.weeks, vec!["2023-01".to_string(), "2023-02".to_string()]);
        assert_eq!(comparison.rows.len(), 2);

        let solar = &comparison.rows[1];
        assert_eq!(solar.portfolio_id, "B002");
        assert!(solar.cells[0].is_some());
        assert!(solar.cells[1].is_none());

        let cell = comparison.cell("A001", "Wind", "2023-02").unwrap();
        assert_eq!(cell.mwh, 300.0);
        assert_eq!(cell.sales_amount, 14800.0);
        assert_eq!(cell.price, 50.0);
        assert_eq!(cell.revenue_per_mwh, Some(14800.0 / 300.0));
    }

    #[test]
    fn test_single_week_summary_matches_week() {
        let weekly = vec![two_weeks().remove(0)];
        let report = consolidate(&weekly).unwrap();

        assert_eq!(report.comparison.weeks.len(), 1);
        let wind = &report.summary[0];
        assert_eq!(wind.mwh, 100.0);
        assert_eq!(wind.sales_amount, 4200.0);
        assert_eq!(wind.transaction_count, 3);
        assert_eq!(wind.price, 40.0);
        assert_eq!(wind.avg_weekly_revenue, Some(4200.0));
    }

    #[test]
    fn test_orphan_portfolio_keeps_missing_fields() {
        let weekly = vec![(
            "2023-01".to_string(),
            vec![row("orphan", "Gas", "2023-01", 0.0, 30.0, 0.0, 1)],
        )];
        let report = consolidate(&weekly).unwrap();

        let summary = &report.summary[0];
        assert_eq!(summary.asset_count, None);
        assert_eq!(summary.primary_geography, None);
        assert_eq!(summary.avg_revenue_per_mwh, None);

        let cell = report.comparison.cell("orphan", "Gas", "2023-01").unwrap();
        assert_eq!(cell.revenue_per_mwh, None);
    }

    #[test]
    fn test_comparison_weeks_sorted_by_label() {
        let weekly = vec![
            (
                "late".to_string(),
                vec![row("A001", "Wind", "2023-03", 10.0, 40.0, 400.0, 1)],
            ),
            (
                "early".to_string(),
                vec![row("A001", "Wind", "2023-01", 20.0, 30.0, 600.0, 1)],
            ),
        ];
        let report = consolidate(&weekly).unwrap();

        assert_eq!(report.comparison.weeks, vec!["2023-01".to_string(), "2023-03".to_string()]);
        let cells = &report.comparison.rows[0].cells;
        assert_eq!(cells[0].as_ref().unwrap().mwh, 20.0);
        assert_eq!(cells[1].as_ref().unwrap().mwh, 10.0);
        // all_data still follows the mapping order.
        assert_eq!(report.all_data[0].sales.year_week, "2023-03");
    }

    #[test]
    fn test_repeated_week_cell_averages_present_ratios() {
        let weekly = vec![
            (
                "batch-a".to_string(),
                vec![row("A001", "Wind", "2023-01", 100.0, 40.0, 5000.0, 2)],
            ),
            (
                "batch-b".to_string(),
                vec![row("A001", "Wind", "2023-01", 0.0, 20.0, 0.0, 1)],
            ),
        ];
        let report = consolidate(&weekly).unwrap();

        assert_eq!(report.comparison.weeks.len(), 1);
        let cell = report.comparison.cell("A001", "Wind", "2023-01").unwrap();
        assert_eq!(cell.mwh, 50.0);
        assert_eq!(cell.price, 30.0);
        // The zero-MWh row has no ratio and is left out of the mean.
        assert_eq!(cell.revenue_per_mwh, Some(50.0));
    }

    #[test]
    fn test_duplicate_week_rejected() {
        let mut weekly = two_weeks();
        weekly[1].0 = "2023-01".to_string();
        assert!(matches!(
            consolidate(&weekly),
            Err(ReportError::DuplicateWeek(w)) if w == "2023-01"
        ));
    }

    #[test]
    fn test_empty_mapping_yields_empty_report() {
        let report = consolidate(&[]).unwrap();
        assert_eq!(report, ConsolidatedReport::default());
    }
}
