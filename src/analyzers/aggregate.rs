use crate::analyzers::types::{AggregatedRow, Transaction};
use crate::error::{ReportError, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// Running totals for one `(portfolio_id, asset_type)` group.
#[derive(Debug)]
struct GroupAccumulator {
    mwh: f64,
    price_sum: f64,
    sales_amount: f64,
    count: usize,
    year_week: String,
}

impl GroupAccumulator {
    fn new(year_week: &str) -> Self {
        Self {
            mwh: 0.0,
            price_sum: 0.0,
            sales_amount: 0.0,
            count: 0,
            year_week: year_week.to_string(),
        }
    }

    fn add(&mut self, tx: &Transaction) {
        self.mwh += tx.mwh;
        self.price_sum += tx.price;
        // Product per row, then summed. Not mwh_total * mean_price.
        self.sales_amount += tx.sales_amount();
        self.count += 1;
    }
}

/// Aggregates one week of [`Transaction`]s into one [`AggregatedRow`] per
/// `(portfolio_id, asset_type)` pair, sorted by that key.
///
/// The price column is the plain mean of the transaction prices, and the
/// week label is taken from the first transaction of each group. Callers
/// are expected to pass rows from a single reporting week.
///
/// # Errors
///
/// Returns [`ReportError::InvalidField`] if an identifier is empty or a
/// volume/price is negative or not finite.
pub fn aggregate_batch(transactions: &[Transaction]) -> Result<Vec<AggregatedRow>> {
    let mut groups: BTreeMap<(&str, &str), GroupAccumulator> = BTreeMap::new();

    for (row, tx) in transactions.iter().enumerate() {
        validate(row, tx)?;

        groups
            .entry((tx.portfolio_id.as_str(), tx.asset_type.as_str()))
            .or_insert_with(|| GroupAccumulator::new(&tx.year_week))
            .add(tx);
    }

    debug!(
        transactions = transactions.len(),
        groups = groups.len(),
        "Aggregated batch"
    );

    Ok(groups
        .into_iter()
        .map(|((portfolio_id, asset_type), acc)| AggregatedRow {
            portfolio_id: portfolio_id.to_string(),
            asset_type: asset_type.to_string(),
            mwh: acc.mwh,
            price: acc.price_sum / acc.count as f64,
            sales_amount: acc.sales_amount,
            transaction_count: acc.count,
            year_week: acc.year_week,
        })
        .collect())
}

fn validate(row: usize, tx: &Transaction) -> Result<()> {
    if tx.portfolio_id.trim().is_empty() {
        return Err(ReportError::invalid(row, "portfolio_id", "must not be empty"));
    }
    if tx.asset_type.trim().is_empty() {
        return Err(ReportError::invalid(row, "asset_type", "must not be empty"));
    }
    if tx.year_week.trim().is_empty() {
        return Err(ReportError::invalid(row, "year_week", "must not be empty"));
    }
    if !tx.mwh.is_finite() || tx.mwh < 0.0 {
        return Err(ReportError::invalid(
            row,
            "MWh",
            format!("expected a finite value >= 0, got {}", tx.mwh),
        ));
    }
    if !tx.price.is_finite() || tx.price < 0.0 {
        return Err(ReportError::invalid(
            row,
            "price",
            format!("expected a finite value >= 0, got {}", tx.price),
        ));
    }
    Ok(())
}
