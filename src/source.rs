//! CSV sources for transactions and assets, and weekly bucketing.
//!
//! Transaction CSVs carry `date,portfolio_id,asset_type,MWh,price` and an
//! optional `year_week`. Asset CSVs carry
//! `portfolio_id,asset_id,geography,ISO,operational_date,timezone`.

use crate::analyzers::types::{AssetRecord, Transaction};
use crate::error::Result;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// A transaction row as read from a source, before week assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub date: NaiveDateTime,
    pub portfolio_id: String,
    pub asset_type: String,
    #[serde(rename = "MWh")]
    pub mwh: f64,
    pub price: f64,
    #[serde(default)]
    pub year_week: Option<String>,
}

impl TransactionRecord {
    /// Assigns the record to its reporting week, deriving the label from
    /// `date` when the source did not supply one.
    pub fn into_transaction(self) -> Transaction {
        let year_week = match self.year_week {
            Some(w) if !w.trim().is_empty() => w,
            _ => week_label(self.date),
        };
        Transaction {
            date: self.date,
            portfolio_id: self.portfolio_id,
            asset_type: self.asset_type,
            mwh: self.mwh,
            price: self.price,
            year_week,
        }
    }
}

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognized timestamp `{raw}`")))
}

/// Reporting-week label: year and Sunday-first week number, e.g. `2023-01`.
pub fn week_label(date: NaiveDateTime) -> String {
    date.format("%Y-%U").to_string()
}

/// Reads transaction rows from any CSV reader.
///
/// # Errors
///
/// Returns an error if a required column is missing or a value does not parse.
pub fn read_transactions<R: Read>(reader: R) -> Result<Vec<TransactionRecord>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let record: TransactionRecord = result?;
        rows.push(record);
    }
    Ok(rows)
}

/// Reads asset rows from any CSV reader.
pub fn read_assets<R: Read>(reader: R) -> Result<Vec<AssetRecord>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let record: AssetRecord = result?;
        rows.push(record);
    }
    Ok(rows)
}

/// Loads transactions from a CSV file.
pub fn load_transactions(path: impl AsRef<Path>) -> Result<Vec<TransactionRecord>> {
    let path = path.as_ref();
    let rows = read_transactions(File::open(path)?)?;
    info!(path = %path.display(), rows = rows.len(), "Loaded transactions");
    Ok(rows)
}

/// Loads asset records from a CSV file.
pub fn load_assets(path: impl AsRef<Path>) -> Result<Vec<AssetRecord>> {
    let path = path.as_ref();
    let rows = read_assets(File::open(path)?)?;
    info!(path = %path.display(), rows = rows.len(), "Loaded assets");
    Ok(rows)
}

/// Splits transactions into weekly batches.
///
/// Weeks appear in the order they are first seen, and rows keep their
/// relative order inside each week.
pub fn bucket_by_week(
    records: impl IntoIterator<Item = TransactionRecord>,
) -> Vec<(String, Vec<Transaction>)> {
    let mut weeks: Vec<(String, Vec<Transaction>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let tx = record.into_transaction();
        let idx = match index.get(&tx.year_week) {
            Some(&idx) => idx,
            None => {
                debug!(week = %tx.year_week, "Fetching data for week");
                index.insert(tx.year_week.clone(), weeks.len());
                weeks.push((tx.year_week.clone(), Vec::new()));
                weeks.len() - 1
            }
        };
        weeks[idx].1.push(tx);
    }

    weeks
}
