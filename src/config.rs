//! Run configuration.
//!
//! Stored as a plain JSON object on disk; every key is optional:
//! ```json
//! {
//!   "as_of": "2025-06-30",
//!   "output_dir": "reports",
//!   "write_json": true
//! }
//! ```
//! `REPORT_AS_OF=YYYY-MM-DD` in the environment (or `.env`) overrides `as_of`.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const AS_OF_ENV: &str = "REPORT_AS_OF";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Reference date for portfolio age. `None` means today (UTC), read once.
    pub as_of: Option<NaiveDate>,
    pub output_dir: String,
    pub write_json: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            as_of: None,
            output_dir: "reports".to_string(),
            write_json: false,
        }
    }
}

impl ReportConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{path}'"))?;
        let config: ReportConfig = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config '{path}'"))?;
        Ok(config)
    }

    /// Applies `REPORT_AS_OF` from the environment, if set.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(raw) = std::env::var(AS_OF_ENV) {
            self.as_of = Some(parse_date(&raw).with_context(|| format!("invalid {AS_OF_ENV}"))?);
        }
        Ok(self)
    }

    /// The reference date for this run.
    pub fn resolve_as_of(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Utc::now().date_naive())
    }
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("expected YYYY-MM-DD, got '{raw}'"))
}
