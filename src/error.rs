//! Error types surfaced by the reporting pipeline.

use thiserror::Error;

/// Structured failures raised while loading, aggregating or writing report data.
///
/// Undefined arithmetic (zero assets, zero MWh) and portfolios without asset
/// records are not errors; those surface as `None` fields on the rows.
#[derive(Error, Debug)]
pub enum ReportError {
    /// A required field is empty or holds a value outside its domain.
    #[error("invalid field `{field}` at row {row}: {reason}")]
    InvalidField {
        row: usize,
        field: &'static str,
        reason: String,
    },

    /// The same week label was supplied twice in a weekly mapping.
    #[error("duplicate week label: {0}")]
    DuplicateWeek(String),

    /// A stage failed while processing one week; the run is aborted.
    #[error("week {week} failed")]
    Week {
        week: String,
        #[source]
        source: Box<ReportError>,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ReportError {
    pub(crate) fn invalid(row: usize, field: &'static str, reason: impl Into<String>) -> Self {
        ReportError::InvalidField {
            row,
            field,
            reason: reason.into(),
        }
    }

    /// Wraps a stage failure with the week label it occurred in.
    pub(crate) fn in_week(self, week: &str) -> Self {
        ReportError::Week {
            week: week.to_string(),
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
