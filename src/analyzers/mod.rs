//! Weekly sales aggregation, portfolio enrichment and cross-week reporting.
//!
//! Each week of transactions is aggregated per `(portfolio_id, asset_type)`,
//! enriched with asset-portfolio facts, and the enriched weeks are finally
//! consolidated into a comparison pivot, a summary and the full dataset.

pub mod aggregate;
pub mod consolidate;
pub mod enrich;
pub mod pipeline;
pub mod types;
pub mod utility;

pub use aggregate::aggregate_batch;
pub use consolidate::consolidate;
pub use enrich::enrich_batch;
pub use pipeline::run_pipeline;
