//! rf-results: result aggregation and export.
//!
//! Takes the raw solver output — per-flow and per-node time series keyed
//! by node labels — and folds it into named indicator tables via a fixed
//! catalogue of aggregation rules. A rule matches columns through the
//! shared label grammar and groups them by one extracted label field, so
//! the builder→aggregator round trip cannot drift.

pub mod aggregate;
pub mod derived;
pub mod hash;
pub mod store;
pub mod types;

pub use aggregate::{
    aggregate_flows, aggregate_states, standard_flow_rules, standard_state_rules,
    AggregationRule, Endpoint, GroupKey, LabelPattern, StateRule,
};
pub use derived::{autarky_by_group, grid_losses, net_demand_after_dsm};
pub use hash::config_digest;
pub use store::RunStore;
pub use types::{AggregatedTable, RunMeta, RunOutput};

use rf_core::TimeGrid;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("Simulation time ranges differ between jointly analysed runs")]
    GridMismatch,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Joint analysis across runs requires identical time grids; a mismatch
/// aborts the batch analysis.
pub fn ensure_common_grid(grids: &[&TimeGrid]) -> ResultsResult<()> {
    if let Some((first, rest)) = grids.split_first() {
        for grid in rest {
            if !first.same_range(grid) {
                return Err(ResultsError::GridMismatch);
            }
        }
    }
    Ok(())
}
