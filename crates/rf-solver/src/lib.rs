//! rf-solver: the boundary to the external optimization solver.
//!
//! The solver is a collaborator, not part of this workspace: it receives
//! the node/flow description with bounds, costs and conversion factors
//! plus the time grid, and returns per-flow and per-node time series or a
//! failure status. This crate defines that contract and one backend that
//! speaks it over a child process.
//!
//! Infeasible/unbounded outcomes are propagated as-is; no relaxation or
//! retry happens at this layer, and there is no cancellation contract —
//! time-bounding a solve is the caller's job (process-level timeout).

pub mod results;
pub mod subprocess;

pub use results::{FlowResults, FlowSeries, SolveMeta, SolverStatus, StateSeries, StateVar};
pub use subprocess::SubprocessSolver;

use rf_core::TimeGrid;
use rf_network::EnergyNetwork;

pub type SolverResult<T> = Result<T, SolverError>;

#[derive(thiserror::Error, Debug)]
pub enum SolverError {
    #[error("Problem is infeasible")]
    Infeasible,

    #[error("Problem is unbounded")]
    Unbounded,

    #[error("Solver backend failed: {what}")]
    Backend { what: String },

    #[error("Malformed solver output: {what}")]
    MalformedOutput { what: String },

    #[error("I/O error talking to solver: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error at solver boundary: {0}")]
    Json(#[from] serde_json::Error),
}

/// A synchronous flow-assignment solver.
pub trait FlowSolver {
    fn solve(&self, network: &EnergyNetwork, grid: &TimeGrid) -> SolverResult<FlowResults>;
}
