//! rf-app: scenario pipeline orchestration.
//!
//! Wires the crates together: load scenario → build region → build
//! network → solve → aggregate → export, plus a batch runner evaluating
//! independent scenarios in parallel with per-scenario failure isolation.

pub mod batch;
pub mod scenario_service;

pub use batch::{run_batch, BatchJob, BatchRecord, BatchSummary};
pub use scenario_service::{run_scenario, RunRequest, RunSummary};

pub type AppResult<T> = Result<T, AppError>;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Scenario error: {0}")]
    Scenario(#[from] rf_scenario::ScenarioError),

    #[error("Region error: {0}")]
    Region(#[from] rf_region::RegionError),

    #[error("Network error: {0}")]
    Network(#[from] rf_network::NetworkError),

    #[error("Solver error: {0}")]
    Solver(#[from] rf_solver::SolverError),

    #[error("Results error: {0}")]
    Results(#[from] rf_results::ResultsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
