//! Parallel batch evaluation of independent scenarios.
//!
//! Scenarios are isolated from each other: a failing scenario is logged
//! and recorded, never aborting its siblings. After the runs, the time
//! grids of all successful runs are checked against each other — jointly
//! analysed scenarios must share an identical simulation range.

use std::path::{Path, PathBuf};

use chrono::Local;
use rayon::prelude::*;
use rf_results::ensure_common_grid;
use rf_solver::FlowSolver;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::scenario_service::{run_scenario, RunRequest};
use crate::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct BatchJob {
    pub scenario_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRecord {
    pub scenario: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug)]
pub struct BatchSummary {
    pub success: usize,
    pub failure: usize,
    pub manifest_path: PathBuf,
    pub records: Vec<BatchRecord>,
}

#[derive(Serialize)]
struct BatchManifest<'a> {
    created_at: String,
    records: &'a [BatchRecord],
}

pub fn run_batch(
    jobs: &[BatchJob],
    data_dir: &Path,
    out_root: &Path,
    solver: &(dyn FlowSolver + Sync),
) -> AppResult<BatchSummary> {
    std::fs::create_dir_all(out_root)?;

    let outcomes: Vec<(BatchRecord, Option<rf_core::TimeGrid>)> = jobs
        .par_iter()
        .map(|job| {
            let request = RunRequest {
                data_dir,
                scenario_path: &job.scenario_path,
                out_root,
            };
            match run_scenario(&request, solver) {
                Ok(summary) => {
                    info!(scenario = %summary.scenario, "scenario finished");
                    (
                        BatchRecord {
                            scenario: summary.scenario,
                            status: "ok".to_string(),
                            message: None,
                            output_dir: Some(summary.output_dir),
                        },
                        Some(summary.grid),
                    )
                }
                Err(err) => {
                    error!(
                        scenario = %job.scenario_path.display(),
                        %err,
                        "scenario failed; continuing with siblings"
                    );
                    (
                        BatchRecord {
                            scenario: job.scenario_path.display().to_string(),
                            status: "error".to_string(),
                            message: Some(err.to_string()),
                            output_dir: None,
                        },
                        None,
                    )
                }
            }
        })
        .collect();

    let (records, grids): (Vec<BatchRecord>, Vec<Option<rf_core::TimeGrid>>) =
        outcomes.into_iter().unzip();
    let grids: Vec<rf_core::TimeGrid> = grids.into_iter().flatten().collect();
    let grid_refs: Vec<&rf_core::TimeGrid> = grids.iter().collect();
    ensure_common_grid(&grid_refs).map_err(AppError::Results)?;

    let success = records.iter().filter(|r| r.status == "ok").count();
    let failure = records.len() - success;

    let manifest_path = out_root.join("batch_manifest.json");
    let manifest = BatchManifest {
        created_at: Local::now().format("%Y%m%dT%H%M%S").to_string(),
        records: &records,
    };
    std::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;

    Ok(BatchSummary {
        success,
        failure,
        manifest_path,
        records,
    })
}
