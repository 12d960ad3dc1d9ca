//! External solver backend over a child process.
//!
//! The network description and time grid are written to the child's
//! stdin as one JSON document; the child answers with a [`FlowResults`]
//! JSON document on stdout. A non-zero exit or unparseable output is a
//! backend failure; an `infeasible`/`unbounded` status in an otherwise
//! well-formed answer is propagated as the corresponding error.

use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Instant;

use rf_core::TimeGrid;
use rf_network::EnergyNetwork;
use serde::Serialize;
use tracing::{debug, warn};

use crate::results::{FlowResults, SolverStatus};
use crate::{FlowSolver, SolverError, SolverResult};

#[derive(Debug, Clone)]
pub struct SubprocessSolver {
    program: String,
    args: Vec<String>,
}

#[derive(Serialize)]
struct SolveRequest<'a> {
    network: &'a EnergyNetwork,
    grid: &'a TimeGrid,
}

impl SubprocessSolver {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        SubprocessSolver {
            program: program.into(),
            args,
        }
    }
}

impl FlowSolver for SubprocessSolver {
    fn solve(&self, network: &EnergyNetwork, grid: &TimeGrid) -> SolverResult<FlowResults> {
        let started = Instant::now();
        debug!(program = %self.program, nodes = network.num_nodes(), "dispatching solve");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SolverError::Backend {
                what: format!("failed to spawn {}: {e}", self.program),
            })?;

        let request = serde_json::to_vec(&SolveRequest { network, grid })?;
        child
            .stdin
            .as_mut()
            .ok_or_else(|| SolverError::Backend {
                what: "child stdin unavailable".to_string(),
            })?
            .write_all(&request)?;

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SolverError::Backend {
                what: format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    stderr.trim()
                ),
            });
        }

        let mut results: FlowResults =
            serde_json::from_slice(&output.stdout).map_err(|e| SolverError::MalformedOutput {
                what: e.to_string(),
            })?;

        match results.meta.status {
            SolverStatus::Infeasible => return Err(SolverError::Infeasible),
            SolverStatus::Unbounded => return Err(SolverError::Unbounded),
            SolverStatus::Failed => {
                return Err(SolverError::Backend {
                    what: "solver reported failure".to_string(),
                })
            }
            SolverStatus::Optimal | SolverStatus::Feasible => {}
        }

        let expected = grid.len();
        for len in results.flows.iter().map(|f| f.values.len()).chain(
            results.states.iter().map(|s| s.values.len()),
        ) {
            if len != expected {
                return Err(SolverError::MalformedOutput {
                    what: format!("series of length {len}, grid has {expected} steps"),
                });
            }
        }

        if results.meta.runtime_s == 0.0 {
            results.meta.runtime_s = started.elapsed().as_secs_f64();
        }
        if results.flows.is_empty() {
            warn!("solver returned no flow series");
        }
        Ok(results)
    }
}
