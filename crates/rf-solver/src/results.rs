//! Raw solver output types.

use rf_core::Label;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    Optimal,
    Feasible,
    Infeasible,
    Unbounded,
    Failed,
}

impl SolverStatus {
    pub fn is_usable(self) -> bool {
        matches!(self, SolverStatus::Optimal | SolverStatus::Feasible)
    }
}

/// State variables reported for stateful nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateVar {
    /// Storage fill level, MWh.
    StorageLevel,
    /// DSM up-shift activation, MW.
    DsmUp,
    /// DSM down-shift activation, MW.
    DsmDown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveMeta {
    pub status: SolverStatus,
    pub objective: Option<f64>,
    pub runtime_s: f64,
    /// Backend identification for the run metadata record.
    pub solver: String,
}

/// One per-flow time series, keyed by the endpoint labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSeries {
    pub from: Label,
    pub to: Label,
    pub values: Vec<f64>,
}

/// One per-node state-variable time series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSeries {
    pub label: Label,
    pub var: StateVar,
    pub values: Vec<f64>,
}

/// The complete raw result of one solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowResults {
    pub flows: Vec<FlowSeries>,
    pub states: Vec<StateSeries>,
    pub meta: SolveMeta,
}

impl FlowResults {
    pub fn flow(&self, from: &Label, to: &Label) -> Option<&FlowSeries> {
        self.flows
            .iter()
            .find(|f| &f.from == from && &f.to == to)
    }

    pub fn state(&self, label: &Label, var: StateVar) -> Option<&StateSeries> {
        self.states
            .iter()
            .find(|s| &s.label == label && s.var == var)
    }
}
