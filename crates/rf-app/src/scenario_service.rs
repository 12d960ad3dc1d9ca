//! Single-scenario pipeline.

use std::path::{Path, PathBuf};

use chrono::Local;
use indexmap::IndexMap;
use rf_core::TimeGrid;
use rf_network::build_network;
use rf_region::{Region, RegionTables};
use rf_results::{
    aggregate_flows, aggregate_states, autarky_by_group, config_digest, grid_losses,
    net_demand_after_dsm, standard_flow_rules, standard_state_rules, AggregatedTable, RunMeta,
    RunOutput, RunStore,
};
use rf_solver::{FlowSolver, SolverStatus};
use tracing::info;

use crate::AppResult;

#[derive(Debug, Clone)]
pub struct RunRequest<'a> {
    /// Directory holding the imported input tables (CSV).
    pub data_dir: &'a Path,
    /// Scenario configuration file (YAML).
    pub scenario_path: &'a Path,
    /// Root directory for run outputs.
    pub out_root: &'a Path,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub scenario: String,
    pub nodes: usize,
    pub flows: usize,
    pub status: SolverStatus,
    pub grid: TimeGrid,
    pub output_dir: PathBuf,
}

/// Run one scenario end to end and persist its results.
pub fn run_scenario(request: &RunRequest, solver: &dyn FlowSolver) -> AppResult<RunSummary> {
    let scenario = rf_scenario::load_yaml(request.scenario_path)?;
    let tables = RegionTables::from_dir(request.data_dir)?;
    let region = Region::build(tables, &scenario)?;

    let network = build_network(&region, &scenario)?;
    let num_nodes = network.num_nodes();
    let num_flows = network.num_flows();

    let results = solver.solve(&network, region.time_grid())?;
    info!(
        scenario = %scenario.general.name,
        status = ?results.meta.status,
        objective = ?results.meta.objective,
        "solve finished"
    );

    let mut tables = aggregate_flows(&results, &standard_flow_rules());
    tables.extend(aggregate_states(&results, &standard_state_rules()));
    let mut indicators = IndexMap::new();
    add_derived(&mut tables, &mut indicators);

    let meta = RunMeta {
        scenario: scenario.general.name.clone(),
        year: scenario.general.year,
        created_at: Local::now().format("%Y%m%dT%H%M%S").to_string(),
        solver: results.meta.clone(),
        config_digest: config_digest(&scenario),
        indicators,
    };
    let output = RunOutput {
        meta,
        grid: region.time_grid().clone(),
        tables,
    };
    let store = RunStore::new(request.out_root.to_path_buf())?;
    let output_dir = store.save_run(&output)?;

    Ok(RunSummary {
        scenario: scenario.general.name,
        nodes: num_nodes,
        flows: num_flows,
        status: results.meta.status,
        grid: region.time_grid().clone(),
        output_dir,
    })
}

/// Second-pass indicators over the aggregated tables.
fn add_derived(
    tables: &mut IndexMap<String, AggregatedTable>,
    indicators: &mut IndexMap<String, f64>,
) {
    if let (Some(demand), Some(up), Some(down)) = (
        tables.get("dsm_demand_by_municipality"),
        tables.get("dsm_up_by_municipality"),
        tables.get("dsm_down_by_municipality"),
    ) {
        let net = net_demand_after_dsm(demand, up, down);
        if !net.is_empty() {
            tables.insert("net_demand_after_dsm".to_string(), net);
        }
    }

    if let (Some(inflow), Some(outflow)) =
        (tables.get("line_inflow"), tables.get("line_outflow"))
    {
        let losses = grid_losses(inflow, outflow);
        if !losses.is_empty() {
            indicators.insert("grid_losses_total_mwh".to_string(), losses.iter().sum());
            let mut table = AggregatedTable::new();
            table.add_into("total", &losses);
            tables.insert("grid_losses".to_string(), table);
        }
    }

    if let (Some(generation), Some(demand)) = (
        tables.get("generation_by_municipality"),
        tables.get("demand_by_municipality"),
    ) {
        for (group, ratio) in autarky_by_group(generation, demand) {
            indicators.insert(format!("autarky/{group}"), ratio);
        }
    }
}
