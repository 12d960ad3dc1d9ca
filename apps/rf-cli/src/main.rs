use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rf_app::{run_batch, run_scenario, BatchJob, RunRequest};
use rf_network::build_network;
use rf_region::{Region, RegionTables};
use rf_results::{
    aggregate_flows, aggregate_states, standard_flow_rules, standard_state_rules,
};
use rf_solver::SubprocessSolver;

#[derive(Parser)]
#[command(name = "rf-cli")]
#[command(about = "RegionFlow CLI - regional energy-system scenario modelling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a scenario file
    Validate {
        /// Path to the scenario YAML file
        scenario: PathBuf,
    },
    /// Build the flow network and write it as JSON for an external solver
    Build {
        /// Path to the scenario YAML file
        scenario: PathBuf,
        /// Directory with the imported input tables
        #[arg(long)]
        data_dir: PathBuf,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run the full pipeline: build, solve, aggregate, export
    Run {
        /// Path to the scenario YAML file
        scenario: PathBuf,
        /// Directory with the imported input tables
        #[arg(long)]
        data_dir: PathBuf,
        /// Root directory for run outputs
        #[arg(long)]
        out_root: PathBuf,
        /// External solver executable
        #[arg(long)]
        solver: String,
        /// Extra arguments passed to the solver
        #[arg(long)]
        solver_arg: Vec<String>,
    },
    /// Run several scenarios in parallel
    Batch {
        /// Scenario YAML files
        scenarios: Vec<PathBuf>,
        /// Directory with the imported input tables
        #[arg(long)]
        data_dir: PathBuf,
        /// Root directory for run outputs
        #[arg(long)]
        out_root: PathBuf,
        /// External solver executable
        #[arg(long)]
        solver: String,
        /// Extra arguments passed to the solver
        #[arg(long)]
        solver_arg: Vec<String>,
    },
    /// Aggregate existing raw solver results into indicator tables
    Aggregate {
        /// Raw results JSON as produced by the solver
        results: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Validate { scenario } => {
            let loaded = rf_scenario::load_yaml(&scenario)?;
            println!(
                "OK: scenario '{}' for year {} ({} steps of {} h)",
                loaded.general.name,
                loaded.general.year,
                loaded.general.num_steps,
                loaded.general.step_hours
            );
        }
        Commands::Build {
            scenario,
            data_dir,
            output,
        } => {
            let scenario = rf_scenario::load_yaml(&scenario)?;
            let tables = RegionTables::from_dir(&data_dir)?;
            let region = Region::build(tables, &scenario)?;
            let network = build_network(&region, &scenario)?;
            let json = serde_json::to_string_pretty(&network)?;
            match output {
                Some(path) => std::fs::write(path, json)?,
                None => println!("{json}"),
            }
            eprintln!(
                "Built network: {} nodes, {} flows",
                network.num_nodes(),
                network.num_flows()
            );
        }
        Commands::Run {
            scenario,
            data_dir,
            out_root,
            solver,
            solver_arg,
        } => {
            let solver = SubprocessSolver::new(solver, solver_arg);
            let request = RunRequest {
                data_dir: &data_dir,
                scenario_path: &scenario,
                out_root: &out_root,
            };
            let summary = run_scenario(&request, &solver)?;
            println!(
                "Scenario '{}': {:?}, {} nodes / {} flows, results in {}",
                summary.scenario,
                summary.status,
                summary.nodes,
                summary.flows,
                summary.output_dir.display()
            );
        }
        Commands::Batch {
            scenarios,
            data_dir,
            out_root,
            solver,
            solver_arg,
        } => {
            let solver = SubprocessSolver::new(solver, solver_arg);
            let jobs: Vec<BatchJob> = scenarios
                .into_iter()
                .map(|scenario_path| BatchJob { scenario_path })
                .collect();
            let summary = run_batch(&jobs, &data_dir, &out_root, &solver)?;
            println!(
                "Batch finished: {} ok, {} failed, manifest at {}",
                summary.success,
                summary.failure,
                summary.manifest_path.display()
            );
            for record in &summary.records {
                match &record.message {
                    Some(message) => println!("  {} - {}: {}", record.scenario, record.status, message),
                    None => println!("  {} - {}", record.scenario, record.status),
                }
            }
        }
        Commands::Aggregate { results } => {
            let raw: rf_solver::FlowResults =
                serde_json::from_str(&std::fs::read_to_string(&results)?)?;
            let flow_tables = aggregate_flows(&raw, &standard_flow_rules());
            let state_tables = aggregate_states(&raw, &standard_state_rules());
            for (name, table) in flow_tables.iter().chain(state_tables.iter()) {
                println!("{name}:");
                for (group, total) in table.totals() {
                    println!("  {group}: {total:.3}");
                }
            }
        }
    }
    Ok(())
}
