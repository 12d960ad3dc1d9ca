//! Result persistence.
//!
//! One run directory per (timestamp, scenario), holding a CSV per
//! aggregated table and a `meta.json` with solver status and parameters.

use std::fs;
use std::path::{Path, PathBuf};

use crate::types::{AggregatedTable, RunOutput};
use crate::ResultsResult;

#[derive(Debug, Clone)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(RunStore { root_dir })
    }

    /// Directory a run lands in: `<timestamp>_<scenario>/`.
    pub fn run_dir(&self, output: &RunOutput) -> PathBuf {
        self.root_dir
            .join(format!("{}_{}", output.meta.created_at, output.meta.scenario))
    }

    /// Persist every table plus the metadata record; returns the run
    /// directory.
    pub fn save_run(&self, output: &RunOutput) -> ResultsResult<PathBuf> {
        let run_dir = self.run_dir(output);
        fs::create_dir_all(&run_dir)?;

        let meta_json = serde_json::to_string_pretty(&output.meta)?;
        fs::write(run_dir.join("meta.json"), meta_json)?;

        for (name, table) in &output.tables {
            write_table_csv(&run_dir.join(format!("{name}.csv")), output, table)?;
        }

        Ok(run_dir)
    }
}

/// Rows are timestamps, columns are the table's groups.
fn write_table_csv(
    path: &Path,
    output: &RunOutput,
    table: &AggregatedTable,
) -> ResultsResult<()> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec!["timestamp".to_string()];
    header.extend(table.group_names().cloned());
    writer.write_record(&header)?;

    for (step, timestamp) in output.grid.timestamps().enumerate() {
        let mut record = vec![timestamp.format("%Y-%m-%dT%H:%M:%S").to_string()];
        for (_, values) in table.groups() {
            record.push(values.get(step).copied().unwrap_or(0.0).to_string());
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
