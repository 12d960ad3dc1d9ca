//! Aggregated result types.

use indexmap::IndexMap;
use rf_core::TimeGrid;
use rf_solver::SolveMeta;
use serde::{Deserialize, Serialize};

/// One named output table: a time series per extracted group key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedTable {
    groups: IndexMap<String, Vec<f64>>,
}

impl AggregatedTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum a column into a group, creating the group on first sight.
    pub fn add_into(&mut self, group: &str, values: &[f64]) {
        let sums = self.groups.entry(group.to_string()).or_default();
        if sums.is_empty() {
            sums.extend_from_slice(values);
        } else {
            for (sum, value) in sums.iter_mut().zip(values) {
                *sum += value;
            }
        }
    }

    pub fn group(&self, key: &str) -> Option<&[f64]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&String, &[f64])> {
        self.groups.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn group_names(&self) -> impl Iterator<Item = &String> {
        self.groups.keys()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Sum over time per group.
    pub fn totals(&self) -> IndexMap<String, f64> {
        self.groups
            .iter()
            .map(|(key, values)| (key.clone(), values.iter().sum()))
            .collect()
    }
}

/// Run metadata persisted next to the result tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub scenario: String,
    pub year: u32,
    /// Local wall-clock time the run directory was created.
    pub created_at: String,
    pub solver: SolveMeta,
    /// Content digest of the scenario configuration.
    pub config_digest: String,
    /// Scalar indicators (autarky ratios, total losses) that have no
    /// time dimension.
    #[serde(default)]
    pub indicators: IndexMap<String, f64>,
}

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub meta: RunMeta,
    pub grid: TimeGrid,
    pub tables: IndexMap<String, AggregatedTable>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_into_sums_existing_group() {
        let mut table = AggregatedTable::new();
        table.add_into("wind", &[1.0, 2.0]);
        table.add_into("wind", &[0.5, 0.5]);
        table.add_into("pv", &[3.0, 0.0]);
        assert_eq!(table.group("wind").unwrap(), &[1.5, 2.5]);
        assert_eq!(table.totals()["wind"], 4.0);
        assert_eq!(table.totals()["pv"], 3.0);
    }
}
