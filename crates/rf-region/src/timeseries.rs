//! Municipality-columned time-series tables.

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use rf_core::{Ags, TimeGrid};
use serde::{Deserialize, Serialize};

use crate::{RegionError, RegionResult};

/// A table indexed by timestamp with one value column per municipality.
///
/// Municipalities absent from the raw input are absent as columns, never
/// zero-filled; callers that need "zero contribution" semantics get them
/// from [`TsTable::column_or_zero`] explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TsTable {
    index: Vec<NaiveDateTime>,
    columns: IndexMap<Ags, Vec<f64>>,
}

impl TsTable {
    pub fn new(index: Vec<NaiveDateTime>) -> Self {
        TsTable {
            index,
            columns: IndexMap::new(),
        }
    }

    /// Insert a column; its length must match the index.
    pub fn insert_column(&mut self, ags: Ags, values: Vec<f64>) -> RegionResult<()> {
        if values.len() != self.index.len() {
            return Err(RegionError::Misaligned {
                what: format!(
                    "column {} has {} rows, index has {}",
                    ags,
                    values.len(),
                    self.index.len()
                ),
            });
        }
        self.columns.insert(ags, values);
        Ok(())
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn municipalities(&self) -> impl Iterator<Item = &Ags> {
        self.columns.keys()
    }

    pub fn has_column(&self, ags: &Ags) -> bool {
        self.columns.contains_key(ags)
    }

    pub fn column(&self, ags: &Ags) -> Option<&[f64]> {
        self.columns.get(ags).map(Vec::as_slice)
    }

    /// Column values, or zeros for a municipality without a column.
    pub fn column_or_zero(&self, ags: &Ags) -> Vec<f64> {
        match self.columns.get(ags) {
            Some(values) => values.clone(),
            None => vec![0.0; self.index.len()],
        }
    }

    /// Sum of one municipality's column over the whole range.
    pub fn column_sum(&self, ags: &Ags) -> f64 {
        self.columns
            .get(ags)
            .map(|values| values.iter().sum())
            .unwrap_or(0.0)
    }

    /// Per-municipality sums over the whole range.
    pub fn column_sums(&self) -> IndexMap<Ags, f64> {
        self.columns
            .iter()
            .map(|(ags, values)| (ags.clone(), values.iter().sum()))
            .collect()
    }

    /// Row-wise sum across all columns.
    pub fn row_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.index.len()];
        for values in self.columns.values() {
            for (sum, value) in sums.iter_mut().zip(values) {
                *sum += value;
            }
        }
        sums
    }

    /// Largest simultaneous value across all columns.
    pub fn max_row_sum(&self) -> f64 {
        self.row_sums().into_iter().fold(0.0, f64::max)
    }

    /// Pointwise scale of one column.
    pub fn scaled_column(&self, ags: &Ags, factor: f64) -> Option<Vec<f64>> {
        self.columns
            .get(ags)
            .map(|values| values.iter().map(|v| v * factor).collect())
    }

    /// Check that the index matches the simulation grid exactly.
    pub fn check_alignment(&self, grid: &TimeGrid, what: &str) -> RegionResult<()> {
        if self.index.len() != grid.len() {
            return Err(RegionError::Misaligned {
                what: format!(
                    "{what}: {} rows, grid has {} steps",
                    self.index.len(),
                    grid.len()
                ),
            });
        }
        for (i, (have, want)) in self.index.iter().zip(grid.timestamps()).enumerate() {
            if *have != want {
                return Err(RegionError::Misaligned {
                    what: format!("{what}: timestamp {have} at step {i}, expected {want}"),
                });
            }
        }
        Ok(())
    }
}

/// Sub-series of the demand-side-management input data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DsmSeries {
    /// Baseline household demand.
    PSet,
    /// Up-shift capacity, currently installed appliances.
    PIncCurrent,
    /// Up-shift capacity, maximum potential.
    PIncMax,
    /// Down-shift capacity, currently installed appliances.
    PDecCurrent,
    /// Down-shift capacity, maximum potential.
    PDecMax,
}

impl DsmSeries {
    pub const ALL: [DsmSeries; 5] = [
        DsmSeries::PSet,
        DsmSeries::PIncCurrent,
        DsmSeries::PIncMax,
        DsmSeries::PDecCurrent,
        DsmSeries::PDecMax,
    ];

    pub fn key(self) -> &'static str {
        match self {
            DsmSeries::PSet => "p_set",
            DsmSeries::PIncCurrent => "p_inc_current",
            DsmSeries::PIncMax => "p_inc_max",
            DsmSeries::PDecCurrent => "p_dec_current",
            DsmSeries::PDecMax => "p_dec_max",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.key() == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn index(n: usize) -> Vec<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2035, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..n).map(|i| start + chrono::Duration::hours(i as i64)).collect()
    }

    fn ags(code: &str) -> Ags {
        Ags::new(code).unwrap()
    }

    #[test]
    fn rejects_misaligned_column() {
        let mut table = TsTable::new(index(4));
        assert!(table.insert_column(ags("1"), vec![1.0; 3]).is_err());
        assert!(table.insert_column(ags("1"), vec![1.0; 4]).is_ok());
    }

    #[test]
    fn missing_column_is_absent_not_zero() {
        let mut table = TsTable::new(index(2));
        table.insert_column(ags("1"), vec![1.0, 2.0]).unwrap();
        assert!(table.column(&ags("2")).is_none());
        assert!(!table.has_column(&ags("2")));
        assert_eq!(table.column_or_zero(&ags("2")), vec![0.0, 0.0]);
    }

    #[test]
    fn max_row_sum_is_simultaneous_peak() {
        let mut table = TsTable::new(index(3));
        table.insert_column(ags("1"), vec![1.0, 5.0, 2.0]).unwrap();
        table.insert_column(ags("2"), vec![4.0, 1.0, 2.0]).unwrap();
        // peaks are not aligned; the simultaneous maximum is 6, not 9
        assert_eq!(table.max_row_sum(), 6.0);
    }

    #[test]
    fn alignment_check_catches_shifted_index() {
        let grid = TimeGrid::new(index(3)[0], 1, 3).unwrap();
        let table = TsTable::new(index(3));
        table.check_alignment(&grid, "demand").unwrap();

        let shifted = TsTable::new(index(4)[1..].to_vec());
        assert!(shifted.check_alignment(&grid, "demand").is_err());
    }
}
