//! Simulation time grid.
//!
//! All prepared time series and every profile handed to the solver are
//! aligned to one `TimeGrid`. Scenario runs that are analysed jointly must
//! share an identical grid; the batch layer enforces this with
//! [`TimeGrid::same_range`].

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, RfResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeGrid {
    start: NaiveDateTime,
    step_hours: u32,
    len: usize,
}

impl TimeGrid {
    pub fn new(start: NaiveDateTime, step_hours: u32, len: usize) -> RfResult<Self> {
        if step_hours == 0 {
            return Err(CoreError::InvalidTimeGrid {
                what: "step must be at least one hour".to_string(),
            });
        }
        if len == 0 {
            return Err(CoreError::InvalidTimeGrid {
                what: "grid must contain at least one step".to_string(),
            });
        }
        Ok(TimeGrid {
            start,
            step_hours,
            len,
        })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn hours_per_step(&self) -> f64 {
        self.step_hours as f64
    }

    pub fn step(&self) -> Duration {
        Duration::hours(self.step_hours as i64)
    }

    /// Timestamp of step `i`.
    pub fn at(&self, i: usize) -> NaiveDateTime {
        self.start + Duration::hours((self.step_hours as i64) * i as i64)
    }

    pub fn timestamps(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        (0..self.len).map(|i| self.at(i))
    }

    /// True when two grids describe the same simulation range, step for step.
    pub fn same_range(&self, other: &TimeGrid) -> bool {
        self == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2035, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn timestamps_are_evenly_spaced() {
        let grid = TimeGrid::new(start(), 1, 24).unwrap();
        let stamps: Vec<_> = grid.timestamps().collect();
        assert_eq!(stamps.len(), 24);
        assert_eq!(stamps[0], start());
        assert_eq!(stamps[23] - stamps[22], Duration::hours(1));
    }

    #[test]
    fn rejects_degenerate_grids() {
        assert!(TimeGrid::new(start(), 0, 24).is_err());
        assert!(TimeGrid::new(start(), 1, 0).is_err());
    }

    #[test]
    fn same_range_is_exact() {
        let a = TimeGrid::new(start(), 1, 24).unwrap();
        let b = TimeGrid::new(start(), 1, 24).unwrap();
        let c = TimeGrid::new(start(), 2, 24).unwrap();
        assert!(a.same_range(&b));
        assert!(!a.same_range(&c));
    }
}
