//! Timeseries preparation.
//!
//! Converts raw long-format series into per-key [`TsTable`]s aligned to
//! the simulation time grid, scaling normalized profiles to absolute
//! power values per municipality.

use indexmap::IndexMap;
use rf_core::{Ags, TimeGrid};

use crate::tables::TimeseriesRow;
use crate::timeseries::TsTable;
use crate::{RegionError, RegionResult};

/// Split long-format rows into per-key groups, preserving row order.
pub fn group_by_key(rows: &[TimeseriesRow]) -> IndexMap<String, Vec<&TimeseriesRow>> {
    let mut groups: IndexMap<String, Vec<&TimeseriesRow>> = IndexMap::new();
    for row in rows {
        groups.entry(row.key.clone()).or_default().push(row);
    }
    groups
}

/// Build one absolute table from raw rows of a single key.
///
/// `scale` maps each municipality to its absolute target (annual energy,
/// peak load or installed capacity — the profile's normalization decides
/// which); raw values are multiplied by it. Municipalities absent from
/// the raw rows contribute no column (zero contribution); a municipality
/// present in the rows but absent from `scale` is an error, not a silent
/// unit profile. Source timestamp ordering must already match the grid;
/// reordering would hide misaligned input.
pub fn prepare_timeseries(
    rows: &[&TimeseriesRow],
    grid: &TimeGrid,
    scale: &IndexMap<Ags, f64>,
    what: &str,
) -> RegionResult<TsTable> {
    let mut raw_columns: IndexMap<Ags, Vec<(chrono::NaiveDateTime, f64)>> = IndexMap::new();
    for row in rows {
        if row.value < 0.0 || !row.value.is_finite() {
            return Err(RegionError::InvalidInput {
                what: format!("{what}: negative or non-finite value for {} at {}", row.ags, row.timestamp),
            });
        }
        raw_columns
            .entry(row.ags.clone())
            .or_default()
            .push((row.timestamp, row.value));
    }

    let mut table = TsTable::new(grid.timestamps().collect());
    for (ags, samples) in raw_columns {
        let factor = *scale.get(&ags).ok_or_else(|| RegionError::MissingColumn {
            ags: ags.clone(),
            table: format!("{what} scale"),
        })?;
        if samples.len() != grid.len() {
            return Err(RegionError::Misaligned {
                what: format!(
                    "{what}: {} has {} samples, grid has {} steps",
                    ags,
                    samples.len(),
                    grid.len()
                ),
            });
        }
        let mut values = Vec::with_capacity(samples.len());
        for (i, ((timestamp, value), expected)) in
            samples.iter().zip(grid.timestamps()).enumerate()
        {
            if *timestamp != expected {
                return Err(RegionError::Misaligned {
                    what: format!(
                        "{what}: {} timestamp {} at step {}, expected {}",
                        ags, timestamp, i, expected
                    ),
                });
            }
            values.push(value * factor);
        }
        table.insert_column(ags, values)?;
    }
    Ok(table)
}

/// Prepare every key of a long-format table with per-key scales.
///
/// Keys without a scale entry are skipped entirely (not an error: the
/// scenario may model fewer technologies than the store holds).
pub fn prepare_all(
    rows: &[TimeseriesRow],
    grid: &TimeGrid,
    scales: &IndexMap<String, IndexMap<Ags, f64>>,
    what: &str,
) -> RegionResult<IndexMap<String, TsTable>> {
    let mut tables = IndexMap::new();
    for (key, group) in group_by_key(rows) {
        let Some(scale) = scales.get(&key) else {
            tracing::debug!(key, what, "skipping unconfigured series");
            continue;
        };
        let table = prepare_timeseries(&group, grid, scale, &format!("{what}/{key}"))?;
        tables.insert(key, table);
    }
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn grid() -> TimeGrid {
        let start = NaiveDate::from_ymd_opt(2035, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        TimeGrid::new(start, 1, 3).unwrap()
    }

    fn ags(code: &str) -> Ags {
        Ags::new(code).unwrap()
    }

    fn rows(code: &str, values: &[f64]) -> Vec<TimeseriesRow> {
        let g = grid();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| TimeseriesRow {
                timestamp: g.start() + Duration::hours(i as i64),
                ags: ags(code),
                key: "wind".to_string(),
                value: *v,
            })
            .collect()
    }

    #[test]
    fn scales_to_absolute_values() {
        let raw = rows("1", &[0.1, 0.5, 0.4]);
        let refs: Vec<&TimeseriesRow> = raw.iter().collect();
        let scale: IndexMap<Ags, f64> = [(ags("1"), 10.0)].into_iter().collect();
        let table = prepare_timeseries(&refs, &grid(), &scale, "feedin").unwrap();
        assert_eq!(table.column(&ags("1")).unwrap(), &[1.0, 5.0, 4.0]);
    }

    #[test]
    fn absent_municipality_means_no_column() {
        let raw = rows("1", &[0.1, 0.5, 0.4]);
        let refs: Vec<&TimeseriesRow> = raw.iter().collect();
        let scale: IndexMap<Ags, f64> =
            [(ags("1"), 10.0), (ags("2"), 5.0)].into_iter().collect();
        let table = prepare_timeseries(&refs, &grid(), &scale, "feedin").unwrap();
        assert!(table.column(&ags("2")).is_none());
    }

    #[test]
    fn municipality_without_scale_is_an_error() {
        let raw = rows("1", &[0.1, 0.5, 0.4]);
        let refs: Vec<&TimeseriesRow> = raw.iter().collect();
        let scale = IndexMap::new();
        assert!(matches!(
            prepare_timeseries(&refs, &grid(), &scale, "feedin"),
            Err(RegionError::MissingColumn { .. })
        ));
    }

    #[test]
    fn negative_values_are_rejected() {
        let raw = rows("1", &[0.1, -0.5, 0.4]);
        let refs: Vec<&TimeseriesRow> = raw.iter().collect();
        let scale: IndexMap<Ags, f64> = [(ags("1"), 10.0)].into_iter().collect();
        assert!(prepare_timeseries(&refs, &grid(), &scale, "feedin").is_err());
    }

    #[test]
    fn shifted_timestamps_are_rejected() {
        let mut raw = rows("1", &[0.1, 0.5, 0.4]);
        raw[2].timestamp += Duration::hours(5);
        let refs: Vec<&TimeseriesRow> = raw.iter().collect();
        let scale: IndexMap<Ags, f64> = [(ags("1"), 10.0)].into_iter().collect();
        assert!(matches!(
            prepare_timeseries(&refs, &grid(), &scale, "feedin"),
            Err(RegionError::Misaligned { .. })
        ));
    }
}
