//! Imported input tables.
//!
//! Rows mirror the relational store's read-query results one to one; the
//! [`Region`](crate::Region) factory folds them into keyed structures.
//! Time-series inputs arrive in long format (timestamp × municipality ×
//! key) and are converted by [`prepare`](crate::prepare).

use std::path::Path;

use chrono::NaiveDateTime;
use rf_core::{Ags, Sector};
use serde::{Deserialize, Serialize};

use crate::{RegionError, RegionResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MunicipalityRow {
    pub ags: Ags,
    pub name: String,
    pub area_km2: f64,
    pub population: u64,
    /// Semicolon-separated substation bus ids, e.g. `"12;14"`.
    pub substations: String,
}

/// Installed generation per municipality and technology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityRow {
    pub ags: Ags,
    pub technology: String,
    pub capacity_mw: f64,
    pub count: u32,
}

/// Annual and peak demand per municipality, sector and carrier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandRow {
    pub ags: Ags,
    pub sector: Sector,
    pub carrier: rf_core::Carrier,
    pub annual_mwh: f64,
    pub peak_mw: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusRow {
    pub id: u32,
    pub v_nom_kv: f64,
    /// Internal region bus, as opposed to an external boundary bus.
    pub region: bool,
    pub ags: Option<Ags>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineRow {
    pub id: u32,
    pub bus0: u32,
    pub bus1: u32,
    pub capacity_mva: f64,
    pub length_km: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafoRow {
    pub id: u32,
    pub bus0: u32,
    pub bus1: u32,
    pub capacity_mva: f64,
}

/// One long-format time-series observation.
///
/// `key` carries the sector (demand), technology (feedin), `air`/`soil`
/// (temperature) or DSM sub-series name depending on the table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeseriesRow {
    pub timestamp: NaiveDateTime,
    pub ags: Ags,
    pub key: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatingStructureRow {
    pub ags: Ags,
    pub energy_source: String,
    pub year: u32,
    pub sector: Sector,
    pub share: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechAssumptionRow {
    pub technology: String,
    pub year: u32,
    pub capex: f64,
    pub opex_fix: f64,
    pub opex_var: f64,
    pub lifespan_years: u32,
    pub emission_factor: f64,
    pub efficiency: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistrictHeatingShareRow {
    pub ags: Ags,
    pub year: u32,
    pub share: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PotentialAreaRow {
    pub ags: Ags,
    pub scenario: String,
    pub area_km2: f64,
}

/// The full bundle of imported tables for one run.
#[derive(Debug, Clone, Default)]
pub struct RegionTables {
    pub municipalities: Vec<MunicipalityRow>,
    pub capacities: Vec<CapacityRow>,
    pub demand: Vec<DemandRow>,
    pub buses: Vec<BusRow>,
    pub lines: Vec<LineRow>,
    pub trafos: Vec<TrafoRow>,
    pub demand_el_profiles: Vec<TimeseriesRow>,
    pub demand_th_profiles: Vec<TimeseriesRow>,
    pub feedin_profiles: Vec<TimeseriesRow>,
    pub temperature: Vec<TimeseriesRow>,
    pub dsm: Vec<TimeseriesRow>,
    pub heating_structure: Vec<HeatingStructureRow>,
    pub tech_assumptions: Vec<TechAssumptionRow>,
    pub dh_shares: Vec<DistrictHeatingShareRow>,
    pub potential_areas: Vec<PotentialAreaRow>,
}

fn read_csv<T: serde::de::DeserializeOwned>(dir: &Path, name: &str) -> RegionResult<Vec<T>> {
    let path = dir.join(name);
    let mut reader = csv::Reader::from_path(&path).map_err(|source| RegionError::Csv {
        table: name.to_string(),
        source,
    })?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record.map_err(|source| RegionError::Csv {
            table: name.to_string(),
            source,
        })?);
    }
    Ok(rows)
}

impl RegionTables {
    /// Load every input table from a directory of CSV files.
    pub fn from_dir(dir: &Path) -> RegionResult<Self> {
        Ok(RegionTables {
            municipalities: read_csv(dir, "municipalities.csv")?,
            capacities: read_csv(dir, "capacities.csv")?,
            demand: read_csv(dir, "demand.csv")?,
            buses: read_csv(dir, "buses.csv")?,
            lines: read_csv(dir, "lines.csv")?,
            trafos: read_csv(dir, "trafos.csv")?,
            demand_el_profiles: read_csv(dir, "demand_el_profiles.csv")?,
            demand_th_profiles: read_csv(dir, "demand_th_profiles.csv")?,
            feedin_profiles: read_csv(dir, "feedin_profiles.csv")?,
            temperature: read_csv(dir, "temperature.csv")?,
            dsm: read_csv(dir, "dsm.csv")?,
            heating_structure: read_csv(dir, "heating_structure.csv")?,
            tech_assumptions: read_csv(dir, "tech_assumptions.csv")?,
            dh_shares: read_csv(dir, "dh_shares.csv")?,
            potential_areas: read_csv(dir, "potential_areas.csv")?,
        })
    }
}

impl MunicipalityRow {
    /// Parse the substation id set; duplicates collapse.
    pub fn substation_ids(&self) -> RegionResult<std::collections::BTreeSet<u32>> {
        let mut ids = std::collections::BTreeSet::new();
        for part in self.substations.split(';').filter(|p| !p.is_empty()) {
            let id = part
                .trim()
                .parse()
                .map_err(|_| RegionError::InvalidInput {
                    what: format!("substation id {:?} for {}", part, self.ags),
                })?;
            ids.insert(id);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substation_set_deduplicates() {
        let row = MunicipalityRow {
            ags: Ags::new("15001000").unwrap(),
            name: "Dessau".to_string(),
            area_km2: 245.0,
            population: 80000,
            substations: "12;14;12".to_string(),
        };
        let ids = row.substation_ids().unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![12, 14]);
    }

    #[test]
    fn bad_substation_token_is_rejected() {
        let row = MunicipalityRow {
            ags: Ags::new("15001000").unwrap(),
            name: "Dessau".to_string(),
            area_km2: 245.0,
            population: 80000,
            substations: "12;x".to_string(),
        };
        assert!(row.substation_ids().is_err());
    }
}
