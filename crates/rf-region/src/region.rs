//! The per-run region data model.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use rf_core::{Ags, Carrier, Sector, TimeGrid};
use rf_scenario::{AllocationMetric, Scenario};
use tracing::debug;

use crate::grid::GridTopology;
use crate::prepare;
use crate::tables::{RegionTables, TechAssumptionRow, TimeseriesRow};
use crate::timeseries::{DsmSeries, TsTable};
use crate::{RegionError, RegionResult};

/// Energy sources that legitimately appear in the heating structure
/// without being commodities: electricity reuses the grid buses, solar
/// is covered implicitly and excluded by renormalization.
const NON_COMMODITY_SOURCES: [&str; 2] = ["electricity", "solar"];

/// The share below which a municipality counts as having no district
/// heating network.
const DH_SHARE_EPS: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct Municipality {
    pub ags: Ags,
    pub name: String,
    pub area_km2: f64,
    pub population: u64,
    pub substations: BTreeSet<u32>,
    /// Installed generation capacity per technology, MW.
    pub capacity_mw: IndexMap<String, f64>,
    /// Installed unit count per technology.
    pub unit_count: IndexMap<String, u32>,
    /// Annual electrical demand per sector, MWh.
    pub demand_el_annual_mwh: IndexMap<Sector, f64>,
    pub demand_el_peak_mw: IndexMap<Sector, f64>,
    /// Annual heat demand per sector, MWh.
    pub demand_th_annual_mwh: IndexMap<Sector, f64>,
    pub demand_th_peak_mw: IndexMap<Sector, f64>,
}

#[derive(Debug, Clone)]
pub struct TechAssumption {
    pub capex: f64,
    pub opex_fix: f64,
    pub opex_var: f64,
    pub lifespan_years: u32,
    pub emission_factor: f64,
    pub efficiency: f64,
}

impl From<&TechAssumptionRow> for TechAssumption {
    fn from(row: &TechAssumptionRow) -> Self {
        TechAssumption {
            capex: row.capex,
            opex_fix: row.opex_fix,
            opex_var: row.opex_var,
            lifespan_years: row.lifespan_years,
            emission_factor: row.emission_factor,
            efficiency: row.efficiency,
        }
    }
}

/// Year-scoped view of the heating structure: decentralized heat-source
/// shares per (municipality, sector).
#[derive(Debug, Clone)]
pub struct HeatingStructureView {
    shares: IndexMap<(Ags, Sector), IndexMap<String, f64>>,
}

impl HeatingStructureView {
    pub fn sources(&self, ags: &Ags, sector: Sector) -> Option<&IndexMap<String, f64>> {
        self.shares.get(&(ags.clone(), sector))
    }

    pub fn entries(&self) -> impl Iterator<Item = (&(Ags, Sector), &IndexMap<String, f64>)> {
        self.shares.iter()
    }

    /// The same view with the `solar` source removed and the remaining
    /// shares rescaled to sum to 1 again, for sizing decentral sources
    /// that cover only the residual (non-solar) load.
    pub fn without_solar(&self) -> HeatingStructureView {
        let mut shares = IndexMap::new();
        for (key, sources) in &self.shares {
            let residual: f64 = sources
                .iter()
                .filter(|(source, _)| source.as_str() != "solar")
                .map(|(_, share)| share)
                .sum();
            if residual <= 0.0 {
                // all-solar municipality: nothing left to renormalize
                continue;
            }
            let rescaled: IndexMap<String, f64> = sources
                .iter()
                .filter(|(source, _)| source.as_str() != "solar")
                .map(|(source, share)| (source.clone(), share / residual))
                .collect();
            shares.insert(key.clone(), rescaled);
        }
        HeatingStructureView { shares }
    }
}

/// All imported and derived data for one simulation run.
///
/// Read-only after [`Region::build`]; may be shared across concurrently
/// evaluated scenarios.
#[derive(Debug, Clone)]
pub struct Region {
    grid: TimeGrid,
    municipalities: IndexMap<Ags, Municipality>,
    topology: GridTopology,
    demand_el: IndexMap<Sector, TsTable>,
    demand_th: IndexMap<Sector, TsTable>,
    feedin: IndexMap<String, TsTable>,
    temperature_air: TsTable,
    temperature_soil: TsTable,
    dsm: IndexMap<DsmSeries, TsTable>,
    heating_structure: Vec<crate::tables::HeatingStructureRow>,
    tech_assumptions: Vec<TechAssumptionRow>,
    dh_shares: Vec<crate::tables::DistrictHeatingShareRow>,
    potential_areas: Vec<crate::tables::PotentialAreaRow>,
}

impl Region {
    /// Assemble and validate the region model from imported tables.
    pub fn build(tables: RegionTables, scenario: &Scenario) -> RegionResult<Self> {
        let grid = scenario.time_grid()?;

        let municipalities = fold_municipalities(&tables)?;
        let topology = GridTopology::build(&tables.buses, &tables.lines, &tables.trafos)?;

        for municipality in municipalities.values() {
            if topology.buses_of(&municipality.ags).is_empty() {
                return Err(RegionError::IncompleteMunicipality {
                    ags: municipality.ags.clone(),
                    what: "associated grid bus".to_string(),
                });
            }
        }

        // Demand profiles are normalized to annual energy 1; scale by the
        // municipality's annual demand.
        let demand_scale = |carrier: Carrier| {
            let mut scales: IndexMap<String, IndexMap<Ags, f64>> = IndexMap::new();
            for municipality in municipalities.values() {
                let annual = match carrier {
                    Carrier::El => &municipality.demand_el_annual_mwh,
                    Carrier::Th => &municipality.demand_th_annual_mwh,
                };
                for (sector, mwh) in annual {
                    scales
                        .entry(sector.token().to_string())
                        .or_default()
                        .insert(municipality.ags.clone(), *mwh);
                }
            }
            scales
        };

        let demand_el = keyed_by_sector(prepare::prepare_all(
            &tables.demand_el_profiles,
            &grid,
            &demand_scale(Carrier::El),
            "demand_el",
        )?)?;
        let demand_th = keyed_by_sector(prepare::prepare_all(
            &tables.demand_th_profiles,
            &grid,
            &demand_scale(Carrier::Th),
            "demand_th",
        )?)?;

        // Feedin profiles are capacity factors; scale by installed capacity.
        let mut feedin_scales: IndexMap<String, IndexMap<Ags, f64>> = IndexMap::new();
        for technology in &scenario.generation.technologies {
            let mut scale = IndexMap::new();
            for municipality in municipalities.values() {
                if let Some(capacity) = municipality.capacity_mw.get(technology) {
                    scale.insert(municipality.ags.clone(), *capacity);
                }
            }
            feedin_scales.insert(technology.clone(), scale);
        }
        let feedin = prepare::prepare_all(&tables.feedin_profiles, &grid, &feedin_scales, "feedin")?;
        for technology in &scenario.generation.technologies {
            if !feedin.contains_key(technology) {
                return Err(RegionError::MissingSeries {
                    key: format!("feedin/{technology}"),
                });
            }
        }

        let temperature = split_temperature(&tables.temperature, &grid)?;
        let dsm = split_dsm(&tables.dsm, &grid)?;

        validate_heating_structure(&tables, scenario)?;

        debug!(
            municipalities = municipalities.len(),
            buses = topology.buses().count(),
            "region model assembled"
        );

        Ok(Region {
            grid,
            municipalities,
            topology,
            demand_el,
            demand_th,
            feedin,
            temperature_air: temperature.0,
            temperature_soil: temperature.1,
            dsm,
            heating_structure: tables.heating_structure,
            tech_assumptions: tables.tech_assumptions,
            dh_shares: tables.dh_shares,
            potential_areas: tables.potential_areas,
        })
    }

    pub fn time_grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn municipalities(&self) -> impl Iterator<Item = &Municipality> {
        self.municipalities.values()
    }

    pub fn municipality(&self, ags: &Ags) -> Option<&Municipality> {
        self.municipalities.get(ags)
    }

    pub fn topology(&self) -> &GridTopology {
        &self.topology
    }

    pub fn demand_el(&self, sector: Sector) -> RegionResult<&TsTable> {
        self.demand_el
            .get(&sector)
            .ok_or_else(|| RegionError::MissingSeries {
                key: format!("demand_el/{sector}"),
            })
    }

    pub fn demand_th(&self, sector: Sector) -> RegionResult<&TsTable> {
        self.demand_th
            .get(&sector)
            .ok_or_else(|| RegionError::MissingSeries {
                key: format!("demand_th/{sector}"),
            })
    }

    pub fn feedin(&self, technology: &str) -> RegionResult<&TsTable> {
        self.feedin
            .get(technology)
            .ok_or_else(|| RegionError::MissingSeries {
                key: format!("feedin/{technology}"),
            })
    }

    pub fn temperature_air(&self) -> &TsTable {
        &self.temperature_air
    }

    pub fn temperature_soil(&self) -> &TsTable {
        &self.temperature_soil
    }

    pub fn dsm(&self, series: DsmSeries) -> RegionResult<&TsTable> {
        self.dsm
            .get(&series)
            .ok_or_else(|| RegionError::MissingSeries {
                key: format!("dsm/{}", series.key()),
            })
    }

    /// Per-municipality demand summed over the given sectors.
    pub fn aggregate_demand(&self, sectors: &[Sector]) -> RegionResult<IndexMap<Ags, f64>> {
        let mut sums: IndexMap<Ags, f64> = IndexMap::new();
        for sector in sectors {
            let table = self.demand_el(*sector)?;
            for (ags, sum) in table.column_sums() {
                *sums.entry(ags).or_insert(0.0) += sum;
            }
        }
        Ok(sums)
    }

    /// Per-municipality feedin summed over the given technologies.
    pub fn aggregate_feedin(&self, technologies: &[String]) -> RegionResult<IndexMap<Ags, f64>> {
        let mut sums: IndexMap<Ags, f64> = IndexMap::new();
        for technology in technologies {
            let table = self.feedin(technology)?;
            for (ags, sum) in table.column_sums() {
                *sums.entry(ags).or_insert(0.0) += sum;
            }
        }
        Ok(sums)
    }

    /// Heating structure for the scenario year; missing year is an error.
    pub fn heating_structure_for_year(&self, year: u32) -> RegionResult<HeatingStructureView> {
        let mut shares: IndexMap<(Ags, Sector), IndexMap<String, f64>> = IndexMap::new();
        for row in self.heating_structure.iter().filter(|r| r.year == year) {
            shares
                .entry((row.ags.clone(), row.sector))
                .or_default()
                .insert(row.energy_source.clone(), row.share);
        }
        if shares.is_empty() {
            return Err(RegionError::MissingYear {
                year,
                table: "heating_structure".to_string(),
            });
        }
        Ok(HeatingStructureView { shares })
    }

    /// Heating structure with solar excluded and shares renormalized.
    pub fn heating_structure_without_solar(
        &self,
        year: u32,
    ) -> RegionResult<HeatingStructureView> {
        Ok(self.heating_structure_for_year(year)?.without_solar())
    }

    /// Technical assumptions for the scenario year, keyed by technology.
    pub fn assumptions_for_year(
        &self,
        year: u32,
    ) -> RegionResult<IndexMap<String, TechAssumption>> {
        let assumptions: IndexMap<String, TechAssumption> = self
            .tech_assumptions
            .iter()
            .filter(|r| r.year == year)
            .map(|r| (r.technology.clone(), TechAssumption::from(r)))
            .collect();
        if assumptions.is_empty() {
            return Err(RegionError::MissingYear {
                year,
                table: "tech_assumptions".to_string(),
            });
        }
        Ok(assumptions)
    }

    /// District-heating share per municipality for the scenario year.
    /// Municipalities without a row have no district heating (share 0).
    pub fn dh_share_for_year(&self, year: u32) -> RegionResult<IndexMap<Ags, f64>> {
        let shares: IndexMap<Ags, f64> = self
            .dh_shares
            .iter()
            .filter(|r| r.year == year)
            .map(|r| (r.ags.clone(), r.share))
            .collect();
        if shares.is_empty() {
            return Err(RegionError::MissingYear {
                year,
                table: "dh_shares".to_string(),
            });
        }
        Ok(shares)
    }

    /// Whether a municipality has a district-heating network at all.
    pub fn has_district_heating(&self, ags: &Ags, year: u32) -> RegionResult<bool> {
        Ok(self
            .dh_share_for_year(year)?
            .get(ags)
            .map(|share| *share > DH_SHARE_EPS)
            .unwrap_or(false))
    }

    pub fn potential_areas(&self) -> &[crate::tables::PotentialAreaRow] {
        &self.potential_areas
    }

    /// Distribute a total battery capacity across municipalities
    /// proportionally to the configured metric.
    pub fn battery_allocation(
        &self,
        total_mwh: f64,
        metric: AllocationMetric,
    ) -> RegionResult<IndexMap<Ags, f64>> {
        let weights: IndexMap<Ags, f64> = match metric {
            AllocationMetric::DemandShare => {
                let sectors: Vec<Sector> = self.demand_el.keys().copied().collect();
                self.aggregate_demand(&sectors)?
            }
            AllocationMetric::Population => self
                .municipalities
                .values()
                .map(|m| (m.ags.clone(), m.population as f64))
                .collect(),
        };
        let total_weight: f64 = weights.values().sum();
        if total_weight <= 0.0 {
            return Err(RegionError::InvalidInput {
                what: format!("battery allocation metric {metric:?} has zero total weight"),
            });
        }
        Ok(weights
            .into_iter()
            .map(|(ags, weight)| (ags, total_mwh * weight / total_weight))
            .collect())
    }
}

fn fold_municipalities(tables: &RegionTables) -> RegionResult<IndexMap<Ags, Municipality>> {
    let mut municipalities: IndexMap<Ags, Municipality> = IndexMap::new();
    for row in &tables.municipalities {
        let substations = row.substation_ids()?;
        match municipalities.entry(row.ags.clone()) {
            // duplicate rows collapse; substation sets union
            indexmap::map::Entry::Occupied(mut entry) => {
                entry.get_mut().substations.extend(substations);
            }
            indexmap::map::Entry::Vacant(entry) => {
                entry.insert(Municipality {
                    ags: row.ags.clone(),
                    name: row.name.clone(),
                    area_km2: row.area_km2,
                    population: row.population,
                    substations,
                    capacity_mw: IndexMap::new(),
                    unit_count: IndexMap::new(),
                    demand_el_annual_mwh: IndexMap::new(),
                    demand_el_peak_mw: IndexMap::new(),
                    demand_th_annual_mwh: IndexMap::new(),
                    demand_th_peak_mw: IndexMap::new(),
                });
            }
        }
    }

    for row in &tables.capacities {
        let municipality =
            municipalities
                .get_mut(&row.ags)
                .ok_or_else(|| RegionError::InvalidInput {
                    what: format!("capacity row for unknown municipality {}", row.ags),
                })?;
        *municipality
            .capacity_mw
            .entry(row.technology.clone())
            .or_insert(0.0) += row.capacity_mw;
        *municipality
            .unit_count
            .entry(row.technology.clone())
            .or_insert(0) += row.count;
    }

    for row in &tables.demand {
        let municipality =
            municipalities
                .get_mut(&row.ags)
                .ok_or_else(|| RegionError::InvalidInput {
                    what: format!("demand row for unknown municipality {}", row.ags),
                })?;
        let (annual, peak) = match row.carrier {
            Carrier::El => (
                &mut municipality.demand_el_annual_mwh,
                &mut municipality.demand_el_peak_mw,
            ),
            Carrier::Th => (
                &mut municipality.demand_th_annual_mwh,
                &mut municipality.demand_th_peak_mw,
            ),
        };
        annual.insert(row.sector, row.annual_mwh);
        peak.insert(row.sector, row.peak_mw);
    }

    Ok(municipalities)
}

fn keyed_by_sector(
    tables: IndexMap<String, TsTable>,
) -> RegionResult<IndexMap<Sector, TsTable>> {
    tables
        .into_iter()
        .map(|(key, table)| Ok((Sector::from_token(&key)?, table)))
        .collect()
}

/// Temperatures are absolute °C series (scale 1, negatives allowed).
fn split_temperature(
    rows: &[TimeseriesRow],
    grid: &TimeGrid,
) -> RegionResult<(TsTable, TsTable)> {
    let mut air = TsTable::new(grid.timestamps().collect());
    let mut soil = TsTable::new(grid.timestamps().collect());
    let mut columns: IndexMap<(String, Ags), Vec<f64>> = IndexMap::new();
    for row in rows {
        columns
            .entry((row.key.clone(), row.ags.clone()))
            .or_default()
            .push(row.value);
    }
    for ((kind, ags), values) in columns {
        match kind.as_str() {
            "air" => air.insert_column(ags, values)?,
            "soil" => soil.insert_column(ags, values)?,
            other => {
                return Err(RegionError::InvalidInput {
                    what: format!("unknown temperature series {other:?}"),
                })
            }
        }
    }
    Ok((air, soil))
}

fn split_dsm(
    rows: &[TimeseriesRow],
    grid: &TimeGrid,
) -> RegionResult<IndexMap<DsmSeries, TsTable>> {
    let mut tables: IndexMap<DsmSeries, TsTable> = IndexMap::new();
    let mut columns: IndexMap<(DsmSeries, Ags), Vec<f64>> = IndexMap::new();
    for row in rows {
        let series = DsmSeries::from_key(&row.key).ok_or_else(|| RegionError::InvalidInput {
            what: format!("unknown DSM series {:?}", row.key),
        })?;
        if row.value < 0.0 {
            return Err(RegionError::InvalidInput {
                what: format!("negative DSM value for {} at {}", row.ags, row.timestamp),
            });
        }
        columns
            .entry((series, row.ags.clone()))
            .or_default()
            .push(row.value);
    }
    for ((series, ags), values) in columns {
        tables
            .entry(series)
            .or_insert_with(|| TsTable::new(grid.timestamps().collect()))
            .insert_column(ags, values)?;
    }
    Ok(tables)
}

/// Shares must sum to 1 per (municipality, sector, year); every source
/// outside the exempt list must be a configured commodity.
fn validate_heating_structure(tables: &RegionTables, scenario: &Scenario) -> RegionResult<()> {
    let mut sums: IndexMap<(Ags, Sector, u32), f64> = IndexMap::new();
    for row in &tables.heating_structure {
        if row.energy_source == "district_heating" {
            return Err(RegionError::InvalidInput {
                what: format!(
                    "heating structure for {} lists district_heating; the district share is \
                     carried separately",
                    row.ags
                ),
            });
        }
        if !NON_COMMODITY_SOURCES.contains(&row.energy_source.as_str())
            && scenario.commodity(&row.energy_source).is_none()
        {
            return Err(RegionError::UnknownCommodity {
                fuel: row.energy_source.clone(),
            });
        }
        *sums
            .entry((row.ags.clone(), row.sector, row.year))
            .or_insert(0.0) += row.share;
    }
    for ((ags, sector, _year), sum) in sums {
        if (sum - 1.0).abs() > 1e-9 {
            return Err(RegionError::UnbalancedShares { ags, sector, sum });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn without_solar_renormalizes_to_one() {
        let ags = Ags::new("15001000").unwrap();
        let mut sources = IndexMap::new();
        sources.insert("gas".to_string(), 0.5);
        sources.insert("solar".to_string(), 0.2);
        sources.insert("wood".to_string(), 0.3);
        let view = HeatingStructureView {
            shares: [((ags.clone(), Sector::Hh), sources)].into_iter().collect(),
        };

        let residual = view.without_solar();
        let shares = residual.sources(&ags, Sector::Hh).unwrap();
        let sum: f64 = shares.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!((shares["gas"] - 0.625).abs() < 1e-9);
        assert!((shares["wood"] - 0.375).abs() < 1e-9);
        assert!(!shares.contains_key("solar"));
    }

    #[test]
    fn all_solar_municipality_drops_out() {
        let ags = Ags::new("15001000").unwrap();
        let mut sources = IndexMap::new();
        sources.insert("solar".to_string(), 1.0);
        let view = HeatingStructureView {
            shares: [((ags.clone(), Sector::Hh), sources)].into_iter().collect(),
        };
        assert!(view.without_solar().sources(&ags, Sector::Hh).is_none());
    }
}
