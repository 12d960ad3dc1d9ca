//! Integration tests for region assembly and its year-scoped views.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rf_core::{Ags, Carrier, Sector};
use rf_region::tables::{
    BusRow, CapacityRow, DemandRow, DistrictHeatingShareRow, HeatingStructureRow,
    MunicipalityRow, RegionTables, TechAssumptionRow, TimeseriesRow,
};
use rf_region::{Region, RegionError};
use rf_scenario::validate_scenario;

const YEAR: u32 = 2035;
const STEPS: usize = 4;

fn ags() -> Ags {
    Ags::new("15001000").unwrap()
}

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2035, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn ts_rows(ags: &Ags, key: &str, values: [f64; STEPS]) -> Vec<TimeseriesRow> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| TimeseriesRow {
            timestamp: start() + Duration::hours(i as i64),
            ags: ags.clone(),
            key: key.to_string(),
            value: *v,
        })
        .collect()
}

fn scenario() -> rf_scenario::Scenario {
    let yaml = format!(
        r#"
general: {{ name: test, year: {YEAR}, start: "2035-01-01T00:00:00", step_hours: 1, num_steps: {STEPS} }}
demand: {{ sectors: [hh], heat_sectors: [hh] }}
generation: {{ technologies: [wind] }}
grid: {{ trafo_conversion_factor: 0.996, max_usable_capacity_factor: 0.8, line_efficiency: 0.98, import_cost: 60, export_cost: 0, shortage_cost: 1000, excess_cost: 0 }}
storage: {{ th_cen: {{ enabled: false, capacity_mwh: 0, power_mw: 0, loss_rate: 0, efficiency_in: 1, efficiency_out: 1 }} }}
flexopt:
  batteries_large: {{ enabled: false, capacity_total_mwh: 0, c_rate: 1, efficiency_in: 0.95, efficiency_out: 0.95, loss_rate: 0, distribution: demand_share }}
  batteries_small: {{ enabled: false, capacity_total_mwh: 0, c_rate: 1, efficiency_in: 0.95, efficiency_out: 0.95, loss_rate: 0, distribution: population }}
  dec_pth: {{ enabled: false, nom_capacity_total_mw: 0, ashp_share: 0.6, gshp_share: 0.4, flow_temperature_c: 40, quality_grade_air: 0.4, quality_grade_soil: 0.4, cop_policy: clamp, max_cop: 7 }}
  cen_pth: {{ enabled: false, nom_capacity_mw: 0, efficiency: 0.99 }}
  dsm: {{ enabled: false, sectors: [hh], mode: current, shift_interval_hours: 24, delay_hours: 4 }}
commodities:
  - {{ name: gas, variable_cost: 35, emission_factor: 0.2 }}
district_heating: {{ network_efficiency: 0.85, installations: [] }}
"#
    );
    let scenario: rf_scenario::Scenario = serde_yaml::from_str(&yaml).expect("fixture parses");
    validate_scenario(&scenario).expect("fixture validates");
    scenario
}

fn tables() -> RegionTables {
    RegionTables {
        municipalities: vec![MunicipalityRow {
            ags: ags(),
            name: "Atown".to_string(),
            area_km2: 100.0,
            population: 50_000,
            substations: "1".to_string(),
        }],
        capacities: vec![CapacityRow {
            ags: ags(),
            technology: "wind".to_string(),
            capacity_mw: 10.0,
            count: 5,
        }],
        demand: vec![
            DemandRow {
                ags: ags(),
                sector: Sector::Hh,
                carrier: Carrier::El,
                annual_mwh: 8.0,
                peak_mw: 2.0,
            },
            DemandRow {
                ags: ags(),
                sector: Sector::Hh,
                carrier: Carrier::Th,
                annual_mwh: 8.0,
                peak_mw: 2.0,
            },
        ],
        buses: vec![BusRow {
            id: 1,
            v_nom_kv: 110.0,
            region: true,
            ags: Some(ags()),
        }],
        lines: vec![],
        trafos: vec![],
        demand_el_profiles: ts_rows(&ags(), "hh", [0.25; STEPS]),
        demand_th_profiles: ts_rows(&ags(), "hh", [0.25; STEPS]),
        feedin_profiles: ts_rows(&ags(), "wind", [0.5, 0.5, 0.0, 0.0]),
        temperature: [
            ts_rows(&ags(), "air", [5.0; STEPS]),
            ts_rows(&ags(), "soil", [8.0; STEPS]),
        ]
        .concat(),
        dsm: vec![],
        heating_structure: vec![HeatingStructureRow {
            ags: ags(),
            energy_source: "gas".to_string(),
            year: YEAR,
            sector: Sector::Hh,
            share: 1.0,
        }],
        tech_assumptions: vec![TechAssumptionRow {
            technology: "gas".to_string(),
            year: YEAR,
            capex: 700.0,
            opex_fix: 20.0,
            opex_var: 1.0,
            lifespan_years: 20,
            emission_factor: 0.2,
            efficiency: 0.95,
        }],
        dh_shares: vec![DistrictHeatingShareRow {
            ags: ags(),
            year: YEAR,
            share: 0.3,
        }],
        potential_areas: vec![],
    }
}

#[test]
fn prepared_demand_is_scaled_to_annual_energy() {
    let region = Region::build(tables(), &scenario()).unwrap();
    let demand = region.demand_el(Sector::Hh).unwrap();
    // 0.25 normalized * 8 MWh annual = 2 MW per step
    assert_eq!(demand.column(&ags()).unwrap(), &[2.0; STEPS]);
}

#[test]
fn aggregate_demand_rejects_unknown_sector() {
    let region = Region::build(tables(), &scenario()).unwrap();
    assert!(region.aggregate_demand(&[Sector::Hh]).is_ok());
    assert!(matches!(
        region.aggregate_demand(&[Sector::Hh, Sector::Ind]),
        Err(RegionError::MissingSeries { .. })
    ));
}

#[test]
fn aggregate_feedin_rejects_unknown_technology() {
    let region = Region::build(tables(), &scenario()).unwrap();
    let sums = region.aggregate_feedin(&["wind".to_string()]).unwrap();
    assert_eq!(sums[&ags()], 10.0);
    assert!(matches!(
        region.aggregate_feedin(&["biogas".to_string()]),
        Err(RegionError::MissingSeries { .. })
    ));
}

#[test]
fn year_scoped_views_fail_on_missing_year() {
    let region = Region::build(tables(), &scenario()).unwrap();
    assert!(region.heating_structure_for_year(YEAR).is_ok());
    assert!(matches!(
        region.heating_structure_for_year(2050),
        Err(RegionError::MissingYear { .. })
    ));
    assert!(matches!(
        region.assumptions_for_year(2050),
        Err(RegionError::MissingYear { .. })
    ));
    assert!(matches!(
        region.dh_share_for_year(2050),
        Err(RegionError::MissingYear { .. })
    ));
}

#[test]
fn solar_free_structure_view_is_renormalized() {
    let mut tables = tables();
    tables.heating_structure[0].share = 0.7;
    tables.heating_structure.push(HeatingStructureRow {
        ags: ags(),
        energy_source: "solar".to_string(),
        year: YEAR,
        sector: Sector::Hh,
        share: 0.3,
    });
    let region = Region::build(tables, &scenario()).unwrap();
    let view = region.heating_structure_without_solar(YEAR).unwrap();
    let sources = view.sources(&ags(), Sector::Hh).unwrap();
    assert_eq!(sources.len(), 1);
    assert!((sources["gas"] - 1.0).abs() < 1e-9);
}

#[test]
fn unbalanced_heating_shares_abort_the_build() {
    let mut tables = tables();
    tables.heating_structure[0].share = 0.8;
    assert!(matches!(
        Region::build(tables, &scenario()),
        Err(RegionError::UnbalancedShares { .. })
    ));
}

#[test]
fn unknown_heating_commodity_aborts_the_build() {
    let mut tables = tables();
    tables.heating_structure.push(HeatingStructureRow {
        ags: ags(),
        energy_source: "coal".to_string(),
        year: YEAR,
        sector: Sector::Rca,
        share: 1.0,
    });
    assert!(matches!(
        Region::build(tables, &scenario()),
        Err(RegionError::UnknownCommodity { .. })
    ));
}

#[test]
fn municipality_without_grid_bus_aborts_the_build() {
    let mut tables = tables();
    tables.buses[0].ags = None;
    assert!(matches!(
        Region::build(tables, &scenario()),
        Err(RegionError::IncompleteMunicipality { .. })
    ));
}

#[test]
fn battery_allocation_sums_to_the_total() {
    let mut tables = tables();
    tables.municipalities.push(MunicipalityRow {
        ags: Ags::new("15002000").unwrap(),
        name: "Bdorf".to_string(),
        area_km2: 80.0,
        population: 10_000,
        substations: "2".to_string(),
    });
    tables.buses.push(BusRow {
        id: 2,
        v_nom_kv: 110.0,
        region: true,
        ags: Some(Ags::new("15002000").unwrap()),
    });
    let region = Region::build(tables, &scenario()).unwrap();

    let allocation = region
        .battery_allocation(30.0, rf_scenario::AllocationMetric::Population)
        .unwrap();
    let total: f64 = allocation.values().sum();
    assert!((total - 30.0).abs() < 1e-9);
    assert!((allocation[&ags()] - 25.0).abs() < 1e-9);
}
