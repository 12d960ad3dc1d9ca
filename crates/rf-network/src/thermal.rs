//! Thermal phase: decentral heat supply per municipality and sector,
//! commodity sources, and municipality-specific district-heating supply.

use indexmap::IndexMap;
use rf_core::{Ags, BusId, DistrictSide, HeatMode, Label, Sector};
use rf_region::{HeatingStructureView, Region, RegionError, TechAssumption};
use rf_scenario::{InstallationDef, Scenario};

use crate::calc::maintenance_mask;
use crate::model::{Flow, NetworkBuilder, NodeKind};
use crate::{NetworkError, NetworkResult};

/// Energy source keys handled outside the commodity list.
const SOURCE_ELECTRICITY: &str = "electricity";

pub(crate) fn build(
    builder: &mut NetworkBuilder,
    region: &Region,
    scenario: &Scenario,
) -> NetworkResult<()> {
    let year = scenario.general.year;
    let dh_shares = region.dh_share_for_year(year)?;
    // decentral sources cover the residual load net of solar thermal;
    // the raw view is kept to tell "all solar" apart from "no data"
    let raw_structure = region.heating_structure_for_year(year)?;
    let structure = raw_structure.without_solar();
    let assumptions = region.assumptions_for_year(year)?;

    for municipality in region.municipalities() {
        let ags = &municipality.ags;
        let dh_share = dh_shares.get(ags).copied().unwrap_or(0.0);
        let has_dh = dh_share > 0.0;

        if has_dh {
            builder.add_node(
                Label::DistrictHeatBus {
                    ags: ags.clone(),
                    side: DistrictSide::In,
                },
                NodeKind::Bus,
            )?;
            builder.add_node(
                Label::DistrictHeatBus {
                    ags: ags.clone(),
                    side: DistrictSide::Out,
                },
                NodeKind::Bus,
            )?;
            build_district_network(builder, ags, scenario)?;
        }

        for sector in &scenario.demand.heat_sectors {
            let table = region.demand_th(*sector)?;
            let Some(demand) = table.column(ags) else {
                continue;
            };

            let heat_bus = Label::DecHeatBus {
                ags: ags.clone(),
                sector: *sector,
            };
            builder.add_node(heat_bus.clone(), NodeKind::Bus)?;

            // demand splits between the decentral and district portion
            let dec_profile: Vec<f64> = demand.iter().map(|v| v * (1.0 - dh_share)).collect();
            let dec_sink = Label::HeatDemand {
                ags: ags.clone(),
                sector: *sector,
                mode: HeatMode::Dec,
            };
            builder.add_node(dec_sink.clone(), NodeKind::Sink)?;
            builder.add_flow(Flow::new(heat_bus.clone(), dec_sink).fixed(dec_profile.clone()));

            if has_dh {
                let cen_profile: Vec<f64> = demand.iter().map(|v| v * dh_share).collect();
                let cen_sink = Label::HeatDemand {
                    ags: ags.clone(),
                    sector: *sector,
                    mode: HeatMode::Cen,
                };
                builder.add_node(cen_sink.clone(), NodeKind::Sink)?;
                builder.add_flow(
                    Flow::new(
                        Label::DistrictHeatBus {
                            ags: ags.clone(),
                            side: DistrictSide::Out,
                        },
                        cen_sink,
                    )
                    .fixed(cen_profile),
                );
            }

            if raw_structure.sources(ags, *sector).is_none() {
                // heat demand without any heating-structure row is bad
                // input data, not an empty supply mix
                return Err(RegionError::IncompleteMunicipality {
                    ags: ags.clone(),
                    what: format!("heating structure for sector {sector} in {year}"),
                }
                .into());
            }
            build_dec_sources(
                builder,
                region,
                scenario,
                ags,
                *sector,
                &heat_bus,
                &dec_profile,
                &structure,
                &assumptions,
            )?;
        }
    }

    build_installations(builder, region, scenario, &dh_shares)?;
    build_thermal_storage(builder, region, scenario, &dh_shares)?;

    Ok(())
}

/// One decentral generation source per energy-source category in the
/// heating structure, sized to the sector's residual demand peak times
/// the structural share.
#[allow(clippy::too_many_arguments)]
fn build_dec_sources(
    builder: &mut NetworkBuilder,
    region: &Region,
    scenario: &Scenario,
    ags: &Ags,
    sector: Sector,
    heat_bus: &Label,
    dec_profile: &[f64],
    structure: &HeatingStructureView,
    assumptions: &IndexMap<String, TechAssumption>,
) -> NetworkResult<()> {
    let Some(sources) = structure.sources(ags, sector) else {
        // municipality not in the heating structure: no decentral supply
        return Ok(());
    };
    let peak = dec_profile.iter().copied().fold(0.0, f64::max);

    for (source, share) in sources {
        let efficiency = assumptions
            .get(source)
            .map(|a| a.efficiency)
            .ok_or_else(|| RegionError::MissingSeries {
                key: format!("tech_assumptions/{source}"),
            })?;
        let nominal = peak * share;
        let generator = Label::DecHeatGenerator {
            ags: ags.clone(),
            sector,
            fuel: source.clone(),
        };
        builder.add_node(generator.clone(), NodeKind::Converter)?;
        builder.add_flow(
            Flow::new(generator.clone(), heat_bus.clone())
                .nominal(nominal)
                .efficiency(efficiency),
        );

        if source == SOURCE_ELECTRICITY {
            // direct electric heating draws from the grid bus
            let bus = primary_bus(region, ags)?;
            builder.add_flow(Flow::new(Label::ElBus { bus }, generator));
        } else {
            let commodity =
                scenario
                    .commodity(source)
                    .ok_or_else(|| NetworkError::UnknownCommodity {
                        fuel: source.clone(),
                    })?;
            let com = Label::Commodity {
                fuel: source.clone(),
            };
            builder.ensure_node(com.clone(), NodeKind::Source);
            builder.add_flow(Flow::new(com, generator).cost(commodity.variable_cost));
        }
    }
    Ok(())
}

/// Lossy in→out converter representing the district network itself.
fn build_district_network(
    builder: &mut NetworkBuilder,
    ags: &Ags,
    scenario: &Scenario,
) -> NetworkResult<()> {
    let network = Label::DistrictNetwork { ags: ags.clone() };
    builder.add_node(network.clone(), NodeKind::Converter)?;
    builder.add_flow(Flow::new(
        Label::DistrictHeatBus {
            ags: ags.clone(),
            side: DistrictSide::In,
        },
        network.clone(),
    ));
    builder.add_flow(
        Flow::new(
            network,
            Label::DistrictHeatBus {
                ags: ags.clone(),
                side: DistrictSide::Out,
            },
        )
        .efficiency(scenario.district_heating.network_efficiency),
    );
    Ok(())
}

/// Peak thermal load of a municipality's district network: the maximum
/// simultaneous sector demand, scaled by the district share and corrected
/// for the network's efficiency.
fn peak_thermal_load(
    region: &Region,
    scenario: &Scenario,
    ags: &Ags,
    dh_share: f64,
) -> NetworkResult<f64> {
    let mut totals = vec![0.0; region.time_grid().len()];
    for sector in &scenario.demand.heat_sectors {
        if let Some(column) = region.demand_th(*sector)?.column(ags) {
            for (total, value) in totals.iter_mut().zip(column) {
                *total += value;
            }
        }
    }
    let peak = totals.into_iter().fold(0.0, f64::max);
    Ok(peak * dh_share / scenario.district_heating.network_efficiency)
}

/// District supply installations from the declarative per-municipality
/// table: CHP and boiler converters sized relative to the peak thermal
/// load, with scheduled downtime for combined-cycle units.
fn build_installations(
    builder: &mut NetworkBuilder,
    region: &Region,
    scenario: &Scenario,
    dh_shares: &IndexMap<Ags, f64>,
) -> NetworkResult<()> {
    for spec in &scenario.district_heating.installations {
        let dh_share = dh_shares.get(&spec.ags).copied().unwrap_or(0.0);
        if dh_share <= 0.0 {
            return Err(NetworkError::InvalidInstallation {
                ags: spec.ags.clone(),
                unit: spec.unit.clone(),
                what: "municipality has no district-heating network".to_string(),
            });
        }
        let peak = peak_thermal_load(region, scenario, &spec.ags, dh_share)?;
        build_installation(builder, region, scenario, spec, peak)?;
    }
    Ok(())
}

fn build_installation(
    builder: &mut NetworkBuilder,
    region: &Region,
    scenario: &Scenario,
    spec: &InstallationDef,
    peak_load_mw: f64,
) -> NetworkResult<()> {
    let commodity = scenario
        .commodity(&spec.fuel)
        .ok_or_else(|| NetworkError::UnknownCommodity {
            fuel: spec.fuel.clone(),
        })?;
    let nominal_th = spec.size_share * peak_load_mw;

    let unit = Label::DistrictInstallation {
        ags: spec.ags.clone(),
        unit: spec.unit.clone(),
    };
    builder.add_node(unit.clone(), NodeKind::Converter)?;

    let com = Label::Commodity {
        fuel: spec.fuel.clone(),
    };
    builder.ensure_node(com.clone(), NodeKind::Source);
    builder.add_flow(Flow::new(com, unit.clone()).cost(commodity.variable_cost));

    let mut heat_flow = Flow::new(
        unit.clone(),
        Label::DistrictHeatBus {
            ags: spec.ags.clone(),
            side: DistrictSide::In,
        },
    )
    .nominal(nominal_th)
    .efficiency(spec.efficiency_th);
    if !spec.maintenance_months.is_empty() {
        heat_flow = heat_flow.availability(maintenance_mask(
            region.time_grid(),
            &spec.maintenance_months,
            spec.maintenance_duration_months,
        ));
    }
    builder.add_flow(heat_flow);

    if spec.kind.has_electrical_output() {
        let efficiency_el = spec.efficiency_el.ok_or_else(|| {
            NetworkError::InvalidInstallation {
                ags: spec.ags.clone(),
                unit: spec.unit.clone(),
                what: "CHP unit without electrical efficiency".to_string(),
            }
        })?;
        let bus = primary_bus(region, &spec.ags)?;
        builder.add_flow(
            Flow::new(unit, Label::ElBus { bus }).efficiency(efficiency_el),
        );
    }

    Ok(())
}

/// Optional central thermal storage on the inbound district bus.
fn build_thermal_storage(
    builder: &mut NetworkBuilder,
    region: &Region,
    scenario: &Scenario,
    dh_shares: &IndexMap<Ags, f64>,
) -> NetworkResult<()> {
    let config = &scenario.storage.th_cen;
    if !config.enabled {
        return Ok(());
    }
    for municipality in region.municipalities() {
        let ags = &municipality.ags;
        if dh_shares.get(ags).copied().unwrap_or(0.0) <= 0.0 {
            continue;
        }
        let storage = Label::DistrictHeatStorage { ags: ags.clone() };
        builder.add_node(
            storage.clone(),
            NodeKind::Storage {
                capacity_mwh: config.capacity_mwh,
                power_charge_mw: config.power_mw,
                power_discharge_mw: config.power_mw,
                loss_rate: config.loss_rate,
                efficiency_in: config.efficiency_in,
                efficiency_out: config.efficiency_out,
            },
        )?;
        let bus_in = Label::DistrictHeatBus {
            ags: ags.clone(),
            side: DistrictSide::In,
        };
        builder.add_flow(Flow::new(bus_in.clone(), storage.clone()).nominal(config.power_mw));
        builder.add_flow(Flow::new(storage, bus_in).nominal(config.power_mw));
    }
    Ok(())
}

/// The municipality's first associated grid bus; deterministic because
/// bus import order is preserved.
pub(crate) fn primary_bus(region: &Region, ags: &Ags) -> NetworkResult<BusId> {
    region
        .topology()
        .buses_of(ags)
        .first()
        .map(|bus| bus.id)
        .ok_or_else(|| {
            RegionError::IncompleteMunicipality {
                ags: ags.clone(),
                what: "associated grid bus".to_string(),
            }
            .into()
        })
}
