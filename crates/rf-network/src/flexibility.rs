//! Flexibility phase: batteries, decentral and central power-to-heat,
//! and household demand-side management.

use indexmap::IndexMap;
use rf_core::{Ags, BatteryKind, BusId, DistrictSide, HeatPumpKind, Label, Sector};
use rf_region::{Region, RegionError};
use rf_scenario::{BatteryDef, Scenario};

use crate::builder::dsm_managed;
use crate::calc::{calc_cop, dsm_capacity_down, dsm_capacity_up, CopPolicy};
use crate::model::{Flow, NetworkBuilder, NodeKind};
use crate::thermal::primary_bus;
use crate::NetworkResult;

pub(crate) fn build(
    builder: &mut NetworkBuilder,
    region: &Region,
    scenario: &Scenario,
) -> NetworkResult<()> {
    let flexopt = &scenario.flexopt;

    if flexopt.batteries_large.enabled {
        build_batteries(builder, region, &flexopt.batteries_large, BatteryKind::Large)?;
    }
    if flexopt.batteries_small.enabled {
        build_batteries(builder, region, &flexopt.batteries_small, BatteryKind::Small)?;
    }
    if flexopt.dec_pth.enabled {
        build_dec_pth(builder, region, scenario)?;
    }
    if flexopt.cen_pth.enabled {
        build_cen_pth(builder, region, scenario)?;
    }
    if flexopt.dsm.enabled {
        build_dsm(builder, region, scenario)?;
    }

    Ok(())
}

/// Battery storages at every grid bus of every municipality; the
/// municipality's allocation splits evenly across its buses.
fn build_batteries(
    builder: &mut NetworkBuilder,
    region: &Region,
    config: &BatteryDef,
    kind: BatteryKind,
) -> NetworkResult<()> {
    let allocation = region.battery_allocation(config.capacity_total_mwh, config.distribution)?;
    for municipality in region.municipalities() {
        let ags = &municipality.ags;
        let Some(total) = allocation.get(ags) else {
            continue;
        };
        let buses = region.topology().buses_of(ags);
        let capacity = total / buses.len() as f64;
        let power = capacity * config.c_rate;
        for bus in buses {
            let label = Label::Battery {
                kind,
                ags: ags.clone(),
                bus: bus.id,
            };
            builder.add_node(
                label.clone(),
                NodeKind::Storage {
                    capacity_mwh: capacity,
                    power_charge_mw: power,
                    power_discharge_mw: power,
                    loss_rate: config.loss_rate,
                    efficiency_in: config.efficiency_in,
                    efficiency_out: config.efficiency_out,
                },
            )?;
            let bus_label = Label::ElBus { bus: bus.id };
            builder.add_flow(Flow::new(bus_label.clone(), label.clone()).nominal(power));
            builder.add_flow(Flow::new(label, bus_label).nominal(power));
        }
    }
    Ok(())
}

/// Decentral power-to-heat: air- and ground-source heat pumps per
/// (municipality, bus, sector), with temperature-dependent COP and the
/// total nominal capacity split by technology share and evenly across
/// the created units.
fn build_dec_pth(
    builder: &mut NetworkBuilder,
    region: &Region,
    scenario: &Scenario,
) -> NetworkResult<()> {
    let config = &scenario.flexopt.dec_pth;
    let policy = CopPolicy::from((config.cop_policy, config.max_cop));

    // target sites: every (ags, bus, sector) whose decentral heat bus
    // exists; counted first so the capacity split is known
    let mut sites: Vec<(Ags, BusId, Sector)> = Vec::new();
    for municipality in region.municipalities() {
        for sector in &scenario.demand.heat_sectors {
            let heat_bus = Label::DecHeatBus {
                ags: municipality.ags.clone(),
                sector: *sector,
            };
            if !builder.contains(&heat_bus) {
                continue;
            }
            for bus in region.topology().buses_of(&municipality.ags) {
                sites.push((municipality.ags.clone(), bus.id, *sector));
            }
        }
    }
    if sites.is_empty() {
        return Ok(());
    }
    let per_site = 1.0 / sites.len() as f64;

    let mut cop_cache: IndexMap<(Ags, HeatPumpKind), Vec<f64>> = IndexMap::new();
    for (ags, bus, sector) in sites {
        for (kind, share, quality_grade) in [
            (HeatPumpKind::Ashp, config.ashp_share, config.quality_grade_air),
            (HeatPumpKind::Gshp, config.gshp_share, config.quality_grade_soil),
        ] {
            if share <= 0.0 {
                continue;
            }
            let cop = match cop_cache.get(&(ags.clone(), kind)) {
                Some(cop) => cop.clone(),
                None => {
                    let table = match kind {
                        HeatPumpKind::Ashp => region.temperature_air(),
                        HeatPumpKind::Gshp => region.temperature_soil(),
                    };
                    let temperatures =
                        table.column(&ags).ok_or_else(|| RegionError::MissingColumn {
                            ags: ags.clone(),
                            table: match kind {
                                HeatPumpKind::Ashp => "temperature/air".to_string(),
                                HeatPumpKind::Gshp => "temperature/soil".to_string(),
                            },
                        })?;
                    let cop = calc_cop(
                        config.flow_temperature_c,
                        temperatures,
                        quality_grade,
                        policy,
                    )?;
                    cop_cache.insert((ags.clone(), kind), cop.clone());
                    cop
                }
            };

            let label = Label::HeatPump {
                ags: ags.clone(),
                bus,
                sector,
                kind,
            };
            builder.add_node(label.clone(), NodeKind::Converter)?;
            builder.add_flow(Flow::new(Label::ElBus { bus }, label.clone()));
            builder.add_flow(
                Flow::new(
                    label,
                    Label::DecHeatBus {
                        ags: ags.clone(),
                        sector,
                    },
                )
                .nominal(config.nom_capacity_total_mw * share * per_site)
                .efficiency_profile(cop),
            );
        }
    }
    Ok(())
}

/// Central power-to-heat into the district-heating inbound bus, only
/// where that bus exists.
fn build_cen_pth(
    builder: &mut NetworkBuilder,
    region: &Region,
    scenario: &Scenario,
) -> NetworkResult<()> {
    let config = &scenario.flexopt.cen_pth;
    for municipality in region.municipalities() {
        let ags = &municipality.ags;
        let bus_in = Label::DistrictHeatBus {
            ags: ags.clone(),
            side: DistrictSide::In,
        };
        if !builder.contains(&bus_in) {
            continue;
        }
        let label = Label::CentralPth { ags: ags.clone() };
        builder.add_node(label.clone(), NodeKind::Converter)?;
        let bus = primary_bus(region, ags)?;
        builder.add_flow(Flow::new(Label::ElBus { bus }, label.clone()));
        builder.add_flow(
            Flow::new(label, bus_in)
                .nominal(config.nom_capacity_mw)
                .efficiency(config.efficiency),
        );
    }
    Ok(())
}

/// Demand-side-management nodes replacing the plain household sinks,
/// parametrized by the fixed demand profile and the up/down capacity
/// envelopes from the flexibility time series.
fn build_dsm(
    builder: &mut NetworkBuilder,
    region: &Region,
    scenario: &Scenario,
) -> NetworkResult<()> {
    let config = &scenario.flexopt.dsm;
    for sector in &config.sectors {
        if !dsm_managed(scenario, *sector) {
            continue;
        }
        let table = region.demand_el(*sector)?;
        for municipality in region.municipalities() {
            let ags = &municipality.ags;
            let Some(demand) = table.column(ags) else {
                continue;
            };
            let up = dsm_capacity_up(region, ags, config.mode)?;
            let down = dsm_capacity_down(region, ags, config.mode)?;

            let buses = region.topology().buses_of(ags);
            let bus_share = 1.0 / buses.len() as f64;
            for bus in buses {
                let label = Label::Dsm {
                    ags: ags.clone(),
                    bus: bus.id,
                };
                builder.add_node(
                    label.clone(),
                    NodeKind::Dsm {
                        demand_mw: demand.iter().map(|v| v * bus_share).collect(),
                        capacity_up_mw: up.iter().map(|v| v * bus_share).collect(),
                        capacity_down_mw: down.iter().map(|v| v * bus_share).collect(),
                        shift_interval_hours: config.shift_interval_hours,
                        delay_hours: config.delay_hours,
                    },
                )?;
                builder.add_flow(Flow::new(Label::ElBus { bus: bus.id }, label));
            }
        }
    }
    Ok(())
}
