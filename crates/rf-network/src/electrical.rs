//! Electrical phase: grid buses, generators, demand sinks, lines,
//! transformers and the external-grid boundary.

use rf_core::Label;
use rf_region::Region;
use rf_scenario::Scenario;

use crate::builder::dsm_managed;
use crate::model::{Flow, NetworkBuilder, NodeKind};
use crate::{NetworkError, NetworkResult};

pub(crate) fn build(
    builder: &mut NetworkBuilder,
    region: &Region,
    scenario: &Scenario,
) -> NetworkResult<()> {
    let topology = region.topology();

    for bus in topology.buses() {
        builder.add_node(Label::ElBus { bus: bus.id }, NodeKind::Bus)?;
    }
    builder.add_node(Label::ElHub, NodeKind::Bus)?;

    build_generators(builder, region, scenario)?;
    build_demand_sinks(builder, region, scenario)?;
    build_links(builder, region, scenario)?;
    build_boundary(builder, region, scenario)?;

    Ok(())
}

/// One source per (municipality, connected bus, technology) with a
/// strictly positive feedin sum. Zero-sum generators are omitted rather
/// than created with zero capacity.
fn build_generators(
    builder: &mut NetworkBuilder,
    region: &Region,
    scenario: &Scenario,
) -> NetworkResult<()> {
    for municipality in region.municipalities() {
        let buses = region.topology().buses_of(&municipality.ags);
        let bus_share = 1.0 / buses.len() as f64;
        for technology in &scenario.generation.technologies {
            let table = region.feedin(technology)?;
            if table.column_sum(&municipality.ags) <= 0.0 {
                continue;
            }
            let profile = table
                .scaled_column(&municipality.ags, bus_share)
                .expect("positive column sum implies the column exists");
            for bus in &buses {
                let label = Label::ElGenerator {
                    ags: municipality.ags.clone(),
                    bus: bus.id,
                    tech: technology.clone(),
                };
                builder.add_node(label.clone(), NodeKind::Source)?;
                builder.add_flow(
                    Flow::new(label, Label::ElBus { bus: bus.id }).fixed(profile.clone()),
                );
            }
        }
    }
    Ok(())
}

/// One sink per (municipality, connected bus, sector), unless the sector
/// is claimed by demand-side management — then the flexibility phase
/// creates the DSM node instead.
fn build_demand_sinks(
    builder: &mut NetworkBuilder,
    region: &Region,
    scenario: &Scenario,
) -> NetworkResult<()> {
    for municipality in region.municipalities() {
        let buses = region.topology().buses_of(&municipality.ags);
        let bus_share = 1.0 / buses.len() as f64;
        for sector in &scenario.demand.sectors {
            if dsm_managed(scenario, *sector) {
                continue;
            }
            let table = region.demand_el(*sector)?;
            let Some(profile) = table.scaled_column(&municipality.ags, bus_share) else {
                continue;
            };
            for bus in &buses {
                let label = Label::ElDemand {
                    ags: municipality.ags.clone(),
                    bus: bus.id,
                    sector: *sector,
                };
                builder.add_node(label.clone(), NodeKind::Sink)?;
                builder.add_flow(
                    Flow::new(Label::ElBus { bus: bus.id }, label).fixed(profile.clone()),
                );
            }
        }
    }
    Ok(())
}

/// Bidirectional lossy links for internal lines and voltage-step
/// transformers.
fn build_links(
    builder: &mut NetworkBuilder,
    region: &Region,
    scenario: &Scenario,
) -> NetworkResult<()> {
    let topology = region.topology();

    for line in topology.lines() {
        let label = Label::LineLink { line: line.id };
        builder.add_node(label.clone(), NodeKind::Converter)?;
        add_link_flows(
            builder,
            &label,
            Label::ElBus { bus: line.bus0 },
            Label::ElBus { bus: line.bus1 },
            line.capacity_mva,
            scenario.grid.line_efficiency,
        );
    }

    for trafo in topology.trafos() {
        let label = Label::TrafoLink { trafo: trafo.id };
        builder.add_node(label.clone(), NodeKind::Converter)?;
        add_link_flows(
            builder,
            &label,
            Label::ElBus { bus: trafo.bus0 },
            Label::ElBus { bus: trafo.bus1 },
            trafo.capacity_mva,
            scenario.grid.trafo_conversion_factor,
        );
    }

    Ok(())
}

/// Four flows through a link node: in and out for each direction, with
/// the conversion applied on the outgoing side.
fn add_link_flows(
    builder: &mut NetworkBuilder,
    link: &Label,
    a: Label,
    b: Label,
    capacity_mw: f64,
    efficiency: f64,
) {
    builder.add_flow(Flow::new(a.clone(), link.clone()).nominal(capacity_mw));
    builder.add_flow(
        Flow::new(link.clone(), b.clone())
            .nominal(capacity_mw)
            .efficiency(efficiency),
    );
    builder.add_flow(Flow::new(b, link.clone()).nominal(capacity_mw));
    builder.add_flow(
        Flow::new(link.clone(), a)
            .nominal(capacity_mw)
            .efficiency(efficiency),
    );
}

/// External grid: per boundary bus an excess sink and a shortage source
/// split by voltage level, plus a lossy bidirectional interconnector to
/// the shared import/export hub, sized from the attached line or
/// transformer. A boundary bus without an attachment is a structural
/// error.
fn build_boundary(
    builder: &mut NetworkBuilder,
    region: &Region,
    scenario: &Scenario,
) -> NetworkResult<()> {
    let topology = region.topology();
    let grid_cfg = &scenario.grid;

    for bus in topology.boundary_buses() {
        let level = bus.voltage_level();
        let bus_label = Label::ElBus { bus: bus.id };

        let excess = Label::ElExcess {
            level,
            bus: bus.id,
        };
        builder.add_node(excess.clone(), NodeKind::Sink)?;
        builder.add_flow(Flow::new(bus_label.clone(), excess).cost(grid_cfg.excess_cost));

        let shortage = Label::ElShortage {
            level,
            bus: bus.id,
        };
        builder.add_node(shortage.clone(), NodeKind::Source)?;
        builder.add_flow(Flow::new(shortage, bus_label.clone()).cost(grid_cfg.shortage_cost));

        let attached = topology
            .attached_capacity_mva(bus.id)
            .ok_or(NetworkError::UnattachedBoundaryBus { bus: bus.id })?;
        let capacity = attached * grid_cfg.max_usable_capacity_factor;

        let tie = Label::Intertie {
            level,
            bus: bus.id,
        };
        builder.add_node(tie.clone(), NodeKind::Converter)?;
        // export direction
        builder.add_flow(Flow::new(bus_label.clone(), tie.clone()).nominal(capacity));
        builder.add_flow(
            Flow::new(tie.clone(), Label::ElHub)
                .nominal(capacity)
                .efficiency(grid_cfg.line_efficiency)
                .cost(grid_cfg.export_cost),
        );
        // import direction
        builder.add_flow(
            Flow::new(Label::ElHub, tie.clone())
                .nominal(capacity)
                .cost(grid_cfg.import_cost),
        );
        builder.add_flow(
            Flow::new(tie, bus_label)
                .nominal(capacity)
                .efficiency(grid_cfg.line_efficiency),
        );
    }

    Ok(())
}
