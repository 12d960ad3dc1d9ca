//! Network assembly entry point.

use rf_core::Sector;
use rf_region::Region;
use rf_scenario::Scenario;
use tracing::info;

use crate::model::{EnergyNetwork, NetworkBuilder};
use crate::{electrical, flexibility, thermal, NetworkResult};

/// Build the complete flow network for one scenario run.
///
/// Phases run in order — electrical, thermal, flexibility — because the
/// later phases attach to nodes the earlier ones create. Any failure
/// aborts the build; no partial network escapes.
pub fn build_network(region: &Region, scenario: &Scenario) -> NetworkResult<EnergyNetwork> {
    let mut builder = NetworkBuilder::new(region.time_grid().clone());

    electrical::build(&mut builder, region, scenario)?;
    thermal::build(&mut builder, region, scenario)?;
    flexibility::build(&mut builder, region, scenario)?;

    let network = builder.freeze()?;
    info!(
        nodes = network.num_nodes(),
        flows = network.num_flows(),
        scenario = %scenario.general.name,
        "network constructed"
    );
    Ok(network)
}

/// Whether a sector's plain demand sink is replaced by a DSM node.
///
/// The electrical phase skips the sink and the flexibility phase creates
/// the DSM node based on this single predicate, so exactly one of the two
/// exists per (municipality, sector).
pub(crate) fn dsm_managed(scenario: &Scenario, sector: Sector) -> bool {
    scenario.flexopt.dsm.enabled && scenario.flexopt.dsm.sectors.contains(&sector)
}
