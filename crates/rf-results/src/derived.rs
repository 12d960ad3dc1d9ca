//! Derived indicators, computed as a second pass over already-aggregated
//! tables.

use indexmap::IndexMap;

use crate::types::AggregatedTable;

/// Net demand after demand-side management: baseline DSM demand plus
/// up-shift activation minus down-shift activation, per group.
pub fn net_demand_after_dsm(
    dsm_demand: &AggregatedTable,
    dsm_up: &AggregatedTable,
    dsm_down: &AggregatedTable,
) -> AggregatedTable {
    let mut net = AggregatedTable::new();
    for (group, demand) in dsm_demand.groups() {
        let mut values = demand.to_vec();
        if let Some(up) = dsm_up.group(group) {
            for (v, u) in values.iter_mut().zip(up) {
                *v += u;
            }
        }
        if let Some(down) = dsm_down.group(group) {
            for (v, d) in values.iter_mut().zip(down) {
                *v -= d;
            }
        }
        net.add_into(group, &values);
    }
    net
}

/// Ratio of generated to consumed energy per group (e.g. municipality)
/// over the whole range. Groups without demand are omitted.
pub fn autarky_by_group(
    generation: &AggregatedTable,
    demand: &AggregatedTable,
) -> IndexMap<String, f64> {
    let generation_totals = generation.totals();
    demand
        .totals()
        .into_iter()
        .filter(|(_, consumed)| *consumed > 0.0)
        .map(|(group, consumed)| {
            let produced = generation_totals.get(&group).copied().unwrap_or(0.0);
            (group, produced / consumed)
        })
        .collect()
}

/// Per-step transport losses: total flow into grid links minus total
/// flow out of them.
pub fn grid_losses(inflow: &AggregatedTable, outflow: &AggregatedTable) -> Vec<f64> {
    let mut losses = sum_groups(inflow);
    for (loss, out) in losses.iter_mut().zip(sum_groups(outflow)) {
        *loss -= out;
    }
    losses
}

fn sum_groups(table: &AggregatedTable) -> Vec<f64> {
    let mut sums: Vec<f64> = Vec::new();
    for (_, values) in table.groups() {
        if sums.is_empty() {
            sums = values.to_vec();
        } else {
            for (sum, value) in sums.iter_mut().zip(values) {
                *sum += value;
            }
        }
    }
    sums
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn net_demand_applies_shift_deltas() {
        let mut demand = AggregatedTable::new();
        demand.add_into("15001000", &[10.0, 10.0, 10.0]);
        let mut up = AggregatedTable::new();
        up.add_into("15001000", &[1.0, 0.0, 0.0]);
        let mut down = AggregatedTable::new();
        down.add_into("15001000", &[0.0, 1.0, 0.0]);

        let net = net_demand_after_dsm(&demand, &up, &down);
        assert_eq!(net.group("15001000").unwrap(), &[11.0, 9.0, 10.0]);
    }

    #[test]
    fn autarky_ignores_groups_without_demand() {
        let mut generation = AggregatedTable::new();
        generation.add_into("a", &[5.0]);
        generation.add_into("b", &[2.0]);
        let mut demand = AggregatedTable::new();
        demand.add_into("a", &[10.0]);

        let autarky = autarky_by_group(&generation, &demand);
        assert_eq!(autarky.len(), 1);
        assert!((autarky["a"] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn losses_are_in_minus_out() {
        let mut inflow = AggregatedTable::new();
        inflow.add_into("line_1", &[10.0, 10.0]);
        let mut outflow = AggregatedTable::new();
        outflow.add_into("line_1", &[9.8, 9.8]);
        let losses = grid_losses(&inflow, &outflow);
        assert!((losses[0] - 0.2).abs() < 1e-12);
    }
}
