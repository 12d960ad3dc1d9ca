//! Flow-network data structures.
//!
//! The network is a list of labelled nodes and directed flows between
//! them. Profiles are aligned to the simulation time grid; the builder
//! checks lengths when the network is frozen, so the solver can rely on
//! every profile having exactly one value per step.

use indexmap::IndexMap;
use rf_core::{Label, TimeGrid};
use serde::{Deserialize, Serialize};

use crate::{NetworkError, NetworkResult};

/// Per-flow conversion: a constant efficiency or a per-step series
/// (e.g. a temperature-dependent COP).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Conversion {
    Fixed(f64),
    Profile(Vec<f64>),
}

impl Default for Conversion {
    fn default() -> Self {
        Conversion::Fixed(1.0)
    }
}

/// What a node is, beyond its label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// Balancing node; in- and outflows must match at every step.
    Bus,
    /// Injects energy; bounds and costs live on its outgoing flows.
    Source,
    /// Absorbs energy; a fixed demand carries its profile on the
    /// incoming flow.
    Sink,
    /// Converts between carriers or voltage levels; conversion factors
    /// live on its outgoing flows.
    Converter,
    /// Inter-temporal storage.
    Storage {
        capacity_mwh: f64,
        power_charge_mw: f64,
        power_discharge_mw: f64,
        /// Relative loss of stored energy per hour.
        loss_rate: f64,
        efficiency_in: f64,
        efficiency_out: f64,
    },
    /// Demand-side-management node: a fixed demand that the solver may
    /// shift within the up/down envelopes and the delay window.
    Dsm {
        demand_mw: Vec<f64>,
        capacity_up_mw: Vec<f64>,
        capacity_down_mw: Vec<f64>,
        shift_interval_hours: u32,
        delay_hours: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkNode {
    pub label: Label,
    pub kind: NodeKind,
}

/// A directed, capacity/cost/efficiency-annotated connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub from: Label,
    pub to: Label,
    /// Capacity bound in MW; `None` is unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nominal_mw: Option<f64>,
    /// Fixed per-step values (demand and feedin); the solver must take
    /// these as given rather than optimizing them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_profile: Option<Vec<f64>>,
    /// 0..1 availability mask scaling the nominal capacity per step
    /// (scheduled maintenance).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<Vec<f64>>,
    #[serde(default)]
    pub variable_cost: f64,
    #[serde(default)]
    pub conversion: Conversion,
}

impl Flow {
    pub fn new(from: Label, to: Label) -> Self {
        Flow {
            from,
            to,
            nominal_mw: None,
            fix_profile: None,
            availability: None,
            variable_cost: 0.0,
            conversion: Conversion::default(),
        }
    }

    pub fn nominal(mut self, mw: f64) -> Self {
        self.nominal_mw = Some(mw);
        self
    }

    pub fn fixed(mut self, profile: Vec<f64>) -> Self {
        self.fix_profile = Some(profile);
        self
    }

    pub fn availability(mut self, mask: Vec<f64>) -> Self {
        self.availability = Some(mask);
        self
    }

    pub fn cost(mut self, cost: f64) -> Self {
        self.variable_cost = cost;
        self
    }

    pub fn efficiency(mut self, factor: f64) -> Self {
        self.conversion = Conversion::Fixed(factor);
        self
    }

    pub fn efficiency_profile(mut self, series: Vec<f64>) -> Self {
        self.conversion = Conversion::Profile(series);
        self
    }
}

/// The frozen, validated network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyNetwork {
    nodes: IndexMap<Label, NetworkNode>,
    flows: Vec<Flow>,
    grid: TimeGrid,
}

impl EnergyNetwork {
    pub fn nodes(&self) -> impl Iterator<Item = &NetworkNode> {
        self.nodes.values()
    }

    pub fn node(&self, label: &Label) -> Option<&NetworkNode> {
        self.nodes.get(label)
    }

    pub fn contains(&self, label: &Label) -> bool {
        self.nodes.contains_key(label)
    }

    pub fn flows(&self) -> &[Flow] {
        &self.flows
    }

    pub fn flows_out_of<'a>(&'a self, label: &'a Label) -> impl Iterator<Item = &'a Flow> {
        self.flows.iter().filter(move |f| &f.from == label)
    }

    pub fn flows_into<'a>(&'a self, label: &'a Label) -> impl Iterator<Item = &'a Flow> {
        self.flows.iter().filter(move |f| &f.to == label)
    }

    pub fn time_grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_flows(&self) -> usize {
        self.flows.len()
    }
}

/// Incremental builder; `freeze` validates and produces the immutable
/// [`EnergyNetwork`].
#[derive(Debug)]
pub struct NetworkBuilder {
    nodes: IndexMap<Label, NetworkNode>,
    flows: Vec<Flow>,
    grid: TimeGrid,
}

impl NetworkBuilder {
    pub fn new(grid: TimeGrid) -> Self {
        NetworkBuilder {
            nodes: IndexMap::new(),
            flows: Vec::new(),
            grid,
        }
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn contains(&self, label: &Label) -> bool {
        self.nodes.contains_key(label)
    }

    pub fn add_node(&mut self, label: Label, kind: NodeKind) -> NetworkResult<()> {
        if self.nodes.contains_key(&label) {
            return Err(NetworkError::DuplicateLabel { label });
        }
        self.nodes.insert(label.clone(), NetworkNode { label, kind });
        Ok(())
    }

    /// Add a node that several build steps may legitimately request
    /// (commodity sources, the hub); the first wins.
    pub fn ensure_node(&mut self, label: Label, kind: NodeKind) {
        self.nodes
            .entry(label.clone())
            .or_insert(NetworkNode { label, kind });
    }

    pub fn add_flow(&mut self, flow: Flow) {
        self.flows.push(flow);
    }

    /// Validate endpoints and profile lengths, then freeze.
    pub fn freeze(self) -> NetworkResult<EnergyNetwork> {
        let expected = self.grid.len();
        for flow in &self.flows {
            for (endpoint, label) in [("from", &flow.from), ("to", &flow.to)] {
                if !self.nodes.contains_key(label) {
                    return Err(NetworkError::DanglingFlow {
                        label: label.clone(),
                        endpoint,
                    });
                }
            }
            for profile in [&flow.fix_profile, &flow.availability] {
                if let Some(values) = profile {
                    if values.len() != expected {
                        return Err(NetworkError::ProfileLength {
                            label: flow.from.clone(),
                            len: values.len(),
                            expected,
                        });
                    }
                }
            }
            if let Conversion::Profile(values) = &flow.conversion {
                if values.len() != expected {
                    return Err(NetworkError::ProfileLength {
                        label: flow.from.clone(),
                        len: values.len(),
                        expected,
                    });
                }
            }
        }
        for node in self.nodes.values() {
            if let NodeKind::Dsm {
                demand_mw,
                capacity_up_mw,
                capacity_down_mw,
                ..
            } = &node.kind
            {
                for len in [demand_mw.len(), capacity_up_mw.len(), capacity_down_mw.len()] {
                    if len != expected {
                        return Err(NetworkError::ProfileLength {
                            label: node.label.clone(),
                            len,
                            expected,
                        });
                    }
                }
            }
        }
        Ok(EnergyNetwork {
            nodes: self.nodes,
            flows: self.flows,
            grid: self.grid,
        })
    }
}
