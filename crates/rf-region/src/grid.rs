//! Grid topology: buses, lines, transformers.
//!
//! Imported once and immutable afterwards. A petgraph undirected graph
//! over the buses answers the attachment queries the network builder
//! needs, in particular which line or transformer hangs off a boundary
//! bus when sizing the import/export interconnector.

use indexmap::IndexMap;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use rf_core::{Ags, BusId, LineId, TrafoId, VoltageLevel};

use crate::tables::{BusRow, LineRow, TrafoRow};
use crate::{RegionError, RegionResult};

#[derive(Debug, Clone)]
pub struct Bus {
    pub id: BusId,
    pub v_nom_kv: f64,
    pub region: bool,
    pub ags: Option<Ags>,
}

impl Bus {
    pub fn voltage_level(&self) -> VoltageLevel {
        VoltageLevel::from_nominal_kv(self.v_nom_kv)
    }
}

#[derive(Debug, Clone)]
pub struct Line {
    pub id: LineId,
    pub bus0: BusId,
    pub bus1: BusId,
    pub capacity_mva: f64,
    pub length_km: f64,
}

#[derive(Debug, Clone)]
pub struct Trafo {
    pub id: TrafoId,
    pub bus0: BusId,
    pub bus1: BusId,
    pub capacity_mva: f64,
}

/// An edge in the bus graph: the attached element and its capacity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Attachment {
    Line { id: LineId, capacity_mva: f64 },
    Trafo { id: TrafoId, capacity_mva: f64 },
}

impl Attachment {
    pub fn capacity_mva(&self) -> f64 {
        match self {
            Attachment::Line { capacity_mva, .. } => *capacity_mva,
            Attachment::Trafo { capacity_mva, .. } => *capacity_mva,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GridTopology {
    buses: IndexMap<BusId, Bus>,
    lines: Vec<Line>,
    trafos: Vec<Trafo>,
    graph: UnGraph<BusId, Attachment>,
    node_of: IndexMap<BusId, NodeIndex>,
}

impl GridTopology {
    pub fn build(
        bus_rows: &[BusRow],
        line_rows: &[LineRow],
        trafo_rows: &[TrafoRow],
    ) -> RegionResult<Self> {
        let mut buses = IndexMap::new();
        let mut graph = UnGraph::new_undirected();
        let mut node_of = IndexMap::new();

        for row in bus_rows {
            let id = BusId(row.id);
            if buses
                .insert(
                    id,
                    Bus {
                        id,
                        v_nom_kv: row.v_nom_kv,
                        region: row.region,
                        ags: row.ags.clone(),
                    },
                )
                .is_some()
            {
                return Err(RegionError::InvalidInput {
                    what: format!("duplicate bus id {}", row.id),
                });
            }
            node_of.insert(id, graph.add_node(id));
        }

        let node = |node_of: &IndexMap<BusId, NodeIndex>, bus: u32, context: &str| {
            node_of
                .get(&BusId(bus))
                .copied()
                .ok_or_else(|| RegionError::UnknownBus {
                    bus,
                    context: context.to_string(),
                })
        };

        let mut lines = Vec::with_capacity(line_rows.len());
        for row in line_rows {
            let a = node(&node_of, row.bus0, &format!("line {}", row.id))?;
            let b = node(&node_of, row.bus1, &format!("line {}", row.id))?;
            graph.add_edge(
                a,
                b,
                Attachment::Line {
                    id: LineId(row.id),
                    capacity_mva: row.capacity_mva,
                },
            );
            lines.push(Line {
                id: LineId(row.id),
                bus0: BusId(row.bus0),
                bus1: BusId(row.bus1),
                capacity_mva: row.capacity_mva,
                length_km: row.length_km,
            });
        }

        let mut trafos = Vec::with_capacity(trafo_rows.len());
        for row in trafo_rows {
            let a = node(&node_of, row.bus0, &format!("trafo {}", row.id))?;
            let b = node(&node_of, row.bus1, &format!("trafo {}", row.id))?;
            graph.add_edge(
                a,
                b,
                Attachment::Trafo {
                    id: TrafoId(row.id),
                    capacity_mva: row.capacity_mva,
                },
            );
            trafos.push(Trafo {
                id: TrafoId(row.id),
                bus0: BusId(row.bus0),
                bus1: BusId(row.bus1),
                capacity_mva: row.capacity_mva,
            });
        }

        Ok(GridTopology {
            buses,
            lines,
            trafos,
            graph,
            node_of,
        })
    }

    pub fn buses(&self) -> impl Iterator<Item = &Bus> {
        self.buses.values()
    }

    pub fn bus(&self, id: BusId) -> Option<&Bus> {
        self.buses.get(&id)
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn trafos(&self) -> &[Trafo] {
        &self.trafos
    }

    pub fn region_buses(&self) -> impl Iterator<Item = &Bus> {
        self.buses.values().filter(|b| b.region)
    }

    pub fn boundary_buses(&self) -> impl Iterator<Item = &Bus> {
        self.buses.values().filter(|b| !b.region)
    }

    /// Buses associated with a municipality.
    pub fn buses_of(&self, ags: &Ags) -> Vec<&Bus> {
        self.buses
            .values()
            .filter(|b| b.ags.as_ref() == Some(ags))
            .collect()
    }

    /// All lines/transformers incident to a bus.
    pub fn attachments(&self, bus: BusId) -> Vec<Attachment> {
        let Some(&node) = self.node_of.get(&bus) else {
            return Vec::new();
        };
        self.graph.edges(node).map(|e| *e.weight()).collect()
    }

    /// Capacity of the strongest line or transformer attached to a bus,
    /// if any is attached at all.
    pub fn attached_capacity_mva(&self, bus: BusId) -> Option<f64> {
        self.attachments(bus)
            .into_iter()
            .map(|a| a.capacity_mva())
            .fold(None, |acc, c| Some(acc.map_or(c, |m: f64| m.max(c))))
    }
}
