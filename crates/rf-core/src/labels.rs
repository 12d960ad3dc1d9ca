//! Node-label grammar.
//!
//! Every node the network builder creates is identified by a structured
//! label; the result aggregation engine parses those labels back to group
//! raw solver columns. `encode` and `decode` are inverse functions and the
//! single definition of the grammar, so the round trip holds by
//! construction instead of by keeping format strings and patterns in sync.
//!
//! Labels are underscore-separated tokens with the category first. The
//! technology/fuel/unit field is always the terminal field and is joined
//! verbatim, so it may itself contain underscores (`fuel_oil`).

use core::fmt;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::keys::{Ags, BusId, LineId, Sector, TrafoId, VoltageLevel};

/// Side of a district-heating network bus pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DistrictSide {
    In,
    Out,
}

impl DistrictSide {
    pub fn token(self) -> &'static str {
        match self {
            DistrictSide::In => "in",
            DistrictSide::Out => "out",
        }
    }
}

/// Whether heat demand is served decentrally or by the district network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HeatMode {
    Dec,
    Cen,
}

impl HeatMode {
    pub fn token(self) -> &'static str {
        match self {
            HeatMode::Dec => "dec",
            HeatMode::Cen => "cen",
        }
    }
}

/// Battery storage class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BatteryKind {
    Large,
    Small,
}

impl BatteryKind {
    pub fn token(self) -> &'static str {
        match self {
            BatteryKind::Large => "large",
            BatteryKind::Small => "small",
        }
    }
}

/// Heat-pump technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HeatPumpKind {
    /// Air-source heat pump.
    Ashp,
    /// Ground-source heat pump.
    Gshp,
}

impl HeatPumpKind {
    pub fn token(self) -> &'static str {
        match self {
            HeatPumpKind::Ashp => "ashp",
            HeatPumpKind::Gshp => "gshp",
        }
    }
}

/// Structured identity of a flow-network node.
///
/// The encoded string is the only identity crossing the solver boundary;
/// see the module docs for the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    /// Electrical grid bus: `bus_el_b{bus}`.
    ElBus { bus: BusId },
    /// Shared import/export hub: `hub_el`.
    ElHub,
    /// Generator: `gen_el_{ags}_b{bus}_{tech}`.
    ElGenerator { ags: Ags, bus: BusId, tech: String },
    /// Electrical demand sink: `dem_el_{ags}_b{bus}_{sector}`.
    ElDemand { ags: Ags, bus: BusId, sector: Sector },
    /// External-grid excess sink: `exc_el_{level}_b{bus}`.
    ElExcess { level: VoltageLevel, bus: BusId },
    /// External-grid shortage source: `shp_el_{level}_b{bus}`.
    ElShortage { level: VoltageLevel, bus: BusId },
    /// Internal line link: `line_{id}`.
    LineLink { line: LineId },
    /// Voltage-step transformer link: `trafo_{id}`.
    TrafoLink { trafo: TrafoId },
    /// Boundary-bus interconnector to the hub: `tie_el_{level}_b{bus}`.
    Intertie { level: VoltageLevel, bus: BusId },
    /// Commodity source: `com_{fuel}`.
    Commodity { fuel: String },
    /// Decentral heat bus: `bus_th_dec_{ags}_{sector}`.
    DecHeatBus { ags: Ags, sector: Sector },
    /// District-heating bus: `bus_th_cen_{in|out}_{ags}`.
    DistrictHeatBus { ags: Ags, side: DistrictSide },
    /// Decentral heat generator: `gen_th_dec_{ags}_{sector}_{fuel}`.
    DecHeatGenerator {
        ags: Ags,
        sector: Sector,
        fuel: String,
    },
    /// Heat demand sink: `dem_th_{dec|cen}_{ags}_{sector}`.
    HeatDemand {
        ags: Ags,
        sector: Sector,
        mode: HeatMode,
    },
    /// District network in→out converter: `net_th_cen_{ags}`.
    DistrictNetwork { ags: Ags },
    /// District supply installation (CHP, boiler): `gen_th_cen_{ags}_{unit}`.
    DistrictInstallation { ags: Ags, unit: String },
    /// Central thermal storage: `stor_th_cen_{ags}`.
    DistrictHeatStorage { ags: Ags },
    /// Battery storage: `stor_el_{large|small}_{ags}_b{bus}`.
    Battery {
        kind: BatteryKind,
        ags: Ags,
        bus: BusId,
    },
    /// Decentral power-to-heat: `flex_dec_pth_{ags}_b{bus}_{sector}_{ashp|gshp}`.
    HeatPump {
        ags: Ags,
        bus: BusId,
        sector: Sector,
        kind: HeatPumpKind,
    },
    /// Central power-to-heat: `flex_cen_pth_{ags}`.
    CentralPth { ags: Ags },
    /// Demand-side-management node: `flex_dsm_{ags}_b{bus}`.
    Dsm { ags: Ags, bus: BusId },
}

impl Label {
    /// Render the label string.
    pub fn encode(&self) -> String {
        match self {
            Label::ElBus { bus } => format!("bus_el_b{bus}"),
            Label::ElHub => "hub_el".to_string(),
            Label::ElGenerator { ags, bus, tech } => format!("gen_el_{ags}_b{bus}_{tech}"),
            Label::ElDemand { ags, bus, sector } => {
                format!("dem_el_{ags}_b{bus}_{}", sector.token())
            }
            Label::ElExcess { level, bus } => format!("exc_el_{}_b{bus}", level.token()),
            Label::ElShortage { level, bus } => format!("shp_el_{}_b{bus}", level.token()),
            Label::LineLink { line } => format!("line_{line}"),
            Label::TrafoLink { trafo } => format!("trafo_{trafo}"),
            Label::Intertie { level, bus } => format!("tie_el_{}_b{bus}", level.token()),
            Label::Commodity { fuel } => format!("com_{fuel}"),
            Label::DecHeatBus { ags, sector } => {
                format!("bus_th_dec_{ags}_{}", sector.token())
            }
            Label::DistrictHeatBus { ags, side } => {
                format!("bus_th_cen_{}_{ags}", side.token())
            }
            Label::DecHeatGenerator { ags, sector, fuel } => {
                format!("gen_th_dec_{ags}_{}_{fuel}", sector.token())
            }
            Label::HeatDemand { ags, sector, mode } => {
                format!("dem_th_{}_{ags}_{}", mode.token(), sector.token())
            }
            Label::DistrictNetwork { ags } => format!("net_th_cen_{ags}"),
            Label::DistrictInstallation { ags, unit } => format!("gen_th_cen_{ags}_{unit}"),
            Label::DistrictHeatStorage { ags } => format!("stor_th_cen_{ags}"),
            Label::Battery { kind, ags, bus } => {
                format!("stor_el_{}_{ags}_b{bus}", kind.token())
            }
            Label::HeatPump {
                ags,
                bus,
                sector,
                kind,
            } => format!(
                "flex_dec_pth_{ags}_b{bus}_{}_{}",
                sector.token(),
                kind.token()
            ),
            Label::CentralPth { ags } => format!("flex_cen_pth_{ags}"),
            Label::Dsm { ags, bus } => format!("flex_dsm_{ags}_b{bus}"),
        }
    }

    /// Parse a label string back into its structured form.
    ///
    /// Returns `None` for anything the grammar does not produce; the
    /// aggregation engine treats such columns as not-matching rather than
    /// as errors.
    pub fn decode(s: &str) -> Option<Label> {
        let tokens: Vec<&str> = s.split('_').collect();
        match tokens.as_slice() {
            ["bus", "el", bus] => Some(Label::ElBus {
                bus: parse_bus(bus)?,
            }),
            ["hub", "el"] => Some(Label::ElHub),
            ["gen", "el", ags, bus, tech @ ..] => Some(Label::ElGenerator {
                ags: parse_ags(ags)?,
                bus: parse_bus(bus)?,
                tech: parse_tail(tech)?,
            }),
            ["dem", "el", ags, bus, sector] => Some(Label::ElDemand {
                ags: parse_ags(ags)?,
                bus: parse_bus(bus)?,
                sector: Sector::from_token(sector).ok()?,
            }),
            ["exc", "el", level, bus] => Some(Label::ElExcess {
                level: VoltageLevel::from_token(level).ok()?,
                bus: parse_bus(bus)?,
            }),
            ["shp", "el", level, bus] => Some(Label::ElShortage {
                level: VoltageLevel::from_token(level).ok()?,
                bus: parse_bus(bus)?,
            }),
            ["line", id] => Some(Label::LineLink {
                line: LineId(id.parse().ok()?),
            }),
            ["trafo", id] => Some(Label::TrafoLink {
                trafo: TrafoId(id.parse().ok()?),
            }),
            ["tie", "el", level, bus] => Some(Label::Intertie {
                level: VoltageLevel::from_token(level).ok()?,
                bus: parse_bus(bus)?,
            }),
            ["com", fuel @ ..] => Some(Label::Commodity {
                fuel: parse_tail(fuel)?,
            }),
            ["bus", "th", "dec", ags, sector] => Some(Label::DecHeatBus {
                ags: parse_ags(ags)?,
                sector: Sector::from_token(sector).ok()?,
            }),
            ["bus", "th", "cen", side, ags] => Some(Label::DistrictHeatBus {
                ags: parse_ags(ags)?,
                side: match *side {
                    "in" => DistrictSide::In,
                    "out" => DistrictSide::Out,
                    _ => return None,
                },
            }),
            ["gen", "th", "dec", ags, sector, fuel @ ..] => Some(Label::DecHeatGenerator {
                ags: parse_ags(ags)?,
                sector: Sector::from_token(sector).ok()?,
                fuel: parse_tail(fuel)?,
            }),
            ["dem", "th", mode, ags, sector] => Some(Label::HeatDemand {
                ags: parse_ags(ags)?,
                sector: Sector::from_token(sector).ok()?,
                mode: match *mode {
                    "dec" => HeatMode::Dec,
                    "cen" => HeatMode::Cen,
                    _ => return None,
                },
            }),
            ["net", "th", "cen", ags] => Some(Label::DistrictNetwork {
                ags: parse_ags(ags)?,
            }),
            ["gen", "th", "cen", ags, unit @ ..] => Some(Label::DistrictInstallation {
                ags: parse_ags(ags)?,
                unit: parse_tail(unit)?,
            }),
            ["stor", "th", "cen", ags] => Some(Label::DistrictHeatStorage {
                ags: parse_ags(ags)?,
            }),
            ["stor", "el", kind, ags, bus] => Some(Label::Battery {
                kind: match *kind {
                    "large" => BatteryKind::Large,
                    "small" => BatteryKind::Small,
                    _ => return None,
                },
                ags: parse_ags(ags)?,
                bus: parse_bus(bus)?,
            }),
            ["flex", "dec", "pth", ags, bus, sector, kind] => Some(Label::HeatPump {
                ags: parse_ags(ags)?,
                bus: parse_bus(bus)?,
                sector: Sector::from_token(sector).ok()?,
                kind: match *kind {
                    "ashp" => HeatPumpKind::Ashp,
                    "gshp" => HeatPumpKind::Gshp,
                    _ => return None,
                },
            }),
            ["flex", "cen", "pth", ags] => Some(Label::CentralPth {
                ags: parse_ags(ags)?,
            }),
            ["flex", "dsm", ags, bus] => Some(Label::Dsm {
                ags: parse_ags(ags)?,
                bus: parse_bus(bus)?,
            }),
            _ => None,
        }
    }

    /// The municipality this node belongs to, if it has one.
    pub fn ags(&self) -> Option<&Ags> {
        match self {
            Label::ElGenerator { ags, .. }
            | Label::ElDemand { ags, .. }
            | Label::DecHeatBus { ags, .. }
            | Label::DistrictHeatBus { ags, .. }
            | Label::DecHeatGenerator { ags, .. }
            | Label::HeatDemand { ags, .. }
            | Label::DistrictNetwork { ags }
            | Label::DistrictInstallation { ags, .. }
            | Label::DistrictHeatStorage { ags }
            | Label::Battery { ags, .. }
            | Label::HeatPump { ags, .. }
            | Label::CentralPth { ags }
            | Label::Dsm { ags, .. } => Some(ags),
            _ => None,
        }
    }
}

fn parse_ags(token: &str) -> Option<Ags> {
    Ags::new(token).ok()
}

/// Bus references are rendered as `b{id}`.
fn parse_bus(token: &str) -> Option<BusId> {
    let digits = token.strip_prefix('b')?;
    digits.parse().ok().map(BusId)
}

/// Terminal field: remaining tokens joined verbatim, must be non-empty.
fn parse_tail(tokens: &[&str]) -> Option<String> {
    if tokens.is_empty() || tokens.iter().any(|t| t.is_empty()) {
        return None;
    }
    Some(tokens.join("_"))
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Label::decode(&s).ok_or_else(|| de::Error::custom(format!("unparseable label: {s}")))
    }
}
