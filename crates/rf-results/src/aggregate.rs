//! Pattern-based aggregation rules and the folding engine.
//!
//! A rule is a (name, pattern, group-key) triple: the pattern selects
//! columns by their decoded label (and optionally the opposite flow
//! endpoint), the group key names the label field whose value becomes
//! the output group. Columns that do not match a rule are skipped for
//! that rule — the catalogue is deliberately selective. Only when every
//! rule comes back empty is a warning emitted, since that usually means
//! the label format drifted.

use indexmap::IndexMap;
use rf_core::{BatteryKind, DistrictSide, HeatMode, Label};
use rf_solver::{FlowResults, StateVar};
use tracing::warn;

use crate::types::AggregatedTable;

/// Which end of a flow a rule's pattern applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    From,
    To,
}

/// Label-family matcher over decoded labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelPattern {
    ElGenerator,
    ElDemand,
    ElBus,
    ElHub,
    Intertie,
    LineLink,
    TrafoLink,
    DecHeatGenerator,
    DistrictInstallation,
    DistrictHeatBus(Option<DistrictSide>),
    HeatDemand(Option<HeatMode>),
    HeatPump,
    Battery(Option<BatteryKind>),
    DistrictHeatStorage,
    CentralPth,
    Dsm,
}

impl LabelPattern {
    pub fn matches(&self, label: &Label) -> bool {
        match (self, label) {
            (LabelPattern::ElGenerator, Label::ElGenerator { .. }) => true,
            (LabelPattern::ElDemand, Label::ElDemand { .. }) => true,
            (LabelPattern::ElBus, Label::ElBus { .. }) => true,
            (LabelPattern::ElHub, Label::ElHub) => true,
            (LabelPattern::Intertie, Label::Intertie { .. }) => true,
            (LabelPattern::LineLink, Label::LineLink { .. }) => true,
            (LabelPattern::TrafoLink, Label::TrafoLink { .. }) => true,
            (LabelPattern::DecHeatGenerator, Label::DecHeatGenerator { .. }) => true,
            (LabelPattern::DistrictInstallation, Label::DistrictInstallation { .. }) => true,
            (LabelPattern::DistrictHeatBus(want), Label::DistrictHeatBus { side, .. }) => {
                want.map_or(true, |w| w == *side)
            }
            (LabelPattern::HeatDemand(want), Label::HeatDemand { mode, .. }) => {
                want.map_or(true, |w| w == *mode)
            }
            (LabelPattern::HeatPump, Label::HeatPump { .. }) => true,
            (LabelPattern::Battery(want), Label::Battery { kind, .. }) => {
                want.map_or(true, |w| w == *kind)
            }
            (LabelPattern::DistrictHeatStorage, Label::DistrictHeatStorage { .. }) => true,
            (LabelPattern::CentralPth, Label::CentralPth { .. }) => true,
            (LabelPattern::Dsm, Label::Dsm { .. }) => true,
            _ => false,
        }
    }
}

/// Which decoded label field becomes the output group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    Technology,
    Municipality,
    Sector,
    Fuel,
    Unit,
    Level,
}

/// Extract the group value from a label, if the label carries that field.
pub fn extract(label: &Label, key: GroupKey) -> Option<String> {
    match key {
        GroupKey::Municipality => label.ags().map(|a| a.to_string()),
        GroupKey::Technology => match label {
            Label::ElGenerator { tech, .. } => Some(tech.clone()),
            Label::HeatPump { kind, .. } => Some(kind.token().to_string()),
            Label::Battery { kind, .. } => Some(kind.token().to_string()),
            _ => None,
        },
        GroupKey::Sector => match label {
            Label::ElDemand { sector, .. }
            | Label::HeatDemand { sector, .. }
            | Label::DecHeatBus { sector, .. }
            | Label::DecHeatGenerator { sector, .. } => Some(sector.token().to_string()),
            _ => None,
        },
        GroupKey::Fuel => match label {
            Label::DecHeatGenerator { fuel, .. } | Label::Commodity { fuel } => Some(fuel.clone()),
            _ => None,
        },
        GroupKey::Unit => match label {
            Label::DistrictInstallation { unit, .. } => Some(unit.clone()),
            // grid elements group by their full encoded identity
            Label::LineLink { .. } | Label::TrafoLink { .. } | Label::Intertie { .. } => {
                Some(label.encode())
            }
            _ => None,
        },
        GroupKey::Level => match label {
            Label::Intertie { level, .. }
            | Label::ElExcess { level, .. }
            | Label::ElShortage { level, .. } => Some(level.token().to_string()),
            _ => None,
        },
    }
}

/// Aggregation rule for flow series.
#[derive(Debug, Clone)]
pub struct AggregationRule {
    pub name: &'static str,
    /// Endpoint the pattern and group key apply to.
    pub endpoint: Endpoint,
    pub pattern: LabelPattern,
    /// Optional constraint on the opposite endpoint, for families whose
    /// flows fan out to more than one kind of bus (CHP electricity vs
    /// heat output, hub-side vs bus-side intertie flows).
    pub counterpart: Option<LabelPattern>,
    pub key: GroupKey,
}

/// Aggregation rule for state-variable series.
#[derive(Debug, Clone)]
pub struct StateRule {
    pub name: &'static str,
    pub pattern: LabelPattern,
    pub var: StateVar,
    pub key: GroupKey,
}

/// The fixed catalogue of flow aggregations.
pub fn standard_flow_rules() -> Vec<AggregationRule> {
    use Endpoint::{From, To};
    vec![
        AggregationRule {
            name: "generation_by_technology",
            endpoint: From,
            pattern: LabelPattern::ElGenerator,
            counterpart: None,
            key: GroupKey::Technology,
        },
        AggregationRule {
            name: "generation_by_municipality",
            endpoint: From,
            pattern: LabelPattern::ElGenerator,
            counterpart: None,
            key: GroupKey::Municipality,
        },
        AggregationRule {
            name: "demand_by_sector",
            endpoint: To,
            pattern: LabelPattern::ElDemand,
            counterpart: None,
            key: GroupKey::Sector,
        },
        AggregationRule {
            name: "demand_by_municipality",
            endpoint: To,
            pattern: LabelPattern::ElDemand,
            counterpart: None,
            key: GroupKey::Municipality,
        },
        AggregationRule {
            name: "import_by_level",
            endpoint: To,
            pattern: LabelPattern::Intertie,
            counterpart: Some(LabelPattern::ElHub),
            key: GroupKey::Level,
        },
        AggregationRule {
            name: "export_by_level",
            endpoint: From,
            pattern: LabelPattern::Intertie,
            counterpart: Some(LabelPattern::ElHub),
            key: GroupKey::Level,
        },
        AggregationRule {
            name: "line_inflow",
            endpoint: To,
            pattern: LabelPattern::LineLink,
            counterpart: None,
            key: GroupKey::Unit,
        },
        AggregationRule {
            name: "line_outflow",
            endpoint: From,
            pattern: LabelPattern::LineLink,
            counterpart: None,
            key: GroupKey::Unit,
        },
        AggregationRule {
            name: "heat_dec_by_fuel",
            endpoint: From,
            pattern: LabelPattern::DecHeatGenerator,
            counterpart: None,
            key: GroupKey::Fuel,
        },
        AggregationRule {
            name: "heat_cen_by_unit",
            endpoint: From,
            pattern: LabelPattern::DistrictInstallation,
            counterpart: Some(LabelPattern::DistrictHeatBus(Some(DistrictSide::In))),
            key: GroupKey::Unit,
        },
        AggregationRule {
            name: "chp_electricity_by_unit",
            endpoint: From,
            pattern: LabelPattern::DistrictInstallation,
            counterpart: Some(LabelPattern::ElBus),
            key: GroupKey::Unit,
        },
        AggregationRule {
            name: "heat_pump_by_kind",
            endpoint: From,
            pattern: LabelPattern::HeatPump,
            counterpart: None,
            key: GroupKey::Technology,
        },
        AggregationRule {
            name: "central_pth_by_municipality",
            endpoint: From,
            pattern: LabelPattern::CentralPth,
            counterpart: None,
            key: GroupKey::Municipality,
        },
        AggregationRule {
            name: "battery_charge_by_municipality",
            endpoint: To,
            pattern: LabelPattern::Battery(None),
            counterpart: None,
            key: GroupKey::Municipality,
        },
        AggregationRule {
            name: "battery_discharge_by_municipality",
            endpoint: From,
            pattern: LabelPattern::Battery(None),
            counterpart: None,
            key: GroupKey::Municipality,
        },
        AggregationRule {
            name: "dsm_demand_by_municipality",
            endpoint: To,
            pattern: LabelPattern::Dsm,
            counterpart: None,
            key: GroupKey::Municipality,
        },
    ]
}

/// The fixed catalogue of state-variable aggregations.
pub fn standard_state_rules() -> Vec<StateRule> {
    vec![
        StateRule {
            name: "battery_level_by_municipality",
            pattern: LabelPattern::Battery(None),
            var: StateVar::StorageLevel,
            key: GroupKey::Municipality,
        },
        StateRule {
            name: "thermal_storage_level_by_municipality",
            pattern: LabelPattern::DistrictHeatStorage,
            var: StateVar::StorageLevel,
            key: GroupKey::Municipality,
        },
        StateRule {
            name: "dsm_up_by_municipality",
            pattern: LabelPattern::Dsm,
            var: StateVar::DsmUp,
            key: GroupKey::Municipality,
        },
        StateRule {
            name: "dsm_down_by_municipality",
            pattern: LabelPattern::Dsm,
            var: StateVar::DsmDown,
            key: GroupKey::Municipality,
        },
    ]
}

/// Fold the flow series through the rule catalogue.
pub fn aggregate_flows(
    results: &FlowResults,
    rules: &[AggregationRule],
) -> IndexMap<String, AggregatedTable> {
    let mut tables: IndexMap<String, AggregatedTable> = IndexMap::new();
    for rule in rules {
        let mut table = AggregatedTable::new();
        for series in &results.flows {
            let (subject, counterpart) = match rule.endpoint {
                Endpoint::From => (&series.from, &series.to),
                Endpoint::To => (&series.to, &series.from),
            };
            if !rule.pattern.matches(subject) {
                continue;
            }
            if let Some(other) = &rule.counterpart {
                if !other.matches(counterpart) {
                    continue;
                }
            }
            let Some(group) = extract(subject, rule.key) else {
                continue;
            };
            table.add_into(&group, &series.values);
        }
        tables.insert(rule.name.to_string(), table);
    }
    if !results.flows.is_empty() && tables.values().all(AggregatedTable::is_empty) {
        warn!("no flow column matched any aggregation rule; label format drift?");
    }
    tables
}

/// Fold the state-variable series through the rule catalogue.
pub fn aggregate_states(
    results: &FlowResults,
    rules: &[StateRule],
) -> IndexMap<String, AggregatedTable> {
    let mut tables: IndexMap<String, AggregatedTable> = IndexMap::new();
    for rule in rules {
        let mut table = AggregatedTable::new();
        for series in &results.states {
            if series.var != rule.var || !rule.pattern.matches(&series.label) {
                continue;
            }
            let Some(group) = extract(&series.label, rule.key) else {
                continue;
            };
            table.add_into(&group, &series.values);
        }
        tables.insert(rule.name.to_string(), table);
    }
    if !results.states.is_empty() && tables.values().all(AggregatedTable::is_empty) {
        warn!("no state column matched any aggregation rule; label format drift?");
    }
    tables
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_core::{Ags, BusId, Label};
    use rf_solver::{FlowSeries, SolveMeta, SolverStatus, StateSeries};

    fn ags() -> Ags {
        Ags::new("15001000").unwrap()
    }

    fn meta() -> SolveMeta {
        SolveMeta {
            status: SolverStatus::Optimal,
            objective: Some(1.0),
            runtime_s: 0.1,
            solver: "test".to_string(),
        }
    }

    fn gen_flow(tech: &str, values: Vec<f64>) -> FlowSeries {
        FlowSeries {
            from: Label::ElGenerator {
                ags: ags(),
                bus: BusId(123),
                tech: tech.to_string(),
            },
            to: Label::ElBus { bus: BusId(123) },
            values,
        }
    }

    #[test]
    fn generation_groups_by_technology_not_municipality() {
        let results = FlowResults {
            flows: vec![gen_flow("wind", vec![2.0, 3.0]), gen_flow("pv", vec![1.0, 2.0])],
            states: vec![],
            meta: meta(),
        };
        let tables = aggregate_flows(&results, &standard_flow_rules());
        let by_tech = &tables["generation_by_technology"];
        assert_eq!(by_tech.len(), 2);
        assert_eq!(by_tech.totals()["wind"], 5.0);
        assert_eq!(by_tech.totals()["pv"], 3.0);

        // same columns fold into one municipality group under the other rule
        let by_mun = &tables["generation_by_municipality"];
        assert_eq!(by_mun.len(), 1);
        assert_eq!(by_mun.totals()["15001000"], 8.0);
    }

    #[test]
    fn non_matching_columns_are_skipped_silently() {
        let results = FlowResults {
            flows: vec![FlowSeries {
                from: Label::ElHub,
                to: Label::ElBus { bus: BusId(1) },
                values: vec![1.0],
            }],
            states: vec![],
            meta: meta(),
        };
        let tables = aggregate_flows(&results, &standard_flow_rules());
        assert!(tables["generation_by_technology"].is_empty());
    }

    #[test]
    fn chp_heat_and_electricity_stay_separate() {
        let unit = Label::DistrictInstallation {
            ags: ags(),
            unit: "gud".to_string(),
        };
        let results = FlowResults {
            flows: vec![
                FlowSeries {
                    from: unit.clone(),
                    to: Label::DistrictHeatBus {
                        ags: ags(),
                        side: DistrictSide::In,
                    },
                    values: vec![4.0],
                },
                FlowSeries {
                    from: unit,
                    to: Label::ElBus { bus: BusId(1) },
                    values: vec![2.0],
                },
            ],
            states: vec![],
            meta: meta(),
        };
        let tables = aggregate_flows(&results, &standard_flow_rules());
        assert_eq!(tables["heat_cen_by_unit"].totals()["gud"], 4.0);
        assert_eq!(tables["chp_electricity_by_unit"].totals()["gud"], 2.0);
    }

    #[test]
    fn state_rules_split_by_variable() {
        let dsm = Label::Dsm {
            ags: ags(),
            bus: BusId(1),
        };
        let results = FlowResults {
            flows: vec![],
            states: vec![
                StateSeries {
                    label: dsm.clone(),
                    var: StateVar::DsmUp,
                    values: vec![1.0, 0.0],
                },
                StateSeries {
                    label: dsm,
                    var: StateVar::DsmDown,
                    values: vec![0.0, 1.0],
                },
            ],
            meta: meta(),
        };
        let tables = aggregate_states(&results, &standard_state_rules());
        assert_eq!(tables["dsm_up_by_municipality"].totals()["15001000"], 1.0);
        assert_eq!(tables["dsm_down_by_municipality"].totals()["15001000"], 1.0);
        assert!(tables["battery_level_by_municipality"].is_empty());
    }

    #[test]
    fn builder_labels_round_trip_through_rules() {
        // the rule's group value equals the component the label was built
        // from, for a label that went through encode/decode
        let label = Label::ElGenerator {
            ags: ags(),
            bus: BusId(123),
            tech: "wind".to_string(),
        };
        let decoded = Label::decode(&label.encode()).unwrap();
        assert_eq!(extract(&decoded, GroupKey::Technology).unwrap(), "wind");
        assert_eq!(extract(&decoded, GroupKey::Municipality).unwrap(), "15001000");
    }
}
