//! Scenario schema definitions.

use chrono::NaiveDateTime;
use rf_core::{Ags, RfResult, Sector, TimeGrid};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    pub general: GeneralSection,
    pub demand: DemandSection,
    pub generation: GenerationSection,
    pub grid: GridSection,
    pub storage: StorageSection,
    pub flexopt: FlexoptSection,
    pub commodities: Vec<CommodityDef>,
    pub district_heating: DistrictHeatingSection,
}

impl Scenario {
    /// Simulation time grid described by the `general` section.
    pub fn time_grid(&self) -> RfResult<TimeGrid> {
        TimeGrid::new(
            self.general.start,
            self.general.step_hours,
            self.general.num_steps,
        )
    }

    pub fn commodity(&self, name: &str) -> Option<&CommodityDef> {
        self.commodities.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralSection {
    /// Scenario name, used in run directories and batch manifests.
    pub name: String,
    /// Scenario year selecting heating structure, technical assumptions
    /// and district-heating shares.
    pub year: u32,
    /// First timestamp of the simulation range.
    pub start: NaiveDateTime,
    pub step_hours: u32,
    pub num_steps: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DemandSection {
    /// Electrical demand sectors to model.
    pub sectors: Vec<Sector>,
    /// Heat demand sectors to model.
    pub heat_sectors: Vec<Sector>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationSection {
    /// Feedin technologies to build generators for.
    pub technologies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridSection {
    /// Fixed conversion factor for voltage-step transformers.
    pub trafo_conversion_factor: f64,
    /// Fraction of the attached line/transformer capacity usable by the
    /// import/export interconnector.
    pub max_usable_capacity_factor: f64,
    /// Per-direction efficiency of lines and interties.
    pub line_efficiency: f64,
    pub import_cost: f64,
    pub export_cost: f64,
    pub shortage_cost: f64,
    pub excess_cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageSection {
    /// Central thermal storage attached to the district-heating inbound bus.
    pub th_cen: ThermalStorageDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThermalStorageDef {
    pub enabled: bool,
    pub capacity_mwh: f64,
    pub power_mw: f64,
    /// Relative loss per hour of stored energy.
    pub loss_rate: f64,
    pub efficiency_in: f64,
    pub efficiency_out: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlexoptSection {
    pub batteries_large: BatteryDef,
    pub batteries_small: BatteryDef,
    pub dec_pth: DecPthDef,
    pub cen_pth: CenPthDef,
    pub dsm: DsmDef,
}

/// Battery flexibility, allocated across municipalities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatteryDef {
    pub enabled: bool,
    /// Total capacity distributed over the region.
    pub capacity_total_mwh: f64,
    /// Charge/discharge power as a fraction of capacity per hour.
    pub c_rate: f64,
    pub efficiency_in: f64,
    pub efficiency_out: f64,
    pub loss_rate: f64,
    /// Metric the per-municipality allocation is proportional to.
    pub distribution: AllocationMetric,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AllocationMetric {
    /// Annual electricity demand share.
    DemandShare,
    /// Population share.
    Population,
}

/// Decentral power-to-heat (heat pumps).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecPthDef {
    pub enabled: bool,
    pub nom_capacity_total_mw: f64,
    /// Share of air-source heat pumps; `ashp_share + gshp_share == 1`.
    pub ashp_share: f64,
    pub gshp_share: f64,
    /// Heating-system flow temperature the pumps deliver.
    pub flow_temperature_c: f64,
    pub quality_grade_air: f64,
    pub quality_grade_soil: f64,
    pub cop_policy: CopPolicyDef,
    /// Upper bound applied by the `clamp` policy.
    pub max_cop: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CopPolicyDef {
    /// Cap the coefficient of performance at `max_cop`; degenerate
    /// temperature spreads also collapse to the cap.
    Clamp,
    /// Abort the run on a zero or negative temperature spread.
    Fail,
}

/// Central power-to-heat into the district-heating network.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CenPthDef {
    pub enabled: bool,
    pub nom_capacity_mw: f64,
    pub efficiency: f64,
}

/// Household demand-side management.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DsmDef {
    pub enabled: bool,
    /// Sectors whose plain sinks are replaced by DSM nodes.
    pub sectors: Vec<Sector>,
    pub mode: DsmModeDef,
    /// How long shifted load may be deferred.
    pub shift_interval_hours: u32,
    /// Recovery time after a shift.
    pub delay_hours: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DsmModeDef {
    /// Use the `*_current` envelope sub-series.
    Current,
    /// Use the `*_max` envelope sub-series.
    Max,
    /// Average of current and max.
    Mean,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommodityDef {
    pub name: String,
    pub variable_cost: f64,
    /// t CO2 per MWh fuel.
    pub emission_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistrictHeatingSection {
    /// Thermal efficiency of the district network between inbound and
    /// outbound bus.
    pub network_efficiency: f64,
    /// Declarative per-municipality supply installations; replaces
    /// hard-wired municipality conditionals in construction code.
    #[serde(default)]
    pub installations: Vec<InstallationDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstallationDef {
    pub ags: Ags,
    /// Unit name, part of the node label (`gen_th_cen_{ags}_{unit}`).
    pub unit: String,
    pub kind: InstallationKind,
    /// Thermal capacity as a share of the municipality's peak thermal load.
    pub size_share: f64,
    pub fuel: String,
    /// Electrical efficiency; only meaningful for CHP units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub efficiency_el: Option<f64>,
    pub efficiency_th: f64,
    /// Months (1..=12) in which planned maintenance starts.
    #[serde(default)]
    pub maintenance_months: Vec<u32>,
    #[serde(default)]
    pub maintenance_duration_months: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InstallationKind {
    /// Combined-cycle CHP; receives scheduled-downtime behaviour.
    ChpCc,
    /// Back-pressure CHP.
    ChpBp,
    /// Heat-only peaking boiler.
    Boiler,
}

impl InstallationKind {
    /// CHP units feed electricity alongside heat.
    pub fn has_electrical_output(self) -> bool {
        matches!(self, InstallationKind::ChpCc | InstallationKind::ChpBp)
    }
}
