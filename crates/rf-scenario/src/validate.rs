//! Scenario validation logic.

use std::collections::HashSet;

use crate::schema::{BatteryDef, CopPolicyDef, InstallationKind, Scenario};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Duplicate entry: {id} in {context}")]
    Duplicate { id: String, context: String },

    #[error("Missing entry: {what}")]
    Missing { what: String },
}

fn check_fraction(field: &str, value: f64) -> Result<(), ValidationError> {
    if !(0.0..=1.0).contains(&value) || !value.is_finite() {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "must be within [0, 1]".to_string(),
        });
    }
    Ok(())
}

fn check_positive(field: &str, value: f64) -> Result<(), ValidationError> {
    if !(value > 0.0) || !value.is_finite() {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "must be positive".to_string(),
        });
    }
    Ok(())
}

fn check_non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    if value < 0.0 || !value.is_finite() {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "must be non-negative".to_string(),
        });
    }
    Ok(())
}

fn check_battery(prefix: &str, battery: &BatteryDef) -> Result<(), ValidationError> {
    if !battery.enabled {
        return Ok(());
    }
    check_positive(&format!("{prefix}.capacity_total_mwh"), battery.capacity_total_mwh)?;
    check_positive(&format!("{prefix}.c_rate"), battery.c_rate)?;
    check_fraction(&format!("{prefix}.efficiency_in"), battery.efficiency_in)?;
    check_fraction(&format!("{prefix}.efficiency_out"), battery.efficiency_out)?;
    check_fraction(&format!("{prefix}.loss_rate"), battery.loss_rate)?;
    Ok(())
}

pub fn validate_scenario(scenario: &Scenario) -> Result<(), ValidationError> {
    let general = &scenario.general;
    if general.name.is_empty() {
        return Err(ValidationError::Missing {
            what: "general.name".to_string(),
        });
    }
    if general.num_steps == 0 {
        return Err(ValidationError::InvalidValue {
            field: "general.num_steps".to_string(),
            value: "0".to_string(),
            reason: "simulation range is empty".to_string(),
        });
    }
    if general.step_hours == 0 {
        return Err(ValidationError::InvalidValue {
            field: "general.step_hours".to_string(),
            value: "0".to_string(),
            reason: "step must be at least one hour".to_string(),
        });
    }

    if scenario.demand.sectors.is_empty() {
        return Err(ValidationError::Missing {
            what: "demand.sectors".to_string(),
        });
    }

    let grid = &scenario.grid;
    check_positive("grid.trafo_conversion_factor", grid.trafo_conversion_factor)?;
    check_fraction("grid.max_usable_capacity_factor", grid.max_usable_capacity_factor)?;
    check_fraction("grid.line_efficiency", grid.line_efficiency)?;
    check_non_negative("grid.import_cost", grid.import_cost)?;
    check_non_negative("grid.shortage_cost", grid.shortage_cost)?;

    let th_cen = &scenario.storage.th_cen;
    if th_cen.enabled {
        check_positive("storage.th_cen.capacity_mwh", th_cen.capacity_mwh)?;
        check_positive("storage.th_cen.power_mw", th_cen.power_mw)?;
        check_fraction("storage.th_cen.loss_rate", th_cen.loss_rate)?;
        check_fraction("storage.th_cen.efficiency_in", th_cen.efficiency_in)?;
        check_fraction("storage.th_cen.efficiency_out", th_cen.efficiency_out)?;
    }

    let flexopt = &scenario.flexopt;
    check_battery("flexopt.batteries_large", &flexopt.batteries_large)?;
    check_battery("flexopt.batteries_small", &flexopt.batteries_small)?;

    let pth = &flexopt.dec_pth;
    if pth.enabled {
        check_positive("flexopt.dec_pth.nom_capacity_total_mw", pth.nom_capacity_total_mw)?;
        check_fraction("flexopt.dec_pth.ashp_share", pth.ashp_share)?;
        check_fraction("flexopt.dec_pth.gshp_share", pth.gshp_share)?;
        if (pth.ashp_share + pth.gshp_share - 1.0).abs() > 1e-9 {
            return Err(ValidationError::InvalidValue {
                field: "flexopt.dec_pth.ashp_share/gshp_share".to_string(),
                value: format!("{} + {}", pth.ashp_share, pth.gshp_share),
                reason: "technology shares must sum to 1".to_string(),
            });
        }
        check_fraction("flexopt.dec_pth.quality_grade_air", pth.quality_grade_air)?;
        check_fraction("flexopt.dec_pth.quality_grade_soil", pth.quality_grade_soil)?;
        if pth.cop_policy == CopPolicyDef::Clamp {
            check_positive("flexopt.dec_pth.max_cop", pth.max_cop)?;
        }
    }

    let cen_pth = &flexopt.cen_pth;
    if cen_pth.enabled {
        check_positive("flexopt.cen_pth.nom_capacity_mw", cen_pth.nom_capacity_mw)?;
        check_fraction("flexopt.cen_pth.efficiency", cen_pth.efficiency)?;
    }

    let dsm = &flexopt.dsm;
    if dsm.enabled {
        if dsm.sectors.is_empty() {
            return Err(ValidationError::Missing {
                what: "flexopt.dsm.sectors".to_string(),
            });
        }
        if dsm.sectors.iter().any(|s| *s != rf_core::Sector::Hh) {
            return Err(ValidationError::InvalidValue {
                field: "flexopt.dsm.sectors".to_string(),
                value: format!("{:?}", dsm.sectors),
                reason: "demand-side management covers household load only".to_string(),
            });
        }
        if dsm.shift_interval_hours == 0 {
            return Err(ValidationError::InvalidValue {
                field: "flexopt.dsm.shift_interval_hours".to_string(),
                value: "0".to_string(),
                reason: "shift interval must be at least one hour".to_string(),
            });
        }
    }

    let mut commodity_names = HashSet::new();
    for commodity in &scenario.commodities {
        if commodity.name.is_empty() {
            return Err(ValidationError::Missing {
                what: "commodities[].name".to_string(),
            });
        }
        if !commodity_names.insert(commodity.name.as_str()) {
            return Err(ValidationError::Duplicate {
                id: commodity.name.clone(),
                context: "commodities".to_string(),
            });
        }
        check_non_negative(
            &format!("commodities.{}.variable_cost", commodity.name),
            commodity.variable_cost,
        )?;
        check_non_negative(
            &format!("commodities.{}.emission_factor", commodity.name),
            commodity.emission_factor,
        )?;
    }

    let dh = &scenario.district_heating;
    check_fraction("district_heating.network_efficiency", dh.network_efficiency)?;
    check_positive("district_heating.network_efficiency", dh.network_efficiency)?;
    let mut installation_ids = HashSet::new();
    for spec in &dh.installations {
        let id = format!("{}/{}", spec.ags, spec.unit);
        if !installation_ids.insert(id.clone()) {
            return Err(ValidationError::Duplicate {
                id,
                context: "district_heating.installations".to_string(),
            });
        }
        check_positive(&format!("installations.{id}.size_share"), spec.size_share)?;
        check_fraction(&format!("installations.{id}.efficiency_th"), spec.efficiency_th)?;
        if spec.kind.has_electrical_output() {
            let eff_el = spec.efficiency_el.ok_or_else(|| ValidationError::Missing {
                what: format!("installations.{id}.efficiency_el"),
            })?;
            check_fraction(&format!("installations.{id}.efficiency_el"), eff_el)?;
        }
        if spec.kind == InstallationKind::Boiler && spec.efficiency_el.is_some() {
            return Err(ValidationError::InvalidValue {
                field: format!("installations.{id}.efficiency_el"),
                value: "set".to_string(),
                reason: "boilers have no electrical output".to_string(),
            });
        }
        for month in &spec.maintenance_months {
            if !(1..=12).contains(month) {
                return Err(ValidationError::InvalidValue {
                    field: format!("installations.{id}.maintenance_months"),
                    value: month.to_string(),
                    reason: "months are 1..=12".to_string(),
                });
            }
        }
        if !spec.maintenance_months.is_empty() && spec.maintenance_duration_months == 0 {
            return Err(ValidationError::InvalidValue {
                field: format!("installations.{id}.maintenance_duration_months"),
                value: "0".to_string(),
                reason: "maintenance windows need a duration".to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::*;
    use chrono::NaiveDate;
    use rf_core::{Ags, Sector};

    pub(crate) fn minimal_scenario() -> Scenario {
        Scenario {
            general: GeneralSection {
                name: "status_quo".to_string(),
                year: 2035,
                start: NaiveDate::from_ymd_opt(2035, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
                step_hours: 1,
                num_steps: 8760,
            },
            demand: DemandSection {
                sectors: vec![Sector::Hh, Sector::Rca, Sector::Ind],
                heat_sectors: vec![Sector::Hh, Sector::Rca],
            },
            generation: GenerationSection {
                technologies: vec!["wind".to_string(), "pv".to_string()],
            },
            grid: GridSection {
                trafo_conversion_factor: 0.996,
                max_usable_capacity_factor: 0.8,
                line_efficiency: 0.98,
                import_cost: 60.0,
                export_cost: 0.0,
                shortage_cost: 1000.0,
                excess_cost: 0.0,
            },
            storage: StorageSection {
                th_cen: ThermalStorageDef {
                    enabled: false,
                    capacity_mwh: 0.0,
                    power_mw: 0.0,
                    loss_rate: 0.0,
                    efficiency_in: 1.0,
                    efficiency_out: 1.0,
                },
            },
            flexopt: FlexoptSection {
                batteries_large: BatteryDef {
                    enabled: false,
                    capacity_total_mwh: 0.0,
                    c_rate: 1.0,
                    efficiency_in: 0.95,
                    efficiency_out: 0.95,
                    loss_rate: 0.0,
                    distribution: AllocationMetric::DemandShare,
                },
                batteries_small: BatteryDef {
                    enabled: false,
                    capacity_total_mwh: 0.0,
                    c_rate: 1.0,
                    efficiency_in: 0.95,
                    efficiency_out: 0.95,
                    loss_rate: 0.0,
                    distribution: AllocationMetric::Population,
                },
                dec_pth: DecPthDef {
                    enabled: false,
                    nom_capacity_total_mw: 0.0,
                    ashp_share: 0.6,
                    gshp_share: 0.4,
                    flow_temperature_c: 40.0,
                    quality_grade_air: 0.4,
                    quality_grade_soil: 0.4,
                    cop_policy: CopPolicyDef::Clamp,
                    max_cop: 7.0,
                },
                cen_pth: CenPthDef {
                    enabled: false,
                    nom_capacity_mw: 0.0,
                    efficiency: 0.99,
                },
                dsm: DsmDef {
                    enabled: false,
                    sectors: vec![Sector::Hh],
                    mode: DsmModeDef::Current,
                    shift_interval_hours: 24,
                    delay_hours: 4,
                },
            },
            commodities: vec![
                CommodityDef {
                    name: "gas".to_string(),
                    variable_cost: 35.0,
                    emission_factor: 0.2,
                },
                CommodityDef {
                    name: "wood".to_string(),
                    variable_cost: 25.0,
                    emission_factor: 0.0,
                },
            ],
            district_heating: DistrictHeatingSection {
                network_efficiency: 0.85,
                installations: vec![],
            },
        }
    }

    #[test]
    fn minimal_scenario_validates() {
        validate_scenario(&minimal_scenario()).expect("minimal scenario should be valid");
    }

    #[test]
    fn rejects_out_of_range_factor() {
        let mut scenario = minimal_scenario();
        scenario.grid.max_usable_capacity_factor = 1.2;
        assert!(matches!(
            validate_scenario(&scenario),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn rejects_pth_shares_not_summing_to_one() {
        let mut scenario = minimal_scenario();
        scenario.flexopt.dec_pth.enabled = true;
        scenario.flexopt.dec_pth.nom_capacity_total_mw = 100.0;
        scenario.flexopt.dec_pth.ashp_share = 0.6;
        scenario.flexopt.dec_pth.gshp_share = 0.6;
        assert!(validate_scenario(&scenario).is_err());
    }

    #[test]
    fn rejects_duplicate_commodities() {
        let mut scenario = minimal_scenario();
        scenario.commodities.push(CommodityDef {
            name: "gas".to_string(),
            variable_cost: 30.0,
            emission_factor: 0.2,
        });
        assert!(matches!(
            validate_scenario(&scenario),
            Err(ValidationError::Duplicate { .. })
        ));
    }

    #[test]
    fn chp_requires_electrical_efficiency() {
        let mut scenario = minimal_scenario();
        scenario.district_heating.installations.push(InstallationDef {
            ags: Ags::new("15001000").unwrap(),
            unit: "gud".to_string(),
            kind: InstallationKind::ChpCc,
            size_share: 0.9,
            fuel: "gas".to_string(),
            efficiency_el: None,
            efficiency_th: 0.45,
            maintenance_months: vec![6],
            maintenance_duration_months: 1,
        });
        assert!(matches!(
            validate_scenario(&scenario),
            Err(ValidationError::Missing { .. })
        ));
    }

    #[test]
    fn missing_section_fails_deserialization() {
        // no `flexopt` section
        let yaml = r#"
general: { name: x, year: 2035, start: "2035-01-01T00:00:00", step_hours: 1, num_steps: 24 }
demand: { sectors: [hh], heat_sectors: [hh] }
generation: { technologies: [wind] }
grid: { trafo_conversion_factor: 1.0, max_usable_capacity_factor: 0.8, line_efficiency: 0.98, import_cost: 60, export_cost: 0, shortage_cost: 1000, excess_cost: 0 }
storage: { th_cen: { enabled: false, capacity_mwh: 0, power_mw: 0, loss_rate: 0, efficiency_in: 1, efficiency_out: 1 } }
commodities: []
district_heating: { network_efficiency: 0.85 }
"#;
        assert!(serde_yaml::from_str::<Scenario>(yaml).is_err());
    }
}
