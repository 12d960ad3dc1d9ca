//! rf-scenario: scenario configuration format and validation.
//!
//! A scenario file is a nested mapping with the sections `general`,
//! `demand`, `generation`, `grid`, `storage`, `flexopt`, `commodities` and
//! `district_heating`. Every section is required; a missing section fails
//! deserialization instead of being defaulted. Numeric sanity and
//! cross-field checks happen in [`validate::validate_scenario`] before a
//! scenario is handed to the model.

pub mod schema;
pub mod validate;

pub use schema::*;
pub use validate::{validate_scenario, ValidationError};

pub type ScenarioResult<T> = Result<T, ScenarioError>;

#[derive(thiserror::Error, Debug)]
pub enum ScenarioError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn load_yaml(path: &std::path::Path) -> ScenarioResult<Scenario> {
    let content = std::fs::read_to_string(path)?;
    let scenario: Scenario = serde_yaml::from_str(&content)?;
    validate_scenario(&scenario)?;
    Ok(scenario)
}

pub fn load_json(path: &std::path::Path) -> ScenarioResult<Scenario> {
    let content = std::fs::read_to_string(path)?;
    let scenario: Scenario = serde_json::from_str(&content)?;
    validate_scenario(&scenario)?;
    Ok(scenario)
}
