//! rf-region: the per-run data model.
//!
//! All imported tabular and time-series data for one simulation run lives
//! in a [`Region`], an immutable value object built once by
//! [`Region::build`] from the input tables and the scenario configuration.
//! Construction validates everything up front; accessors never fall back
//! silently.

pub mod grid;
pub mod prepare;
pub mod region;
pub mod tables;
pub mod timeseries;

pub use grid::{Bus, GridTopology, Line, Trafo};
pub use region::{HeatingStructureView, Municipality, Region, TechAssumption};
pub use tables::RegionTables;
pub use timeseries::{DsmSeries, TsTable};

use rf_core::{Ags, Sector};

pub type RegionResult<T> = Result<T, RegionError>;

#[derive(thiserror::Error, Debug)]
pub enum RegionError {
    #[error("Missing time series: {key}")]
    MissingSeries { key: String },

    #[error("Missing municipality column: {ags} in {table}")]
    MissingColumn { ags: Ags, table: String },

    #[error("No data for scenario year {year} in {table}")]
    MissingYear { year: u32, table: String },

    #[error("Municipality {ags} has no {what}")]
    IncompleteMunicipality { ags: Ags, what: String },

    #[error("Unknown bus reference: {bus} in {context}")]
    UnknownBus { bus: u32, context: String },

    #[error(
        "Heating-structure shares for {ags}/{sector} sum to {sum}, expected 1"
    )]
    UnbalancedShares { ags: Ags, sector: Sector, sum: f64 },

    #[error("Commodity {fuel} referenced by heating structure is not configured")]
    UnknownCommodity { fuel: String },

    #[error("Time series misaligned: {what}")]
    Misaligned { what: String },

    #[error("Invalid input value: {what}")]
    InvalidInput { what: String },

    #[error("CSV error in {table}: {source}")]
    Csv {
        table: String,
        #[source]
        source: csv::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] rf_core::CoreError),
}
