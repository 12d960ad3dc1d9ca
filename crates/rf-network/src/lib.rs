//! rf-network: flow-network construction.
//!
//! Consumes the [`rf_region::Region`] and a scenario configuration and
//! deterministically produces the complete node/flow description handed
//! to the optimization solver. Construction runs in three ordered phases
//! (electrical, thermal, flexibility); any missing input or dangling
//! reference aborts the build — a partial network is never returned.

pub mod builder;
pub mod calc;
pub mod model;

mod electrical;
mod flexibility;
mod thermal;

pub use builder::build_network;
pub use calc::{calc_cop, dsm_capacity_down, dsm_capacity_up, maintenance_mask, CopPolicy};
pub use model::{Conversion, EnergyNetwork, Flow, NetworkBuilder, NetworkNode, NodeKind};

use rf_core::Label;

pub type NetworkResult<T> = Result<T, NetworkError>;

#[derive(thiserror::Error, Debug)]
pub enum NetworkError {
    #[error("Duplicate node label: {label}")]
    DuplicateLabel { label: Label },

    #[error("Flow references missing node: {label} ({endpoint})")]
    DanglingFlow { label: Label, endpoint: &'static str },

    #[error("Profile length mismatch for {label}: {len} values, grid has {expected}")]
    ProfileLength {
        label: Label,
        len: usize,
        expected: usize,
    },

    #[error(
        "Boundary bus {bus} has no attached line or transformer to size the interconnector"
    )]
    UnattachedBoundaryBus { bus: rf_core::BusId },

    #[error("Commodity {fuel} is not configured")]
    UnknownCommodity { fuel: String },

    #[error("Installation {unit} for {ags}: {what}")]
    InvalidInstallation {
        ags: rf_core::Ags,
        unit: String,
        what: String,
    },

    #[error("Degenerate temperature spread at step {step}: {t_high_k} K <= {t_low_k} K")]
    DegenerateTemperatureSpread {
        step: usize,
        t_high_k: f64,
        t_low_k: f64,
    },

    #[error(transparent)]
    Region(#[from] rf_region::RegionError),
}
