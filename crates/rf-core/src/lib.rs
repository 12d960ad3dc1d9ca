//! rf-core: shared kernel for the regional energy-system model.
//!
//! Holds the pieces every other crate agrees on: municipality/bus/sector
//! key types, the node-label grammar shared between the network builder
//! and the result aggregation engine, and the simulation time grid.

pub mod error;
pub mod keys;
pub mod labels;
pub mod timegrid;

pub use error::{CoreError, RfResult};
pub use keys::{Ags, BusId, Carrier, LineId, Sector, TrafoId, VoltageLevel};
pub use labels::{BatteryKind, DistrictSide, HeatMode, HeatPumpKind, Label};
pub use timegrid::TimeGrid;
