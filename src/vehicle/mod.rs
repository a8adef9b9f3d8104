//! vehicle - engine-agnostic vehicle model (pure types + step functions)

pub mod types;
pub mod params;
pub mod powertrain;
pub mod suspension;
pub mod tire;
pub mod chassis;

pub use types::*;
pub use params::{ParameterSet, TorqueCurve, Transmission};
