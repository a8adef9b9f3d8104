//! Fixed-timestep vehicle dynamics: powertrain, suspension and planar chassis
//! advanced in lockstep by a pausable simulation loop, plus the session and
//! WebSocket glue used by the `vehicle-sim` binary.

pub mod vehicle;
pub mod error;
pub mod context;
pub mod sim_loop;
pub mod laps;
pub mod state;
pub mod net;

pub use context::SimulationContext;
pub use error::{FaultRecord, SimError, Stage};
pub use sim_loop::{LoopState, PollReport, SimulationLoop};
