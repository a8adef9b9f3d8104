//! Error taxonomy for the simulation core.
//!
//! Bad parameters are refused at `start()`, a non-finite integration result
//! stops the loop and leaves a [`FaultRecord`], and out-of-range driver input
//! is never an error (it is clamped where it enters the core).

use std::fmt;

use serde::Serialize;

use crate::sim_loop::LoopState;

/// Tick stage that produced a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Powertrain,
    Suspension,
    Chassis,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Powertrain => "powertrain",
            Stage::Suspension => "suspension",
            Stage::Chassis => "chassis",
        };
        write!(f, "{s}")
    }
}

/// Diagnostic left behind when a tick is rejected.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FaultRecord {
    /// Tick that would have been published.
    pub tick: u64,
    /// Simulated time at the start of the rejected tick (s).
    pub sim_time: f64,
    pub stage: Stage,
    /// Name of the first non-finite quantity.
    pub quantity: &'static str,
    pub value: f32,
}

impl fmt::Display for FaultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "non-finite {} = {} in {} stage at tick {} (t={:.3}s)",
            self.quantity, self.value, self.stage, self.tick, self.sim_time
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SimError {
    /// A ParameterSet failed validation.
    InvalidParameter {
        /// Field name as used by the flat parameter mapping
        field: String,
        reason: String,
    },
    /// An integration step produced NaN/Inf.
    NumericFault(FaultRecord),
    /// A lifecycle call that the current loop state does not accept.
    InvalidTransition {
        from: LoopState,
        op: &'static str,
    },
}

impl SimError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter { field: field.into(), reason: reason.into() }
    }
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter { field, reason } => {
                write!(f, "invalid parameter `{field}`: {reason}")
            }
            Self::NumericFault(record) => write!(f, "numeric fault: {record}"),
            Self::InvalidTransition { from, op } => {
                write!(f, "cannot {op} while {from}")
            }
        }
    }
}

impl std::error::Error for SimError {}

/// Returns a fault for the first non-finite entry of `values`.
pub(crate) fn check_finite(
    stage: Stage,
    tick: u64,
    sim_time: f64,
    values: &[(&'static str, f32)],
) -> Result<(), SimError> {
    match values.iter().find(|(_, v)| !v.is_finite()) {
        Some(&(quantity, value)) => Err(SimError::NumericFault(FaultRecord {
            tick,
            sim_time,
            stage,
            quantity,
            value,
        })),
        None => Ok(()),
    }
}
