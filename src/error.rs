//! Errors reported by the [Simulation](crate::Simulation) when it is given
//! inconsistent lanes, vehicles or traffic lights.
//!
//! The per-tick kernels never fail; these only guard the simulation's setters.

use crate::VehicleId;
use thiserror::Error;

/// Result type of the fallible [Simulation](crate::Simulation) methods.
pub type Result<T> = std::result::Result<T, SimulationError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("lane {0} does not exist")]
    UnknownLane(usize),

    #[error("vehicle {0:?} does not exist")]
    UnknownVehicle(VehicleId),

    #[error("traffic light group {0} does not exist")]
    UnknownLightGroup(usize),

    #[error("lane {lane} cannot be adjacent to itself")]
    SelfAdjacent { lane: usize },

    #[error("invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("stop line at {position} m lies outside lane {lane} of length {length} m")]
    StopLineOutOfRange {
        lane: usize,
        position: f64,
        length: f64,
    },
}

impl SimulationError {
    /// Checks that `value` is finite and strictly positive.
    pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<()> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(Self::InvalidParameter { name, value })
        }
    }

    /// Checks that `value` is finite and not negative.
    pub(crate) fn require_non_negative(name: &'static str, value: f64) -> Result<()> {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(Self::InvalidParameter { name, value })
        }
    }
}
