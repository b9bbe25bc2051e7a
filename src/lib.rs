//! A multi-lane ring road traffic simulation.
//!
//! Vehicles follow the vehicle ahead using the intelligent driver model (IDM) and
//! decide whether to change lanes using MOBIL. Every lane is a closed loop, so
//! positions wrap around at the end of the lane. Each step is a pipeline of
//! data-parallel stages; see [kernel] for the order they run in.

pub use cgmath;
pub use config::SimulationConfig;
pub use error::{Result, SimulationError};
pub use lane::{LaneInfo, LaneVehicleRange};
pub use light::{
    advance_light_groups, evaluate_color, LightColor, TrafficLightGroupParameters,
    TrafficLightGroupState, TrafficLightLaneBinding,
};
pub use ordering::{order_vehicles, LaneOccupancy};
pub use simulation::Simulation;
use slotmap::new_key_type;
pub use slotmap::{Key, KeyData};
pub use util::{forward_distance, wrap_position};
pub use vehicle::{
    IdmParameters, LaneChangeGeometry, LaneChangeState, MobilParameters, VehicleAttributes,
    VehicleColumns, VehicleState, VehicleStore,
};

mod config;
#[cfg(feature = "debug")]
mod debug;
mod error;
pub mod kernel;
mod lane;
mod light;
pub mod math;
pub mod ordering;
mod simulation;
mod util;
mod vehicle;

new_key_type! {
    /// Unique ID of a vehicle, stable while the vehicle store is reordered.
    pub struct VehicleId;
}
