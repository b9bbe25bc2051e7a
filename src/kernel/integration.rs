//! The integration kernel: advances vehicle kinematics and lane change progress.

use crate::lane::LaneInfo;
use crate::util::wrap_position;
use crate::vehicle::{integrate, LaneChangeState, MobilParameters, VehicleState};
use crate::SimulationConfig;
use itertools::izip;
use log::trace;
use rayon::prelude::*;

/// Integrates the velocity, position and lane change progress of one vehicle over `dt` seconds.
///
/// # Parameters
/// * `vehicle` - The vehicle's state
/// * `lane_change` - The vehicle's lane change state
/// * `acc` - The acceleration to apply, in m/s<sup>2</sup>
/// * `mobil` - The vehicle's lane changing parameters
/// * `lanes` - The lane table
/// * `config` - The simulation config
/// * `dt` - The time step in seconds
pub fn integrate_vehicle(
    vehicle: &mut VehicleState,
    lane_change: &mut LaneChangeState,
    acc: f64,
    mobil: &MobilParameters,
    lanes: &[LaneInfo],
    config: &SimulationConfig,
    dt: f64,
) {
    debug_assert!(vehicle.lane_index < lanes.len(), "vehicle in unknown lane {}", vehicle.lane_index);
    let Some(lane) = lanes.get(vehicle.lane_index) else {
        return;
    };

    let motion = integrate(vehicle.speed_mps, acc, dt);
    vehicle.acceleration_mps2 = acc;
    vehicle.speed_mps = motion.speed;
    vehicle.position_m = wrap_position(vehicle.position_m + motion.distance, lane.length_m);

    let completed = lane_change.advance(
        motion.distance,
        dt,
        mobil.min_time_between_changes_s,
        config.min_progress_length_m,
    );
    if let Some(target) = completed {
        debug_assert!(target < lanes.len(), "lane change into unknown lane {}", target);
        if let Some(target_lane) = lanes.get(target) {
            trace!("vehicle {:?} entered lane {}", vehicle.vehicle_id, target);
            vehicle.lane_index = target;
            vehicle.position_m = wrap_position(vehicle.position_m, target_lane.length_m);
        }
    }
}

/// Integrates every vehicle over `dt` seconds, applying the accelerations
/// from [compute_accelerations](super::compute_accelerations).
///
/// The vehicles are no longer lane-sorted afterwards.
pub fn integrate_vehicles(
    lanes: &[LaneInfo],
    mobil: &[MobilParameters],
    accelerations: &[f64],
    vehicles: &mut [VehicleState],
    lane_changes: &mut [LaneChangeState],
    config: &SimulationConfig,
    dt: f64,
) {
    debug_assert_eq!(mobil.len(), vehicles.len());
    debug_assert_eq!(accelerations.len(), vehicles.len());
    debug_assert_eq!(lane_changes.len(), vehicles.len());

    if config.is_parallel(vehicles.len()) {
        vehicles
            .par_iter_mut()
            .zip(lane_changes.par_iter_mut())
            .zip(accelerations.par_iter())
            .zip(mobil.par_iter())
            .for_each(|(((vehicle, lane_change), acc), mobil)| {
                integrate_vehicle(vehicle, lane_change, *acc, mobil, lanes, config, dt)
            });
    } else {
        for (vehicle, lane_change, acc, mobil) in izip!(vehicles, lane_changes, accelerations, mobil) {
            integrate_vehicle(vehicle, lane_change, *acc, mobil, lanes, config, dt);
        }
    }
}
