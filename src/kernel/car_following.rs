//! The car following kernel, based on the intelligent driver model.

use super::{for_each_indexed, RoadView};
use crate::lane::LaneInfo;
use crate::util::forward_distance;
use crate::vehicle::{IdmParameters, VehicleState};

/// Computes the bumper-to-bumper gap from `follower` to `leader` around a lane of the given length.
pub fn circular_gap(follower: &VehicleState, leader: &VehicleState, lane_length: f64) -> f64 {
    let centres = forward_distance(follower.position_m, leader.position_m, lane_length);
    f64::max(0.0, centres - 0.5 * (follower.length_m + leader.length_m))
}

/// Calculates the acceleration of a vehicle travelling in `lane` behind `leader`,
/// or on an empty road if there is no leader.
///
/// # Parameters
/// * `idm` - The vehicle's car following parameters
/// * `vehicle` - The vehicle's state
/// * `leader` - The state of the vehicle ahead
/// * `lane` - The lane both vehicles are travelling in
/// * `gap_epsilon` - The smallest gap the model divides by
pub fn acceleration_behind(
    idm: &IdmParameters,
    vehicle: &VehicleState,
    leader: Option<&VehicleState>,
    lane: &LaneInfo,
    gap_epsilon: f64,
) -> f64 {
    match leader {
        Some(leader) => idm.following_acceleration(
            vehicle.speed_mps,
            lane.speed_limit_mps,
            circular_gap(vehicle, leader, lane.length_m),
            leader.speed_mps,
            gap_epsilon,
        ),
        None => idm.free_road_acceleration(vehicle.speed_mps, lane.speed_limit_mps),
    }
}

/// Calculates the acceleration of the vehicle at index `idx` behind its current leader.
pub fn vehicle_acceleration(view: &RoadView, idx: usize) -> f64 {
    let vehicle = &view.vehicles[idx];
    debug_assert!(vehicle.lane_index < view.lanes.len(), "vehicle {} is in an unknown lane", idx);
    let Some(lane) = view.lanes.get(vehicle.lane_index) else {
        return 0.0;
    };
    let leader = view.leader(idx).map(|leader| &view.vehicles[leader]);
    acceleration_behind(&view.idm[idx], vehicle, leader, lane, view.config.gap_epsilon_m)
}

/// Computes the acceleration of every vehicle into `out`, which is indexed like `view.vehicles`.
pub fn compute_accelerations(view: &RoadView, out: &mut [f64]) {
    debug_assert_eq!(out.len(), view.vehicles.len());
    for_each_indexed(out, view.config.parallel_threshold, |idx, acc| {
        *acc = vehicle_acceleration(view, idx);
    });
}
