//! The lane changing kernel, based on the MOBIL model.
//!
//! A vehicle changes lanes when the acceleration it would gain, less a
//! politeness-weighted share of the acceleration lost by the vehicles behind it
//! in both lanes, exceeds its threshold, and the vehicle it would pull in front
//! of would not have to brake harder than is safe.

use super::car_following::acceleration_behind;
use super::{for_each_indexed, RoadView};
use crate::lane::LaneVehicleRange;
use crate::util::wrap_position;
use crate::vehicle::{LaneChangeState, MobilParameters, VehicleState};
use log::trace;

/// The vehicles either side of a position in a lane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Neighbours {
    /// The first vehicle ahead of the position, wrapping around the lane.
    pub leader: Option<usize>,
    /// The first vehicle behind the position, wrapping around the lane.
    pub follower: Option<usize>,
}

/// A lane a vehicle could move into, and the MOBIL incentive of doing so.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaneChangeCandidate {
    pub lane: usize,
    pub incentive: f64,
}

/// Finds the vehicles in `range` either side of the longitudinal position `pos`.
///
/// In a lane holding a single vehicle, that vehicle is both leader and follower.
pub fn neighbours_at(vehicles: &[VehicleState], range: LaneVehicleRange, pos: f64) -> Neighbours {
    if range.is_empty() {
        return Neighbours::default();
    }
    let leader = range
        .indices()
        .find(|idx| vehicles[*idx].position_m > pos)
        .unwrap_or(range.start);
    Neighbours {
        leader: Some(leader),
        follower: Some(range.rotate(leader, range.count - 1)),
    }
}

/// The change in acceleration of the vehicle behind `idx` in its current lane
/// if `idx` were to leave, so that it follows `idx`'s leader instead.
fn old_follower_gain(view: &RoadView, accelerations: &[f64], idx: usize) -> f64 {
    let Some(follower) = view.follower(idx) else {
        return 0.0;
    };
    let lane = &view.lanes[view.vehicles[idx].lane_index];
    // With only two vehicles in the lane, the follower would be left alone
    let leader = view
        .leader(idx)
        .filter(|leader| *leader != follower)
        .map(|leader| &view.vehicles[leader]);
    let acc = acceleration_behind(
        &view.idm[follower],
        &view.vehicles[follower],
        leader,
        lane,
        view.config.gap_epsilon_m,
    );
    acc - accelerations[follower]
}

/// Evaluates moving the vehicle at `idx` into the `target` lane.
///
/// Returns the vehicle's own acceleration gain and the gain of its new follower,
/// or `None` if the new follower would have to brake harder than is safe.
fn target_lane_gains(
    view: &RoadView,
    mobil: &MobilParameters,
    accelerations: &[f64],
    idx: usize,
    target: usize,
) -> Option<(f64, f64)> {
    let lane = view.lanes.get(target)?;
    let eps = view.config.gap_epsilon_m;
    let vehicle = &view.vehicles[idx];
    let moved = VehicleState {
        lane_index: target,
        position_m: wrap_position(vehicle.position_m, lane.length_m),
        ..*vehicle
    };
    let neighbours = neighbours_at(view.vehicles, view.occupancy.range(target), moved.position_m);

    let follower_gain = match neighbours.follower {
        Some(follower) => {
            let acc = acceleration_behind(
                &view.idm[follower],
                &view.vehicles[follower],
                Some(&moved),
                lane,
                eps,
            );
            if acc < -mobil.safe_braking_deceleration_mps2 {
                return None;
            }
            acc - accelerations[follower]
        }
        None => 0.0,
    };

    let leader = neighbours.leader.map(|leader| &view.vehicles[leader]);
    let own_acc = acceleration_behind(&view.idm[idx], &moved, leader, lane, eps);
    Some((own_acc - accelerations[idx], follower_gain))
}

/// Computes the MOBIL incentive for the vehicle at `idx` to move into the `target`
/// lane, or `None` if the move is unsafe.
///
/// # Parameters
/// * `view` - The road and lane-sorted vehicles
/// * `mobil` - The lane changing parameters of the vehicle
/// * `accelerations` - The current acceleration of every vehicle
/// * `idx` - The vehicle's index
/// * `target` - The lane to evaluate
pub fn lane_change_incentive(
    view: &RoadView,
    mobil: &MobilParameters,
    accelerations: &[f64],
    idx: usize,
    target: usize,
) -> Option<f64> {
    let (own_gain, follower_gain) = target_lane_gains(view, mobil, accelerations, idx, target)?;
    let others = follower_gain + old_follower_gain(view, accelerations, idx);
    Some(own_gain + mobil.politeness * others)
}

/// Picks the safe adjacent lane with the greatest incentive, if its incentive exceeds
/// the vehicle's threshold. On a tie the left lane wins.
pub fn choose_lane_change(
    view: &RoadView,
    mobil: &MobilParameters,
    accelerations: &[f64],
    idx: usize,
) -> Option<LaneChangeCandidate> {
    let current = view.vehicles[idx].lane_index;
    let lane = view.lanes.get(current)?;
    let old_follower_gain = old_follower_gain(view, accelerations, idx);

    let mut best: Option<LaneChangeCandidate> = None;
    for target in lane.adjacent() {
        debug_assert!(target < view.lanes.len(), "lane {} is adjacent to unknown lane {}", current, target);
        if target == current {
            continue;
        }
        let Some((own_gain, follower_gain)) = target_lane_gains(view, mobil, accelerations, idx, target) else {
            continue;
        };
        let incentive = own_gain + mobil.politeness * (follower_gain + old_follower_gain);
        if best.map_or(true, |best| incentive > best.incentive) {
            best = Some(LaneChangeCandidate { lane: target, incentive });
        }
    }

    best.filter(|best| best.incentive > mobil.advantage_threshold_mps2)
}

/// Starts a lane change for every vehicle which is free to change lanes and has a worthwhile one.
///
/// # Parameters
/// * `view` - The road and lane-sorted vehicles
/// * `mobil` - The lane changing parameters of each vehicle
/// * `accelerations` - The output of [compute_accelerations](super::compute_accelerations)
/// * `lane_changes` - The lane change state of each vehicle
pub fn evaluate_lane_changes(
    view: &RoadView,
    mobil: &[MobilParameters],
    accelerations: &[f64],
    lane_changes: &mut [LaneChangeState],
) {
    debug_assert_eq!(mobil.len(), view.vehicles.len());
    debug_assert_eq!(accelerations.len(), view.vehicles.len());
    debug_assert_eq!(lane_changes.len(), view.vehicles.len());

    for_each_indexed(lane_changes, view.config.parallel_threshold, |idx, lane_change| {
        if lane_change.is_blocked() {
            return;
        }
        if let Some(candidate) = choose_lane_change(view, &mobil[idx], accelerations, idx) {
            let vehicle = &view.vehicles[idx];
            let length = view.config.transition_length(vehicle.speed_mps);
            lane_change.begin(vehicle.lane_index, candidate.lane, length);
            trace!(
                "vehicle {:?} changing from lane {} to {} over {:.1} m (incentive {:.2})",
                vehicle.vehicle_id,
                vehicle.lane_index,
                candidate.lane,
                length,
                candidate.incentive
            );
        }
    });
}
