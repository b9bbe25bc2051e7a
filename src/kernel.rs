//! The per-tick simulation kernels.
//!
//! Each kernel runs once per vehicle and writes only that vehicle's slot of its
//! output, reading everything else from arrays completed by an earlier stage.
//! They must be called in this order after [order_vehicles](crate::ordering::order_vehicles):
//!
//! 1. [compute_accelerations](car_following::compute_accelerations)
//! 2. [evaluate_lane_changes](lane_change::evaluate_lane_changes)
//! 3. [integrate_vehicles](integration::integrate_vehicles)

pub use self::car_following::{compute_accelerations, vehicle_acceleration};
pub use self::integration::integrate_vehicles;
pub use self::lane_change::evaluate_lane_changes;
use crate::lane::{LaneInfo, LaneVehicleRange};
use crate::ordering::LaneOccupancy;
use crate::vehicle::{IdmParameters, VehicleState};
use crate::SimulationConfig;
use rayon::prelude::*;

pub mod car_following;
pub mod integration;
pub mod lane_change;

/// A read-only view of the road and the lane-sorted vehicles on it during one tick.
#[derive(Clone, Copy)]
pub struct RoadView<'a> {
    /// The lane table.
    pub lanes: &'a [LaneInfo],
    /// The lane occupancy index, rebuilt for the current vehicle order.
    pub occupancy: &'a LaneOccupancy,
    /// The lane-sorted vehicles.
    pub vehicles: &'a [VehicleState],
    /// The car following parameters of each vehicle.
    pub idm: &'a [IdmParameters],
    pub config: &'a SimulationConfig,
}

impl<'a> RoadView<'a> {
    /// The range of vehicles sharing the given vehicle's lane.
    pub fn lane_range(&self, idx: usize) -> LaneVehicleRange {
        let range = self.occupancy.range(self.vehicles[idx].lane_index);
        debug_assert!(range.contains(idx), "vehicle {} is outside its lane range", idx);
        range
    }

    /// The vehicle ahead of the given vehicle in its lane, if there is one.
    pub fn leader(&self, idx: usize) -> Option<usize> {
        let range = self.lane_range(idx);
        range.contains(idx).then(|| range.next(idx)).flatten()
    }

    /// The vehicle behind the given vehicle in its lane, if there is one.
    pub fn follower(&self, idx: usize) -> Option<usize> {
        let range = self.lane_range(idx);
        range.contains(idx).then(|| range.prev(idx)).flatten()
    }
}

/// Calls `f` with the index of and a mutable reference to each item, on the
/// thread pool if there are at least `parallel_threshold` items.
pub(crate) fn for_each_indexed<T, F>(items: &mut [T], parallel_threshold: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut T) + Send + Sync,
{
    if items.len() >= parallel_threshold {
        items.par_iter_mut().enumerate().for_each(|(idx, item)| f(idx, item));
    } else {
        items.iter_mut().enumerate().for_each(|(idx, item)| f(idx, item));
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::ordering::order_vehicles;
    use crate::vehicle::{VehicleAttributes, VehicleStore};

    /// A ring road with sorted vehicles, for kernel tests.
    pub struct Scene {
        pub lanes: Vec<LaneInfo>,
        pub store: VehicleStore,
        pub occupancy: LaneOccupancy,
        pub config: SimulationConfig,
    }

    impl Scene {
        /// Creates parallel lanes of equal length, numbered left to right.
        pub fn new(lane_count: usize, length: f64, speed_limit: f64) -> Self {
            let lanes = (0..lane_count)
                .map(|i| {
                    let left = i.checked_sub(1);
                    let right = (i + 1 < lane_count).then(|| i + 1);
                    LaneInfo::new(length, speed_limit).with_adjacent(left, right)
                })
                .collect();
            Self {
                lanes,
                store: VehicleStore::new(),
                occupancy: LaneOccupancy::new(),
                config: SimulationConfig::sequential(),
            }
        }

        pub fn add(&mut self, attributes: &VehicleAttributes, lane: usize, pos: f64, speed: f64) -> crate::VehicleId {
            self.store.insert(attributes, lane, pos, speed)
        }

        pub fn order(&mut self) {
            order_vehicles(&mut self.store, self.lanes.len(), &mut self.occupancy, &self.config);
        }

        pub fn view(&self) -> RoadView<'_> {
            RoadView {
                lanes: &self.lanes,
                occupancy: &self.occupancy,
                vehicles: self.store.states(),
                idm: self.store.idm(),
                config: &self.config,
            }
        }

        pub fn accelerations(&self) -> Vec<f64> {
            let mut out = vec![0.0; self.store.len()];
            compute_accelerations(&self.view(), &mut out);
            out
        }
    }
}
