//! Sorting vehicles into lane order and indexing which vehicles occupy each lane.

use crate::lane::LaneVehicleRange;
use crate::vehicle::{VehicleState, VehicleStore};
use crate::SimulationConfig;
use itertools::Itertools;
use log::warn;

/// Maps each lane to the contiguous run of lane-sorted vehicles travelling in it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LaneOccupancy {
    ranges: Vec<LaneVehicleRange>,
}

impl LaneOccupancy {
    /// Creates an empty index.
    pub fn new() -> Self {
        Default::default()
    }

    /// The range of every lane, indexed by lane.
    pub fn ranges(&self) -> &[LaneVehicleRange] {
        &self.ranges
    }

    /// The range of vehicles in the given lane; empty for unknown lanes.
    pub fn range(&self, lane: usize) -> LaneVehicleRange {
        self.ranges.get(lane).copied().unwrap_or_default()
    }

    /// The total number of indexed vehicles.
    pub fn vehicle_count(&self) -> usize {
        self.ranges.iter().map(|range| range.count).sum()
    }

    /// Rebuilds the index from vehicles which are already sorted by lane.
    ///
    /// # Parameters
    /// * `vehicles` - The lane-sorted vehicles
    /// * `lane_count` - The number of lanes in the lane table
    pub fn rebuild(&mut self, vehicles: &[VehicleState], lane_count: usize) {
        debug_assert!(is_lane_sorted(vehicles), "vehicles are not sorted by lane");

        self.ranges.clear();
        self.ranges.resize(lane_count, LaneVehicleRange::default());

        let mut start = 0;
        for (lane, run) in &vehicles.iter().group_by(|vehicle| vehicle.lane_index) {
            let count = run.count();
            debug_assert!(lane < lane_count, "vehicle in lane {} of {}", lane, lane_count);
            match self.ranges.get_mut(lane) {
                Some(range) => *range = LaneVehicleRange { start, count },
                None => warn!("{} vehicles are in non-existent lane {}", count, lane),
            }
            start += count;
        }
    }
}

/// Checks that vehicles are in ascending lane order, and in position order within each lane.
pub fn is_lane_sorted(vehicles: &[VehicleState]) -> bool {
    vehicles
        .iter()
        .tuple_windows()
        .all(|(a, b)| a.cmp_lane_order(b).is_le())
}

/// Sorts the vehicles by lane and position and rebuilds the lane occupancy index.
/// This must run before anything looks up a vehicle's neighbours.
///
/// # Parameters
/// * `vehicles` - The vehicle store, sorted in place
/// * `lane_count` - The number of lanes in the lane table
/// * `occupancy` - The index to rebuild
/// * `config` - Decides whether the sort runs on the thread pool
pub fn order_vehicles(
    vehicles: &mut VehicleStore,
    lane_count: usize,
    occupancy: &mut LaneOccupancy,
    config: &SimulationConfig,
) {
    vehicles.sort_by_lane(config.is_parallel(vehicles.len()));
    occupancy.rebuild(vehicles.states(), lane_count);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::VehicleAttributes;
    use rand::{Rng, SeedableRng};

    fn store(vehicles: &[(usize, f64)]) -> VehicleStore {
        let mut store = VehicleStore::new();
        for (lane, pos) in vehicles {
            store.insert(&VehicleAttributes::default(), *lane, *pos, 0.0);
        }
        store
    }

    #[test]
    fn ranges_follow_lanes() {
        let mut vehicles = store(&[(2, 30.0), (0, 50.0), (2, 10.0), (0, 5.0), (2, 20.0)]);
        let mut occupancy = LaneOccupancy::new();
        order_vehicles(&mut vehicles, 4, &mut occupancy, &SimulationConfig::sequential());

        assert_eq!(
            occupancy.ranges(),
            &[
                LaneVehicleRange { start: 0, count: 2 },
                LaneVehicleRange { start: 0, count: 0 },
                LaneVehicleRange { start: 2, count: 3 },
                LaneVehicleRange { start: 0, count: 0 },
            ]
        );
        let positions = vehicles.states().iter().map(|v| v.position_m).collect::<Vec<_>>();
        assert_eq!(positions, vec![5.0, 50.0, 10.0, 20.0, 30.0]);
        assert_eq!(occupancy.range(17), LaneVehicleRange::default());
    }

    #[test]
    fn ordering_is_idempotent() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let layout = (0..200)
            .map(|_| (rng.gen_range(0..5), rng.gen_range(0.0..500.0)))
            .collect::<Vec<_>>();
        let mut vehicles = store(&layout);
        let mut occupancy = LaneOccupancy::new();
        let config = SimulationConfig::sequential();

        order_vehicles(&mut vehicles, 5, &mut occupancy, &config);
        let first = (vehicles.states().to_vec(), occupancy.clone());
        order_vehicles(&mut vehicles, 5, &mut occupancy, &config);
        assert_eq!(vehicles.states(), first.0.as_slice());
        assert_eq!(occupancy, first.1);

        assert_eq!(occupancy.vehicle_count(), 200);
        assert!(is_lane_sorted(vehicles.states()));
        for (lane, range) in occupancy.ranges().iter().enumerate() {
            let slice = &vehicles.states()[range.indices()];
            assert!(slice.iter().all(|v| v.lane_index == lane));
        }
    }

    #[test]
    fn parallel_sort_matches_sequential() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let layout = (0..500)
            .map(|_| (rng.gen_range(0..3), rng.gen_range(0.0..100.0)))
            .collect::<Vec<_>>();
        let mut a = store(&layout);
        let mut b = a.clone();
        let (mut occ_a, mut occ_b) = (LaneOccupancy::new(), LaneOccupancy::new());
        let parallel = SimulationConfig {
            parallel_threshold: 0,
            ..Default::default()
        };
        order_vehicles(&mut a, 3, &mut occ_a, &SimulationConfig::sequential());
        order_vehicles(&mut b, 3, &mut occ_b, &parallel);
        assert_eq!(a.states(), b.states());
        assert_eq!(occ_a, occ_b);
    }

    #[test]
    fn empty_store() {
        let mut vehicles = VehicleStore::new();
        let mut occupancy = LaneOccupancy::new();
        order_vehicles(&mut vehicles, 2, &mut occupancy, &SimulationConfig::default());
        assert_eq!(occupancy.ranges(), &[LaneVehicleRange::default(); 2]);
    }
}
