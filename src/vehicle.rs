pub use self::acceleration::IdmParameters;
pub use self::dynamics::{integrate, Motion};
pub use self::lane_change::{LaneChangeGeometry, LaneChangeState, MobilParameters};
use crate::error::Result;
use crate::VehicleId;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use std::cmp::Ordering;

mod acceleration;
mod dynamics;
mod lane_change;

/// The kinematic state of a simulated vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VehicleState {
    /// The vehicle's ID
    pub vehicle_id: VehicleId,
    /// The lane the vehicle is travelling in.
    pub lane_index: usize,
    /// The longitudinal position of the centre of the vehicle in m.
    pub position_m: f64,
    /// The velocity in m/s.
    pub speed_mps: f64,
    /// The acceleration applied over the last step in m/s<sup>2</sup>.
    pub acceleration_mps2: f64,
    /// The vehicle's length in m.
    pub length_m: f64,
}

/// The attributes of a simulated vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VehicleAttributes {
    /// The vehicle length in m.
    pub length: f64,
    /// The car following model parameters.
    pub idm: IdmParameters,
    /// The lane changing model parameters.
    pub mobil: MobilParameters,
}

impl Default for VehicleAttributes {
    fn default() -> Self {
        Self {
            length: 4.5,
            idm: Default::default(),
            mobil: Default::default(),
        }
    }
}

impl VehicleState {
    /// Compares two vehicles by lane, then position, then ID.
    pub fn cmp_lane_order(&self, other: &Self) -> Ordering {
        self.lane_index
            .cmp(&other.lane_index)
            .then(self.position_m.total_cmp(&other.position_m))
            .then(self.vehicle_id.cmp(&other.vehicle_id))
    }
}

impl VehicleAttributes {
    pub(crate) fn validate(&self) -> Result<()> {
        crate::SimulationError::require_positive("vehicle length", self.length)?;
        self.idm.validate()?;
        self.mobil.validate()
    }
}

/// The vehicles being simulated, stored as parallel columns indexed by a dense
/// vehicle index. The index of a vehicle changes whenever the store is sorted;
/// its [VehicleId] does not.
#[derive(Clone, Debug, Default)]
pub struct VehicleStore {
    /// Maps each vehicle's ID to its current index.
    ids: SlotMap<VehicleId, usize>,
    states: Vec<VehicleState>,
    idm: Vec<IdmParameters>,
    /// The desired speed of each vehicle before any adjustment, in m/s.
    base_desired_speeds: Vec<f64>,
    mobil: Vec<MobilParameters>,
    lane_changes: Vec<LaneChangeState>,
}

/// Disjoint borrows of the columns of a [VehicleStore].
pub struct VehicleColumns<'a> {
    pub states: &'a mut [VehicleState],
    pub idm: &'a [IdmParameters],
    pub mobil: &'a [MobilParameters],
    pub lane_changes: &'a mut [LaneChangeState],
}

impl VehicleStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Default::default()
    }

    /// The number of vehicles.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Adds a vehicle at the end of the store. The store is
    /// no longer lane-sorted until [sort_by_lane](Self::sort_by_lane) is called.
    pub fn insert(
        &mut self,
        attributes: &VehicleAttributes,
        lane_index: usize,
        position_m: f64,
        speed_mps: f64,
    ) -> VehicleId {
        let vehicle_id = self.ids.insert(self.states.len());
        self.states.push(VehicleState {
            vehicle_id,
            lane_index,
            position_m,
            speed_mps,
            acceleration_mps2: 0.0,
            length_m: attributes.length,
        });
        self.idm.push(attributes.idm);
        self.base_desired_speeds.push(attributes.idm.desired_speed_mps);
        self.mobil.push(attributes.mobil);
        self.lane_changes.push(LaneChangeState::default());
        vehicle_id
    }

    /// Removes a vehicle, moving the last vehicle into its slot.
    pub fn remove(&mut self, id: VehicleId) -> Option<VehicleState> {
        let idx = self.ids.remove(id)?;
        let state = self.states.swap_remove(idx);
        self.idm.swap_remove(idx);
        self.base_desired_speeds.swap_remove(idx);
        self.mobil.swap_remove(idx);
        self.lane_changes.swap_remove(idx);
        if let Some(moved) = self.states.get(idx) {
            self.ids[moved.vehicle_id] = idx;
        }
        Some(state)
    }

    /// Gets the current index of the vehicle with the given ID.
    pub fn index_of(&self, id: VehicleId) -> Option<usize> {
        self.ids.get(id).copied()
    }

    pub fn contains(&self, id: VehicleId) -> bool {
        self.ids.contains_key(id)
    }

    /// Gets the state of the vehicle with the given ID.
    pub fn get(&self, id: VehicleId) -> Option<&VehicleState> {
        self.index_of(id).map(|idx| &self.states[idx])
    }

    /// Gets the lane change state of the vehicle with the given ID.
    pub fn lane_change(&self, id: VehicleId) -> Option<&LaneChangeState> {
        self.index_of(id).map(|idx| &self.lane_changes[idx])
    }

    /// Mutable access to a vehicle's lane change state, so that a renderer can attach geometry.
    pub fn lane_change_mut(&mut self, id: VehicleId) -> Option<&mut LaneChangeState> {
        self.index_of(id).map(|idx| &mut self.lane_changes[idx])
    }

    pub fn states(&self) -> &[VehicleState] {
        &self.states
    }

    pub fn idm(&self) -> &[IdmParameters] {
        &self.idm
    }

    /// Sets the desired speed of the vehicle at `idx` to its original desired speed
    /// scaled by `factor`, replacing any earlier adjustment.
    pub fn set_desired_speed_adjust(&mut self, idx: usize, factor: f64) {
        self.idm[idx].desired_speed_mps = self.base_desired_speeds[idx] * factor;
    }

    pub fn mobil(&self) -> &[MobilParameters] {
        &self.mobil
    }

    pub fn lane_changes(&self) -> &[LaneChangeState] {
        &self.lane_changes
    }

    /// Splits the store into its columns so that kernels may read some while writing others.
    pub fn columns_mut(&mut self) -> VehicleColumns<'_> {
        VehicleColumns {
            states: &mut self.states,
            idm: &self.idm,
            mobil: &self.mobil,
            lane_changes: &mut self.lane_changes,
        }
    }

    /// Sorts every column by lane, then by position within the lane.
    /// Returns `false` if the store was already sorted.
    ///
    /// # Parameters
    /// * `parallel` - Whether to sort on the thread pool
    pub fn sort_by_lane(&mut self, parallel: bool) -> bool {
        use rayon::slice::ParallelSliceMut;

        let states = &self.states;
        let mut order = (0..states.len()).collect::<Vec<_>>();
        let compare = |a: &usize, b: &usize| states[*a].cmp_lane_order(&states[*b]);
        if parallel {
            order.par_sort_unstable_by(compare);
        } else {
            order.sort_unstable_by(compare);
        }

        if order.iter().enumerate().all(|(i, j)| i == *j) {
            return false;
        }

        self.states = permute(&self.states, &order);
        self.idm = permute(&self.idm, &order);
        self.base_desired_speeds = permute(&self.base_desired_speeds, &order);
        self.mobil = permute(&self.mobil, &order);
        self.lane_changes = permute(&self.lane_changes, &order);
        for (idx, state) in self.states.iter().enumerate() {
            self.ids[state.vehicle_id] = idx;
        }
        true
    }
}

/// Gathers `items` into the given order.
fn permute<T: Copy>(items: &[T], order: &[usize]) -> Vec<T> {
    order.iter().map(|idx| items[*idx]).collect()
}
