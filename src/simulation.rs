use crate::error::{Result, SimulationError};
use crate::kernel::{compute_accelerations, evaluate_lane_changes, integrate_vehicles, RoadView};
use crate::lane::LaneInfo;
use crate::light::{
    advance_light_groups, LightColor, TrafficLightGroupParameters, TrafficLightGroupState,
    TrafficLightLaneBinding,
};
use crate::ordering::{order_vehicles, LaneOccupancy};
use crate::util::wrap_position;
use crate::vehicle::{LaneChangeState, VehicleAttributes, VehicleState, VehicleStore};
use crate::{SimulationConfig, VehicleId};
use log::{debug, trace, warn};
use rand::Rng;
use rand_distr::Distribution;

/// A traffic simulation of vehicles travelling around a set of ring-shaped lanes.
#[derive(Clone, Debug, Default)]
pub struct Simulation {
    /// The lane table.
    lanes: Vec<LaneInfo>,
    /// The vehicles being simulated.
    vehicles: VehicleStore,
    /// Which lane-sorted vehicles are in each lane.
    occupancy: LaneOccupancy,
    /// Whether vehicles were added or removed since they were last sorted.
    unordered: bool,
    /// The acceleration of each vehicle computed during the last step.
    accelerations: Vec<f64>,
    /// The timing of each traffic light group.
    light_params: Vec<TrafficLightGroupParameters>,
    /// The phase of each traffic light group.
    light_states: Vec<TrafficLightGroupState>,
    /// The stop lines of the traffic light groups.
    light_bindings: Vec<TrafficLightLaneBinding>,
    /// Kernel tuning.
    config: SimulationConfig,
    /// The current frame of simulation.
    frame: usize,
    /// The simulated time in s.
    time: f64,
}

impl Simulation {
    /// Creates a new simulation.
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a new simulation with the given kernel configuration.
    pub fn with_config(config: SimulationConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Adds a lane to the network, returning its index.
    /// Adjacent lanes are specified afterwards with [set_adjacent_lanes](Self::set_adjacent_lanes).
    pub fn add_lane(&mut self, length_m: f64, speed_limit_mps: f64) -> Result<usize> {
        let lane = LaneInfo::new(length_m, speed_limit_mps);
        lane.validate().map_err(rejected)?;
        self.lanes.push(lane);
        self.unordered = true;
        debug!("added lane {} ({} m at {} m/s)", self.lanes.len() - 1, length_m, speed_limit_mps);
        Ok(self.lanes.len() - 1)
    }

    /// Specifies the lanes which vehicles in `lane` may change into.
    pub fn set_adjacent_lanes(
        &mut self,
        lane: usize,
        left: Option<usize>,
        right: Option<usize>,
    ) -> Result<()> {
        self.check_adjacent_lanes(lane, left, right).map_err(rejected)?;
        self.lanes[lane] = self.lanes[lane].with_adjacent(left, right);
        Ok(())
    }

    /// Adds a vehicle to the simulation.
    ///
    /// # Parameters
    /// * `attributes` - The vehicle's size and driving behaviour
    /// * `lane` - The lane to place the vehicle in
    /// * `pos` - The longitudinal position of the vehicle's centre, wrapped onto the lane
    /// * `speed` - The initial velocity in m/s
    pub fn add_vehicle(
        &mut self,
        attributes: &VehicleAttributes,
        lane: usize,
        pos: f64,
        speed: f64,
    ) -> Result<VehicleId> {
        self.check_vehicle(attributes, lane, pos, speed).map_err(rejected)?;

        let pos = wrap_position(pos, self.lanes[lane].length_m);
        let id = self.vehicles.insert(attributes, lane, pos, speed);
        self.unordered = true;
        debug!("added vehicle {:?} to lane {} at {:.1} m", id, lane, pos);
        Ok(id)
    }

    /// Removes a vehicle from the simulation.
    pub fn remove_vehicle(&mut self, id: VehicleId) -> Result<VehicleState> {
        let state = self
            .vehicles
            .remove(id)
            .ok_or(SimulationError::UnknownVehicle(id))
            .map_err(rejected)?;
        self.unordered = true;
        debug!("removed vehicle {:?} from lane {}", id, state.lane_index);
        Ok(state)
    }

    /// Randomly scales the desired speed of each vehicle by a factor sampled from
    /// a normal distribution with a mean of 1 (no adjustment) and standard deviation
    /// of `stddev`, limited to between 0.75 and 1.25. The factor replaces any
    /// earlier one rather than compounding it.
    pub fn randomise_desired_speeds(&mut self, stddev: f64) -> Result<()> {
        self.randomise_desired_speeds_with(stddev, &mut rand::thread_rng())
    }

    /// Like [randomise_desired_speeds](Self::randomise_desired_speeds), drawing from `rng`.
    pub fn randomise_desired_speeds_with(&mut self, stddev: f64, rng: &mut impl Rng) -> Result<()> {
        SimulationError::require_non_negative("standard deviation", stddev).map_err(rejected)?;
        let distr = rand_distr::Normal::new(1.0, stddev).map_err(|_| {
            rejected(SimulationError::InvalidParameter {
                name: "standard deviation",
                value: stddev,
            })
        })?;
        for idx in 0..self.vehicles.len() {
            let factor = distr.sample(rng).clamp(0.75, 1.25);
            self.vehicles.set_desired_speed_adjust(idx, factor);
        }
        Ok(())
    }

    /// Adds a traffic light group, returning its index.
    pub fn add_light_group(&mut self, params: TrafficLightGroupParameters) -> Result<usize> {
        params.validate().map_err(rejected)?;
        self.light_params.push(params);
        self.light_states.push(params.initial_state());
        debug!("added traffic light group {}", self.light_params.len() - 1);
        Ok(self.light_params.len() - 1)
    }

    /// Places the stop line of a traffic light group on a lane.
    pub fn bind_light(&mut self, binding: TrafficLightLaneBinding) -> Result<()> {
        self.check_binding(&binding).map_err(rejected)?;
        self.light_bindings.push(binding);
        Ok(())
    }

    fn check_binding(&self, binding: &TrafficLightLaneBinding) -> Result<()> {
        self.check_lane(binding.lane_index)?;
        if binding.group_index >= self.light_params.len() {
            return Err(SimulationError::UnknownLightGroup(binding.group_index));
        }
        let length = self.lanes[binding.lane_index].length_m;
        if !(0.0..length).contains(&binding.stop_line_position_m) {
            return Err(SimulationError::StopLineOutOfRange {
                lane: binding.lane_index,
                position: binding.stop_line_position_m,
                length,
            });
        }
        Ok(())
    }

    /// Advances the simulation by `dt` seconds.
    ///
    /// For a realistic simulation, do not use a time step greater than around 0.2.
    pub fn step(&mut self, dt: f64) {
        if !dt.is_finite() || dt < 0.0 {
            warn!("ignoring invalid time step {}", dt);
            return;
        }

        let Self {
            lanes,
            vehicles,
            occupancy,
            unordered,
            accelerations,
            light_params,
            light_states,
            config,
            ..
        } = self;
        let config = &*config;

        // The light groups are independent of the vehicles
        rayon::join(
            || advance_light_groups(light_params, light_states, dt, config.parallel_threshold),
            || {
                if *unordered {
                    order_vehicles(vehicles, lanes.len(), occupancy, config);
                }
                step_vehicles(lanes, vehicles, occupancy, accelerations, config, dt);
                *unordered = false;
            },
        );

        self.frame += 1;
        self.time += dt;
        trace!(
            "frame {}: {} vehicles, {} changing lanes",
            self.frame,
            self.vehicles.len(),
            self.vehicles.lane_changes().iter().filter(|lc| lc.active).count()
        );
    }

    /// Gets the current simulation frame index.
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Gets the simulated time in s.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// The lane table.
    pub fn lanes(&self) -> &[LaneInfo] {
        &self.lanes
    }

    /// Gets the lane with the given index.
    pub fn lane(&self, lane: usize) -> Option<&LaneInfo> {
        self.lanes.get(lane)
    }

    /// The vehicles, sorted by lane and position as of the end of the last step.
    pub fn vehicles(&self) -> &[VehicleState] {
        self.vehicles.states()
    }

    /// The vehicle store, including each vehicle's model parameters.
    pub fn vehicle_store(&self) -> &VehicleStore {
        &self.vehicles
    }

    /// Returns an iterator over all the vehicles in the simulation.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &VehicleState> {
        self.vehicles.states().iter()
    }

    /// Gets the vehicle with the given ID.
    pub fn vehicle(&self, id: VehicleId) -> Option<&VehicleState> {
        self.vehicles.get(id)
    }

    /// Gets the lane change state of the vehicle with the given ID.
    pub fn lane_change(&self, id: VehicleId) -> Option<&LaneChangeState> {
        self.vehicles.lane_change(id)
    }

    /// Mutable access to a vehicle's lane change state, for attaching rendering geometry.
    pub fn lane_change_mut(&mut self, id: VehicleId) -> Option<&mut LaneChangeState> {
        self.vehicles.lane_change_mut(id)
    }

    /// The lane occupancy index as of the end of the last step.
    pub fn occupancy(&self) -> &LaneOccupancy {
        &self.occupancy
    }

    /// The vehicles in the given lane in position order, as of the end of the last step.
    /// Empty if lanes or vehicles have been added or removed since then.
    pub fn lane_vehicles(&self, lane: usize) -> &[VehicleState] {
        if self.unordered {
            return &[];
        }
        &self.vehicles.states()[self.occupancy.range(lane).indices()]
    }

    /// The accelerations computed during the last step, indexed like the vehicles
    /// were before that step's integration.
    pub fn accelerations(&self) -> &[f64] {
        &self.accelerations
    }

    /// Returns an iterator over all the traffic light groups and their current phase.
    pub fn iter_light_groups(
        &self,
    ) -> impl Iterator<Item = (&TrafficLightGroupParameters, &TrafficLightGroupState)> {
        self.light_params.iter().zip(&self.light_states)
    }

    /// The colour currently shown by a traffic light group.
    pub fn light_color(&self, group: usize) -> Option<LightColor> {
        let params = self.light_params.get(group)?;
        Some(self.light_states[group].color(params))
    }

    /// The stop lines of the traffic light groups.
    pub fn light_bindings(&self) -> &[TrafficLightLaneBinding] {
        &self.light_bindings
    }

    /// Gets the debugging information for the current frame as JSON.
    #[cfg(feature = "debug")]
    pub fn debug_frame(&self) -> serde_json::Value {
        crate::debug::frame_json(self)
    }

    fn check_lane(&self, lane: usize) -> Result<()> {
        if lane < self.lanes.len() {
            Ok(())
        } else {
            Err(SimulationError::UnknownLane(lane))
        }
    }

    fn check_adjacent_lanes(&self, lane: usize, left: Option<usize>, right: Option<usize>) -> Result<()> {
        self.check_lane(lane)?;
        for adjacent in [left, right].into_iter().flatten() {
            self.check_lane(adjacent)?;
            if adjacent == lane {
                return Err(SimulationError::SelfAdjacent { lane });
            }
        }
        Ok(())
    }

    fn check_vehicle(&self, attributes: &VehicleAttributes, lane: usize, pos: f64, speed: f64) -> Result<()> {
        self.check_lane(lane)?;
        attributes.validate()?;
        SimulationError::require_non_negative("initial speed", speed)?;
        if pos.is_finite() {
            Ok(())
        } else {
            Err(SimulationError::InvalidParameter {
                name: "initial position",
                value: pos,
            })
        }
    }
}

/// Logs input refused by the simulation.
fn rejected(err: SimulationError) -> SimulationError {
    warn!("rejected: {}", err);
    err
}

/// Runs the car following, lane changing and integration kernels over sorted
/// vehicles, then re-sorts them ready for the next step.
fn step_vehicles(
    lanes: &[LaneInfo],
    vehicles: &mut VehicleStore,
    occupancy: &mut LaneOccupancy,
    accelerations: &mut Vec<f64>,
    config: &SimulationConfig,
    dt: f64,
) {
    accelerations.clear();
    accelerations.resize(vehicles.len(), 0.0);

    let columns = vehicles.columns_mut();
    let view = RoadView {
        lanes,
        occupancy,
        vehicles: &*columns.states,
        idm: columns.idm,
        config,
    };
    compute_accelerations(&view, accelerations);
    evaluate_lane_changes(&view, columns.mobil, accelerations, columns.lane_changes);
    integrate_vehicles(
        lanes,
        columns.mobil,
        accelerations,
        columns.states,
        columns.lane_changes,
        config,
        dt,
    );

    order_vehicles(vehicles, lanes.len(), occupancy, config);
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng;

    fn two_lane_road() -> Simulation {
        let mut sim = Simulation::new();
        let a = sim.add_lane(200.0, 20.0).unwrap();
        let b = sim.add_lane(200.0, 20.0).unwrap();
        sim.set_adjacent_lanes(a, None, Some(b)).unwrap();
        sim.set_adjacent_lanes(b, Some(a), None).unwrap();
        sim
    }

    #[test]
    fn rejects_bad_input() {
        let mut sim = two_lane_road();
        let attributes = VehicleAttributes::default();
        assert_eq!(sim.add_lane(-5.0, 10.0).unwrap_err(), SimulationError::InvalidParameter {
            name: "lane length",
            value: -5.0,
        });
        assert_eq!(sim.set_adjacent_lanes(0, Some(0), None), Err(SimulationError::SelfAdjacent { lane: 0 }));
        assert_eq!(sim.set_adjacent_lanes(0, Some(7), None), Err(SimulationError::UnknownLane(7)));
        assert_eq!(sim.add_vehicle(&attributes, 9, 0.0, 0.0), Err(SimulationError::UnknownLane(9)));
        assert!(sim.add_vehicle(&attributes, 0, f64::NAN, 0.0).is_err());
        assert!(sim.add_vehicle(&attributes, 0, 0.0, -1.0).is_err());
        assert!(sim
            .bind_light(TrafficLightLaneBinding {
                lane_index: 0,
                group_index: 0,
                stop_line_position_m: 50.0,
            })
            .is_err());

        let group = sim.add_light_group(TrafficLightGroupParameters::default()).unwrap();
        assert_eq!(
            sim.bind_light(TrafficLightLaneBinding {
                lane_index: 0,
                group_index: group,
                stop_line_position_m: 250.0,
            }),
            Err(SimulationError::StopLineOutOfRange {
                lane: 0,
                position: 250.0,
                length: 200.0,
            })
        );
        assert!(sim
            .add_light_group(TrafficLightGroupParameters {
                red_s: -1.0,
                ..Default::default()
            })
            .is_err());

        // Nothing rejected was kept
        assert_eq!(sim.lanes().len(), 2);
        assert!(sim.vehicles().is_empty());
        assert!(sim.light_bindings().is_empty());
        assert_eq!(sim.iter_light_groups().count(), 1);
        assert_eq!(sim.lanes()[0].left_lane_index, None);
    }

    #[test]
    fn wraps_initial_position() {
        let mut sim = two_lane_road();
        let id = sim.add_vehicle(&VehicleAttributes::default(), 1, 250.0, 0.0).unwrap();
        assert_eq!(sim.vehicle(id).unwrap().position_m, 50.0);
    }

    #[test]
    fn remove_vehicle() {
        let mut sim = two_lane_road();
        let attributes = VehicleAttributes::default();
        let a = sim.add_vehicle(&attributes, 0, 10.0, 5.0).unwrap();
        let b = sim.add_vehicle(&attributes, 0, 50.0, 5.0).unwrap();
        sim.step(0.1);
        assert_eq!(sim.remove_vehicle(a).unwrap().vehicle_id, a);
        assert_eq!(sim.remove_vehicle(a), Err(SimulationError::UnknownVehicle(a)));
        sim.step(0.1);
        assert_eq!(sim.lane_vehicles(0).len(), 1);
        assert_eq!(sim.lane_vehicles(0)[0].vehicle_id, b);
    }

    #[test]
    fn lights_advance_with_steps() {
        let mut sim = two_lane_road();
        let group = sim
            .add_light_group(TrafficLightGroupParameters {
                green_s: 1.0,
                amber_s: 1.0,
                red_s: 1.0,
                ..Default::default()
            })
            .unwrap();
        sim.bind_light(TrafficLightLaneBinding {
            lane_index: 0,
            group_index: group,
            stop_line_position_m: 150.0,
        })
        .unwrap();

        assert_eq!(sim.light_color(group), Some(LightColor::Green));
        for _ in 0..12 {
            sim.step(0.125);
        }
        assert_eq!(sim.light_color(group), Some(LightColor::Amber));
        for _ in 0..8 {
            sim.step(0.125);
        }
        assert_eq!(sim.light_color(group), Some(LightColor::Red));
        assert_eq!(sim.light_color(5), None);
        assert_eq!(sim.light_bindings().len(), 1);
    }

    #[test]
    fn ignores_invalid_time_step() {
        let mut sim = two_lane_road();
        sim.step(-1.0);
        sim.step(f64::NAN);
        assert_eq!(sim.frame(), 0);
        sim.step(0.5);
        assert_eq!(sim.frame(), 1);
        assert_eq!(sim.time(), 0.5);
    }

    #[test]
    fn randomised_speeds_stay_in_bounds() {
        let mut sim = two_lane_road();
        let attributes = VehicleAttributes::default();
        for i in 0..50 {
            sim.add_vehicle(&attributes, i % 2, i as f64 * 8.0, 0.0).unwrap();
        }
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        let base = attributes.idm.desired_speed_mps;
        // Repeated calls replace the adjustment rather than compounding it
        for _ in 0..10 {
            sim.randomise_desired_speeds_with(0.5, &mut rng).unwrap();
            for idm in sim.vehicle_store().idm() {
                assert!(idm.desired_speed_mps >= 0.75 * base - 1e-9);
                assert!(idm.desired_speed_mps <= 1.25 * base + 1e-9);
            }
        }
        assert_eq!(
            sim.randomise_desired_speeds_with(-1.0, &mut rng),
            Err(SimulationError::InvalidParameter {
                name: "standard deviation",
                value: -1.0,
            })
        );
        assert!(sim.randomise_desired_speeds_with(f64::NAN, &mut rng).is_err());
    }
}
