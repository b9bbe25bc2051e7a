use crate::error::{Result, SimulationError};
use crate::math::{CubicFn, Point2d};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The parameters of the MOBIL lane changing model for one vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MobilParameters {
    /// How much the driver weighs the effect of a lane change on others, from 0 to 1.
    pub politeness: f64,
    /// The acceleration gain needed before changing lanes, in m/s<sup>2</sup>.
    pub advantage_threshold_mps2: f64,
    /// The hardest braking a lane change may impose on the new follower,
    /// a positive number in m/s<sup>2</sup>.
    pub safe_braking_deceleration_mps2: f64,
    /// The time after a lane change before another may begin, in s.
    pub min_time_between_changes_s: f64,
}

impl Default for MobilParameters {
    fn default() -> Self {
        Self {
            politeness: 0.3,
            advantage_threshold_mps2: 0.2,
            safe_braking_deceleration_mps2: 4.0,
            min_time_between_changes_s: 3.0,
        }
    }
}

impl MobilParameters {
    pub(crate) fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.politeness) {
            return Err(SimulationError::InvalidParameter {
                name: "politeness",
                value: self.politeness,
            });
        }
        SimulationError::require_non_negative("advantage threshold", self.advantage_threshold_mps2)?;
        SimulationError::require_non_negative(
            "safe braking deceleration",
            self.safe_braking_deceleration_mps2,
        )?;
        SimulationError::require_non_negative(
            "time between lane changes",
            self.min_time_between_changes_s,
        )
    }
}

/// World space control points of the curve a vehicle follows while changing lanes.
///
/// The simulation never computes these; they belong to whoever draws the vehicles.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LaneChangeGeometry {
    pub control_points: [Point2d; 4],
}

/// The lane change state of a vehicle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LaneChangeState {
    /// Whether a lane change is in progress.
    pub active: bool,
    /// The lane the vehicle is leaving.
    pub source_lane: usize,
    /// The lane the vehicle is moving into.
    pub target_lane: usize,
    /// The distance travelled since the lane change began, in m.
    pub progress_m: f64,
    /// The distance over which the lane change takes place, in m.
    pub longitudinal_length_m: f64,
    /// The time before another lane change may begin, in s.
    pub cooldown_s: f64,
    /// Rendering geometry, if it has been supplied.
    pub geometry: Option<LaneChangeGeometry>,
}

impl LaneChangeState {
    /// Whether a new lane change is currently forbidden.
    pub fn is_blocked(&self) -> bool {
        self.active || self.cooldown_s > 0.0
    }

    /// The fraction of the lane change distance covered so far.
    pub fn fraction(&self) -> f64 {
        if !self.active || self.longitudinal_length_m <= 0.0 {
            return 0.0;
        }
        (self.progress_m / self.longitudinal_length_m).clamp(0.0, 1.0)
    }

    /// How far the vehicle has moved sideways from the source lane towards
    /// the target lane, from 0 to 1, easing in and out of the manoeuvre.
    pub fn lateral_fraction(&self) -> f64 {
        if !self.active || self.longitudinal_length_m <= 0.0 {
            return 0.0;
        }
        let length = self.longitudinal_length_m;
        CubicFn::from_ends(0.0, 0.0, length, 1.0).y(self.progress_m.clamp(0.0, length))
    }

    /// Starts a lane change.
    pub(crate) fn begin(&mut self, source_lane: usize, target_lane: usize, length: f64) {
        self.active = true;
        self.source_lane = source_lane;
        self.target_lane = target_lane;
        self.progress_m = 0.0;
        self.longitudinal_length_m = length;
        self.geometry = None;
    }

    /// Advances the lane change by the distance `ds` travelled over `dt` seconds.
    /// Returns the target lane if the lane change completed.
    ///
    /// # Parameters
    /// * `ds` - The distance travelled in m
    /// * `dt` - The time step in s
    /// * `cooldown` - The time before the next lane change may begin, in s
    /// * `min_length` - The floor applied to `longitudinal_length_m`
    pub(crate) fn advance(&mut self, ds: f64, dt: f64, cooldown: f64, min_length: f64) -> Option<usize> {
        if !self.active {
            if self.cooldown_s > 0.0 {
                self.cooldown_s = f64::max(self.cooldown_s - dt, 0.0);
            }
            return None;
        }

        self.progress_m += ds;
        if self.progress_m < f64::max(self.longitudinal_length_m, min_length) {
            return None;
        }

        self.active = false;
        self.progress_m = 0.0;
        self.geometry = None;
        self.cooldown_s = f64::max(self.cooldown_s, cooldown);
        Some(self.target_lane)
    }
}
