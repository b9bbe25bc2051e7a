use crate::error::{Result, SimulationError};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The parameters of the intelligent driver model for one vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IdmParameters {
    /// The speed the driver would travel at on an empty road, in m/s.
    pub desired_speed_mps: f64,
    /// The vehicle's maximum acceleration in m/s<sup>2</sup>.
    pub max_acceleration_mps2: f64,
    /// The comfortable deceleration, a positive number in m/s<sup>2</sup>.
    pub comfortable_braking_mps2: f64,
    /// The desired time gap to the vehicle ahead in s.
    pub headway_time_s: f64,
    /// The gap kept to the vehicle ahead when stopped, in m.
    pub min_gap_m: f64,
    /// How sharply the vehicle stops accelerating as it nears its desired speed.
    pub acceleration_exponent: f64,
}

impl Default for IdmParameters {
    fn default() -> Self {
        Self {
            desired_speed_mps: 33.3,
            max_acceleration_mps2: 1.5,
            comfortable_braking_mps2: 2.0,
            headway_time_s: 1.5,
            min_gap_m: 2.0,
            acceleration_exponent: 4.0,
        }
    }
}

impl IdmParameters {
    /// The speed the vehicle aims for on a lane with the given speed limit.
    pub fn target_speed(&self, speed_limit: f64) -> f64 {
        f64::min(self.desired_speed_mps, speed_limit)
    }

    /// Calculates the acceleration of the vehicle on an empty road.
    /// # Arguments
    /// * `speed` - The velocity of the simulated vehicle (m/s).
    /// * `speed_limit` - The current speed limit (m/s).
    pub fn free_road_acceleration(&self, speed: f64, speed_limit: f64) -> f64 {
        let target = self.target_speed(speed_limit);
        if target <= 0.0 {
            // A closed lane: brake to a standstill
            return if speed > 0.0 {
                -self.comfortable_braking_mps2
            } else {
                0.0
            };
        }
        self.max_acceleration_mps2 * (1.0 - (speed / target).powf(self.acceleration_exponent))
    }

    /// Calculates the desired gap to the vehicle ahead, in m.
    ///
    /// # Arguments
    /// * `speed` - The velocity of the simulated vehicle (m/s).
    /// * `approach` - How much faster the simulated vehicle is than the one ahead (m/s).
    pub fn desired_gap(&self, speed: f64, approach: f64) -> f64 {
        let factor = 1.0 / (2.0 * (self.max_acceleration_mps2 * self.comfortable_braking_mps2).sqrt());
        let dynamic = speed * self.headway_time_s + speed * approach * factor;
        self.min_gap_m + f64::max(0.0, dynamic)
    }

    /// Calculates the acceleration needed to follow the vehicle ahead.
    ///
    /// # Arguments
    /// * `speed` - The velocity of the simulated vehicle (m/s).
    /// * `speed_limit` - The current speed limit (m/s).
    /// * `gap` - The bumper-to-bumper distance to the vehicle ahead (m).
    /// * `leader_speed` - The vehicle ahead's velocity (m/s).
    /// * `gap_epsilon` - The smallest gap the model divides by (m).
    pub fn following_acceleration(
        &self,
        speed: f64,
        speed_limit: f64,
        gap: f64,
        leader_speed: f64,
        gap_epsilon: f64,
    ) -> f64 {
        let term = self.desired_gap(speed, speed - leader_speed) / f64::max(gap, gap_epsilon);
        self.free_road_acceleration(speed, speed_limit) - self.max_acceleration_mps2 * term * term
    }

    pub(crate) fn validate(&self) -> Result<()> {
        SimulationError::require_positive("desired speed", self.desired_speed_mps)?;
        SimulationError::require_positive("maximum acceleration", self.max_acceleration_mps2)?;
        SimulationError::require_positive("comfortable braking", self.comfortable_braking_mps2)?;
        SimulationError::require_non_negative("headway time", self.headway_time_s)?;
        SimulationError::require_non_negative("minimum gap", self.min_gap_m)?;
        SimulationError::require_positive("acceleration exponent", self.acceleration_exponent)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn params() -> IdmParameters {
        IdmParameters {
            desired_speed_mps: 20.0,
            max_acceleration_mps2: 2.0,
            comfortable_braking_mps2: 2.0,
            headway_time_s: 1.5,
            min_gap_m: 2.0,
            acceleration_exponent: 4.0,
        }
    }

    #[test]
    fn free_road() {
        let idm = params();
        assert_approx_eq!(idm.free_road_acceleration(0.0, 30.0), 2.0);
        assert_approx_eq!(idm.free_road_acceleration(20.0, 30.0), 0.0);
        assert_approx_eq!(idm.free_road_acceleration(10.0, 20.0), 2.0 * (1.0 - 0.0625));
        assert!(idm.free_road_acceleration(25.0, 30.0) < 0.0);
    }

    #[test]
    fn speed_limit_caps_desired_speed() {
        let idm = params();
        assert_approx_eq!(idm.target_speed(10.0), 10.0);
        assert_approx_eq!(idm.free_road_acceleration(10.0, 10.0), 0.0);
    }

    #[test]
    fn closed_lane_brakes() {
        let idm = params();
        assert_approx_eq!(idm.free_road_acceleration(5.0, 0.0), -2.0);
        assert_eq!(idm.free_road_acceleration(0.0, 0.0), 0.0);
    }

    #[test]
    fn desired_gap() {
        let idm = params();
        assert_approx_eq!(idm.desired_gap(0.0, 0.0), 2.0);
        assert_approx_eq!(idm.desired_gap(10.0, 0.0), 17.0);
        assert_approx_eq!(idm.desired_gap(10.0, 4.0), 27.0);
        // Pulling away never shrinks the gap below the minimum
        assert_approx_eq!(idm.desired_gap(10.0, -100.0), 2.0);
    }

    #[test]
    fn brakes_behind_stationary_leader() {
        let idm = params();
        let acc = idm.following_acceleration(5.0, 30.0, idm.min_gap_m, 0.0, 0.01);
        assert!(acc < 0.0);
    }

    #[test]
    fn zero_gap_is_finite() {
        let idm = params();
        let acc = idm.following_acceleration(10.0, 30.0, 0.0, 0.0, 0.01);
        assert!(acc.is_finite());
        assert!(acc < -1000.0);
    }

    #[test]
    fn distant_leader_is_free_road() {
        let idm = params();
        let free = idm.free_road_acceleration(10.0, 30.0);
        let follow = idm.following_acceleration(10.0, 30.0, 1e6, 10.0, 0.01);
        assert_approx_eq!(free, follow, 1e-6);
    }

    #[test]
    fn validation() {
        assert!(params().validate().is_ok());
        let bad = IdmParameters {
            comfortable_braking_mps2: 0.0,
            ..params()
        };
        assert!(bad.validate().is_err());
    }
}
