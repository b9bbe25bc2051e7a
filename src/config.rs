#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The smallest gap used by the car following model, in m.
const GAP_EPSILON: f64 = 0.01;

/// Kernels switch from a sequential loop to the thread pool at this many elements.
const PARALLEL_THRESHOLD: usize = 1024;

/// Tunable constants shared by the simulation kernels.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct SimulationConfig {
    /// Kernels over at least this many vehicles or light groups run on the
    /// rayon thread pool; smaller ones run sequentially.
    pub parallel_threshold: usize,
    /// The floor applied to the bumper-to-bumper gap by the car following model, in m.
    pub gap_epsilon_m: f64,
    /// The duration a lane change is stretched over at speed, in s.
    pub transition_time_s: f64,
    /// The speed assumed when sizing a lane change of a slow vehicle, in m/s.
    pub min_transition_speed_mps: f64,
    /// The shortest lane change, in m.
    pub min_transition_length_m: f64,
    /// The longest lane change, in m.
    pub max_transition_length_m: f64,
    /// The floor applied to a lane change's length when checking completion, in m.
    pub min_progress_length_m: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: PARALLEL_THRESHOLD,
            gap_epsilon_m: GAP_EPSILON,
            transition_time_s: 2.5,
            min_transition_speed_mps: 5.0,
            min_transition_length_m: 5.0,
            max_transition_length_m: 40.0,
            min_progress_length_m: 0.1,
        }
    }
}

impl SimulationConfig {
    /// A configuration which never uses the thread pool.
    pub fn sequential() -> Self {
        Self {
            parallel_threshold: usize::MAX,
            ..Default::default()
        }
    }

    /// Whether a kernel over `len` elements should run in parallel.
    pub fn is_parallel(&self, len: usize) -> bool {
        len >= self.parallel_threshold
    }

    /// The longitudinal distance over which a vehicle travelling
    /// at `speed` completes a lane change, in m.
    pub fn transition_length(&self, speed: f64) -> f64 {
        let length = self.transition_time_s * f64::max(self.min_transition_speed_mps, speed);
        length.clamp(self.min_transition_length_m, self.max_transition_length_m)
    }
}
