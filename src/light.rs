use crate::error::{Result, SimulationError};
use crate::kernel::for_each_indexed;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The colour shown by a traffic light group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LightColor {
    Green,
    Amber,
    Red,
}

/// The fixed timing of a group of traffic lights which change together.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrafficLightGroupParameters {
    /// The duration of the green phase in s.
    pub green_s: f64,
    /// The duration of the amber phase in s.
    pub amber_s: f64,
    /// The duration of the red phase in s.
    pub red_s: f64,
    /// Where in the cycle the group starts, in s.
    pub start_offset_s: f64,
    /// The distance before the stop line within which a vehicle proceeds through amber, in m.
    pub amber_stop_buffer_m: f64,
}

/// The phase timer of a traffic light group.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrafficLightGroupState {
    /// The time since the start of the green phase, in s.
    pub time_in_cycle_s: f64,
}

/// Places the stop line of a traffic light group on a lane.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrafficLightLaneBinding {
    pub lane_index: usize,
    pub group_index: usize,
    /// The longitudinal position of the stop line in m.
    pub stop_line_position_m: f64,
}

impl Default for TrafficLightGroupParameters {
    fn default() -> Self {
        Self {
            green_s: 30.0,
            amber_s: 4.0,
            red_s: 30.0,
            start_offset_s: 0.0,
            amber_stop_buffer_m: 10.0,
        }
    }
}

impl TrafficLightGroupParameters {
    /// The length of a full green, amber, red cycle in s.
    pub fn total_cycle_s(&self) -> f64 {
        self.green_s + self.amber_s + self.red_s
    }

    /// The state of the group at the start of the simulation.
    pub fn initial_state(&self) -> TrafficLightGroupState {
        let total = self.total_cycle_s();
        let time_in_cycle_s = if total > 0.0 {
            self.start_offset_s.rem_euclid(total)
        } else {
            0.0
        };
        TrafficLightGroupState { time_in_cycle_s }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        SimulationError::require_non_negative("green time", self.green_s)?;
        SimulationError::require_non_negative("amber time", self.amber_s)?;
        SimulationError::require_non_negative("red time", self.red_s)?;
        SimulationError::require_non_negative("amber stop buffer", self.amber_stop_buffer_m)?;
        if self.start_offset_s.is_finite() {
            Ok(())
        } else {
            Err(SimulationError::InvalidParameter {
                name: "start offset",
                value: self.start_offset_s,
            })
        }
    }
}

impl TrafficLightGroupState {
    /// Advances the phase timer by `dt` seconds, wrapping at the end of the cycle.
    /// A group with an empty cycle never advances.
    pub fn advance(&mut self, params: &TrafficLightGroupParameters, dt: f64) {
        let total = params.total_cycle_s();
        if total > 0.0 {
            self.time_in_cycle_s = (self.time_in_cycle_s + dt).rem_euclid(total);
        }
    }

    /// The colour currently shown.
    pub fn color(&self, params: &TrafficLightGroupParameters) -> LightColor {
        evaluate_color(self.time_in_cycle_s, params)
    }
}

/// Determines the colour a traffic light group shows `t` seconds into its cycle.
/// Times beyond the cycle wrap around; an empty cycle is always red.
pub fn evaluate_color(t: f64, params: &TrafficLightGroupParameters) -> LightColor {
    let total = params.total_cycle_s();
    if total <= 0.0 {
        return LightColor::Red;
    }
    let t = t.rem_euclid(total);
    if t < params.green_s {
        LightColor::Green
    } else if t < params.green_s + params.amber_s {
        LightColor::Amber
    } else {
        LightColor::Red
    }
}

/// Advances the phase timer of every traffic light group by `dt` seconds.
///
/// # Parameters
/// * `params` - The timing of each group
/// * `states` - The phase timer of each group
/// * `dt` - The time step in seconds
/// * `parallel_threshold` - Use the thread pool for at least this many groups
pub fn advance_light_groups(
    params: &[TrafficLightGroupParameters],
    states: &mut [TrafficLightGroupState],
    dt: f64,
    parallel_threshold: usize,
) {
    debug_assert_eq!(params.len(), states.len());
    for_each_indexed(states, parallel_threshold, |idx, state| {
        if let Some(params) = params.get(idx) {
            state.advance(params, dt);
        }
    });
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn params() -> TrafficLightGroupParameters {
        TrafficLightGroupParameters {
            green_s: 10.0,
            amber_s: 3.0,
            red_s: 7.0,
            start_offset_s: 0.0,
            amber_stop_buffer_m: 5.0,
        }
    }

    #[test]
    fn color_cycle() {
        let params = params();
        assert_eq!(evaluate_color(0.0, &params), LightColor::Green);
        assert_eq!(evaluate_color(9.99, &params), LightColor::Green);
        assert_eq!(evaluate_color(10.0, &params), LightColor::Amber);
        assert_eq!(evaluate_color(12.99, &params), LightColor::Amber);
        assert_eq!(evaluate_color(13.0, &params), LightColor::Red);
        assert_eq!(evaluate_color(19.99, &params), LightColor::Red);
        assert_eq!(evaluate_color(20.0, &params), LightColor::Green);
        assert_eq!(evaluate_color(21.0, &params), LightColor::Green);
    }

    #[test]
    fn empty_cycle_is_red() {
        let params = TrafficLightGroupParameters {
            green_s: 0.0,
            amber_s: 0.0,
            red_s: 0.0,
            ..params()
        };
        assert_eq!(evaluate_color(5.0, &params), LightColor::Red);

        let mut state = params.initial_state();
        state.advance(&params, 1.0);
        assert_eq!(state.time_in_cycle_s, 0.0);
    }

    #[test]
    fn timer_wraps() {
        let params = params();
        let mut state = TrafficLightGroupState { time_in_cycle_s: 19.5 };
        state.advance(&params, 1.0);
        assert_approx_eq!(state.time_in_cycle_s, 0.5);
        assert_eq!(state.color(&params), LightColor::Green);
    }

    #[test]
    fn start_offset() {
        let params = TrafficLightGroupParameters {
            start_offset_s: 31.0,
            ..params()
        };
        let state = params.initial_state();
        assert_approx_eq!(state.time_in_cycle_s, 11.0);
        assert_eq!(state.color(&params), LightColor::Amber);
    }

    #[test]
    fn advances_every_group() {
        let params = vec![params(); 3000];
        let mut sequential = params.iter().map(|p| p.initial_state()).collect::<Vec<_>>();
        let mut parallel = sequential.clone();
        advance_light_groups(&params, &mut sequential, 0.25, usize::MAX);
        advance_light_groups(&params, &mut parallel, 0.25, 0);
        assert_eq!(sequential, parallel);
        assert!(sequential.iter().all(|s| s.time_in_cycle_s == 0.25));
    }

    #[test]
    fn validation() {
        assert!(params().validate().is_ok());
        let bad = TrafficLightGroupParameters {
            amber_s: -1.0,
            ..params()
        };
        assert!(bad.validate().is_err());
    }
}
