use crate::error::{Result, SimulationError};
use arrayvec::ArrayVec;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A single lane of traffic, treated as a closed loop.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LaneInfo {
    /// The length of the lane in m.
    pub length_m: f64,
    /// The speed limit in m/s.
    pub speed_limit_mps: f64,
    /// The index of the lane to the left, if there is one.
    pub left_lane_index: Option<usize>,
    /// The index of the lane to the right, if there is one.
    pub right_lane_index: Option<usize>,
}

/// A contiguous run of the lane-sorted vehicles which occupy one lane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LaneVehicleRange {
    pub start: usize,
    pub count: usize,
}

impl LaneInfo {
    /// Creates a lane without any adjacent lanes.
    pub fn new(length_m: f64, speed_limit_mps: f64) -> Self {
        Self {
            length_m,
            speed_limit_mps,
            left_lane_index: None,
            right_lane_index: None,
        }
    }

    /// Returns a copy of this lane with the given adjacent lanes.
    pub fn with_adjacent(self, left: Option<usize>, right: Option<usize>) -> Self {
        Self {
            left_lane_index: left,
            right_lane_index: right,
            ..self
        }
    }

    /// The adjacent lanes in the order they are considered for lane changes: left, then right.
    pub fn adjacent(&self) -> ArrayVec<usize, 2> {
        [self.left_lane_index, self.right_lane_index]
            .into_iter()
            .flatten()
            .collect()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        SimulationError::require_positive("lane length", self.length_m)?;
        SimulationError::require_positive("speed limit", self.speed_limit_mps)
    }
}

impl LaneVehicleRange {
    /// One past the last vehicle in the range.
    pub fn end(&self) -> usize {
        self.start + self.count
    }

    /// The range as indices into the lane-sorted vehicles.
    pub fn indices(&self) -> Range<usize> {
        self.start..self.end()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn contains(&self, idx: usize) -> bool {
        self.indices().contains(&idx)
    }

    /// The vehicle `offset` places after `idx`, going around the lane.
    /// `idx` must lie in the range.
    pub(crate) fn rotate(&self, idx: usize, offset: usize) -> usize {
        debug_assert!(self.contains(idx));
        self.start + (idx - self.start + offset) % self.count
    }

    /// The vehicle after `idx` in the lane, wrapping around the end of the loop.
    pub fn next(&self, idx: usize) -> Option<usize> {
        (self.count > 1).then(|| self.rotate(idx, 1))
    }

    /// The vehicle before `idx` in the lane, wrapping around the start of the loop.
    pub fn prev(&self, idx: usize) -> Option<usize> {
        (self.count > 1).then(|| self.rotate(idx, self.count - 1))
    }
}
