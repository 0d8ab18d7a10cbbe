//! The structured per-agent snapshot handed to policies.
//!
//! Observations are bounded: at most `max_visible` other agents, nearest
//! first, and only those within `sensor_range_m`.

use tf_agent::VehicleSpec;
use tf_control::SignalState;
use tf_core::{AgentId, Point, SegmentId, Tick, TfError};

/// Limits on what one agent can perceive.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ObservationConfig {
    /// K: maximum number of visible agents reported.
    pub max_visible:    usize,
    pub sensor_range_m: f32,
}

impl Default for ObservationConfig {
    fn default() -> Self {
        Self { max_visible: 8, sensor_range_m: 60.0 }
    }
}

impl ObservationConfig {
    pub fn validate(&self) -> Result<(), TfError> {
        if !(self.sensor_range_m > 0.0) {
            return Err(TfError::Config("sensor_range_m must be > 0".into()));
        }
        Ok(())
    }
}

/// The observing agent's own state.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EgoState {
    pub segment:          SegmentId,
    pub offset_m:         f32,
    pub lane:             u8,
    pub lanes:            u8,
    pub speed_mps:        f32,
    /// Acceleration applied on the previous tick.
    pub accel_mps2:       f32,
    pub segment_length_m: f32,
    pub speed_limit_mps:  f32,
    /// Distance to the end of the current segment.
    pub dist_to_line_m:   f32,
    pub position:         Point,
    pub vehicle:          VehicleSpec,
}

/// Nearest vehicle ahead in the same lane, possibly on the next segment of
/// the route.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LeaderInfo {
    pub agent:     AgentId,
    /// Bumper-to-bumper gap in metres.
    pub gap_m:     f32,
    pub speed_mps: f32,
}

/// Another agent within sensor range.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VisibleAgent {
    pub agent:      AgentId,
    /// Position relative to the observer, world frame.
    pub relative:   Point,
    pub distance_m: f32,
    pub speed_mps:  f32,
    pub segment:    SegmentId,
    pub lane:       u8,
}

/// Everything a policy may use to choose an action.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Observation {
    pub agent:  AgentId,
    pub tick:   Tick,
    pub ego:    EgoState,
    pub leader: Option<LeaderInfo>,
    /// Nearest first; never longer than `ObservationConfig::max_visible`.
    pub visible: Vec<VisibleAgent>,

    /// Live agents on the current segment, including the observer.
    pub segment_occupancy:      u32,
    /// Next segment of the route, `None` on the goal segment.
    pub next_segment:           Option<SegmentId>,
    pub next_segment_occupancy: u32,

    /// Signal for the junction at the end of the current segment.
    pub signal:            SignalState,
    /// `true` if the agent already holds a reservation through that junction.
    pub holds_reservation: bool,
}

impl Observation {
    #[inline]
    pub fn on_goal_segment(&self) -> bool {
        self.next_segment.is_none()
    }
}
