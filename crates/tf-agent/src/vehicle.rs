//! Per-vehicle parameters and kinematic state.

use tf_core::SegmentId;

/// Physical limits of one vehicle.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VehicleSpec {
    /// Bumper-to-bumper length in metres.
    pub length_m:       f32,
    pub max_speed_mps:  f32,
    /// Maximum forward acceleration (positive).
    pub max_accel_mps2: f32,
    /// Maximum braking deceleration (positive).
    pub max_brake_mps2: f32,
}

impl Default for VehicleSpec {
    fn default() -> Self {
        Self {
            length_m:       4.5,
            max_speed_mps:  15.0,
            max_accel_mps2: 2.5,
            max_brake_mps2: 6.0,
        }
    }
}

impl VehicleSpec {
    /// Distance needed to stop from `speed_mps` at full braking.
    #[inline]
    pub fn stopping_distance(&self, speed_mps: f32) -> f32 {
        speed_mps * speed_mps / (2.0 * self.max_brake_mps2.max(0.1))
    }

    pub fn is_valid(&self) -> bool {
        self.length_m > 0.0
            && self.max_speed_mps > 0.0
            && self.max_accel_mps2 > 0.0
            && self.max_brake_mps2 > 0.0
    }
}

/// Where a vehicle is and how fast it moves.
///
/// `offset_m` is measured from the start of `segment` and always lies in
/// `[0, segment length]`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Kinematics {
    pub segment:   SegmentId,
    pub offset_m:  f32,
    /// Lane index, 0 = rightmost.
    pub lane:      u8,
    pub speed_mps: f32,
}

impl Kinematics {
    pub fn at_rest(segment: SegmentId, offset_m: f32, lane: u8) -> Self {
        Self { segment, offset_m, lane, speed_mps: 0.0 }
    }
}

/// Everything needed to place a new agent on the network.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentInit {
    pub start:   Kinematics,
    pub goal:    SegmentId,
    pub vehicle: VehicleSpec,
}
