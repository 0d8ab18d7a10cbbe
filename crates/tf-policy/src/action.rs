//! The bounded action a policy returns.

use crate::DecisionError;

/// What an agent wants to do this tick.
///
/// `accel_mps2` is a target longitudinal acceleration (negative brakes); the
/// kinematic step clamps it to the vehicle's limits.  `lane_delta` is
/// `-1` (one lane right), `0` or `+1` (one lane left).
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Action {
    pub accel_mps2: f32,
    pub lane_delta: i8,
}

impl Action {
    pub const KEEP: Action = Action { accel_mps2: 0.0, lane_delta: 0 };

    #[inline]
    pub const fn accel(accel_mps2: f32) -> Self {
        Self { accel_mps2, lane_delta: 0 }
    }

    /// Reject actions the kinematic step cannot interpret.
    pub fn validate(&self) -> Result<(), DecisionError> {
        if !self.accel_mps2.is_finite() {
            return Err(DecisionError::Malformed(format!("non-finite acceleration {}", self.accel_mps2)));
        }
        if !(-1..=1).contains(&self.lane_delta) {
            return Err(DecisionError::Malformed(format!("lane delta {} out of range", self.lane_delta)));
        }
        Ok(())
    }
}
