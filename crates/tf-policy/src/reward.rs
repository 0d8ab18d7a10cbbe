//! Per-tick reward reporting for training collaborators.
//!
//! The engine fills a [`RewardSignal`] for every live agent after commit and
//! passes it to a [`RewardModel`].  The shape of the reward is configuration:
//! swap `LinearReward` for any other model without touching the engine.

use tf_core::TfError;

/// Raw per-agent facts from one tick.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RewardSignal {
    /// Metres travelled along the route this tick.
    pub progress_m:  f32,
    pub collided:    bool,
    /// Entered a junction against a red signal or without a reservation.
    pub violation:   bool,
    /// Braking harder than the configured threshold this tick.
    pub harsh_brake: bool,
    /// Reached the goal this tick.
    pub completed:   bool,
}

pub trait RewardModel: Send + Sync + 'static {
    fn reward(&self, signal: &RewardSignal) -> f32;
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RewardConfig {
    pub progress_weight:            f32,
    pub collision_penalty:          f32,
    pub violation_penalty:          f32,
    pub harsh_brake_penalty:        f32,
    pub completion_bonus:           f32,
    /// Deceleration (positive) above which braking counts as harsh.
    pub harsh_brake_threshold_mps2: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            progress_weight:            0.1,
            collision_penalty:          -10.0,
            violation_penalty:          -5.0,
            harsh_brake_penalty:        -1.0,
            completion_bonus:           10.0,
            harsh_brake_threshold_mps2: 4.0,
        }
    }
}

impl RewardConfig {
    pub fn validate(&self) -> Result<(), TfError> {
        let all = [
            self.progress_weight,
            self.collision_penalty,
            self.violation_penalty,
            self.harsh_brake_penalty,
            self.completion_bonus,
        ];
        if all.iter().any(|w| !w.is_finite()) {
            return Err(TfError::Config("reward weights must be finite".into()));
        }
        if !(self.harsh_brake_threshold_mps2 > 0.0) {
            return Err(TfError::Config("harsh_brake_threshold_mps2 must be > 0".into()));
        }
        Ok(())
    }

    /// `true` if applying `accel_mps2` counts as harsh braking.
    #[inline]
    pub fn is_harsh(&self, accel_mps2: f32) -> bool {
        -accel_mps2 > self.harsh_brake_threshold_mps2
    }
}

/// Weighted sum of the signal's terms.
#[derive(Clone, Debug, Default)]
pub struct LinearReward {
    pub config: RewardConfig,
}

impl LinearReward {
    pub fn new(config: RewardConfig) -> Self {
        Self { config }
    }
}

impl RewardModel for LinearReward {
    fn reward(&self, s: &RewardSignal) -> f32 {
        let c = &self.config;
        let flag = |on: bool, w: f32| if on { w } else { 0.0 };
        s.progress_m * c.progress_weight
            + flag(s.collided, c.collision_penalty)
            + flag(s.violation, c.violation_penalty)
            + flag(s.harsh_brake, c.harsh_brake_penalty)
            + flag(s.completed, c.completion_bonus)
    }
}
