//! A reference car-following driver.
//!
//! `CruisePolicy` implements the Intelligent Driver Model: accelerate
//! towards the desired speed, brake smoothly behind a leader, and treat a
//! red stop line as a stationary obstacle.  It never changes lanes.

use tf_core::{AgentRng, TfError};

use crate::{Action, DecisionError, Observation, Policy};

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CruiseConfig {
    /// Desired time gap to the leader.
    pub time_headway_s:     f32,
    /// Jam distance kept even at standstill.
    pub min_gap_m:          f32,
    /// Deceleration the driver is comfortable with (positive).
    pub comfort_brake_mps2: f32,
    /// Free-road acceleration exponent.
    pub exponent:           f32,
    /// Half-width of uniform noise added to the acceleration.  Zero is fully
    /// deterministic even without seeding.
    pub noise_mps2:         f32,
}

impl Default for CruiseConfig {
    fn default() -> Self {
        Self {
            time_headway_s:     1.5,
            min_gap_m:          2.0,
            comfort_brake_mps2: 3.0,
            exponent:           4.0,
            noise_mps2:         0.0,
        }
    }
}

impl CruiseConfig {
    pub fn validate(&self) -> Result<(), TfError> {
        if !(self.time_headway_s >= 0.0 && self.min_gap_m >= 0.0) {
            return Err(TfError::Config("cruise headway and gap must be >= 0".into()));
        }
        if !(self.comfort_brake_mps2 > 0.0 && self.exponent > 0.0) {
            return Err(TfError::Config("cruise comfort_brake and exponent must be > 0".into()));
        }
        if !(self.noise_mps2 >= 0.0) {
            return Err(TfError::Config("cruise noise must be >= 0".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct CruisePolicy {
    pub config: CruiseConfig,
}

impl CruisePolicy {
    pub fn new(config: CruiseConfig) -> Self {
        Self { config }
    }

    /// IDM acceleration for speed `v` towards `v0`, optionally behind an
    /// obstacle `gap` metres ahead moving at `lead_v`.
    fn idm(&self, v: f32, v0: f32, a_max: f32, obstacle: Option<(f32, f32)>) -> f32 {
        let c = &self.config;
        let free = if v0 > 0.0 { 1.0 - (v / v0).powf(c.exponent) } else { 0.0 };
        let interaction = match obstacle {
            Some((gap, lead_v)) => {
                let dv = v - lead_v;
                let desired = c.min_gap_m
                    + (v * c.time_headway_s + v * dv / (2.0 * (a_max * c.comfort_brake_mps2).sqrt())).max(0.0);
                let s = gap.max(0.01);
                (desired / s).powi(2)
            }
            None => 0.0,
        };
        a_max * (free - interaction)
    }
}

impl Policy for CruisePolicy {
    fn decide(&self, obs: &Observation, rng: &mut AgentRng) -> Result<Action, DecisionError> {
        let ego = &obs.ego;
        let vehicle = &ego.vehicle;
        let v0 = vehicle.max_speed_mps.min(ego.speed_limit_mps);
        let v = ego.speed_mps;

        let mut accel = self.idm(v, v0, vehicle.max_accel_mps2, obs.leader.map(|l| (l.gap_m, l.speed_mps)));

        let must_stop = !obs.on_goal_segment() && !obs.signal.may_proceed() && !obs.holds_reservation;
        if must_stop {
            // The line itself is the obstacle; min_gap is already in the IDM target.
            let gap = ego.dist_to_line_m + self.config.min_gap_m;
            accel = accel.min(self.idm(v, v0, vehicle.max_accel_mps2, Some((gap, 0.0))));
        }

        if self.config.noise_mps2 > 0.0 {
            let n = self.config.noise_mps2;
            accel += rng.gen_range(-n..=n);
        }

        Ok(Action::accel(accel.clamp(-vehicle.max_brake_mps2, vehicle.max_accel_mps2)))
    }
}
