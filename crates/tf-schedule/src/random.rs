//! Periodic random traffic.
//!
//! Every `period_ticks` the spawner draws one entry/exit pair and emits a
//! vehicle, as long as fewer than `max_live` vehicles are on the network.
//! `initial` vehicles are emitted at tick 0.

use tf_agent::{AgentInit, Kinematics, VehicleSpec};
use tf_core::{SegmentId, SimRng, Tick};

use crate::{ScheduleError, ScheduleResult, SpawnRequest};

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RandomSpawnConfig {
    pub period_ticks:    u64,
    pub max_live:        usize,
    pub initial:         usize,
    pub start_speed_mps: f32,
    pub vehicle:         VehicleSpec,
}

impl Default for RandomSpawnConfig {
    fn default() -> Self {
        Self {
            period_ticks:    30,
            max_live:        15,
            initial:         4,
            start_speed_mps: 0.0,
            vehicle:         VehicleSpec::default(),
        }
    }
}

pub struct RandomSpawner {
    config: RandomSpawnConfig,
    /// `(entry segment, exit segment)` pairs to draw from.
    routes: Vec<(SegmentId, SegmentId)>,
    seed:   u64,
    rng:    SimRng,
}

impl RandomSpawner {
    pub fn new(config: RandomSpawnConfig, routes: Vec<(SegmentId, SegmentId)>, seed: u64) -> ScheduleResult<Self> {
        if config.period_ticks == 0 {
            return Err(ScheduleError::Invalid("random spawner period must be > 0".into()));
        }
        if routes.is_empty() {
            return Err(ScheduleError::Invalid("random spawner needs at least one entry/exit pair".into()));
        }
        if !config.vehicle.is_valid() || !(config.start_speed_mps >= 0.0) {
            return Err(ScheduleError::Invalid("random spawner vehicle limits are invalid".into()));
        }
        Ok(Self { config, routes, seed, rng: SimRng::new(seed) })
    }

    pub fn config(&self) -> &RandomSpawnConfig {
        &self.config
    }

    pub fn routes(&self) -> &[(SegmentId, SegmentId)] {
        &self.routes
    }

    /// Requests for `tick`, given `live` vehicles currently on the network.
    pub fn poll(&mut self, tick: Tick, live: usize) -> Vec<SpawnRequest> {
        let wanted = match tick.0 {
            0 => self.config.initial.max(1),
            t if t % self.config.period_ticks == 0 => 1,
            _ => 0,
        };
        let n = wanted.min(self.config.max_live.saturating_sub(live));
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            let Some(&(entry, exit)) = self.rng.choose(&self.routes) else { break };
            out.push(SpawnRequest::new(tick, AgentInit {
                start:   Kinematics { speed_mps: self.config.start_speed_mps, ..Kinematics::at_rest(entry, 0.0, 0) },
                goal:    exit,
                vehicle: self.config.vehicle,
            }));
        }
        if !out.is_empty() {
            tracing::debug!(tick = tick.0, count = out.len(), live, "random spawns");
        }
        out
    }

    /// Rewind to the state right after construction.
    pub fn reset(&mut self) {
        self.rng = SimRng::new(self.seed);
    }
}
