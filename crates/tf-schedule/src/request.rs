use tf_agent::AgentInit;
use tf_core::Tick;

use crate::{ScheduleError, ScheduleResult};

/// One vehicle to place on the network at `tick`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpawnRequest {
    pub tick: Tick,
    pub init: AgentInit,
}

impl SpawnRequest {
    pub fn new(tick: Tick, init: AgentInit) -> Self {
        Self { tick, init }
    }

    /// Reject requests no network could accept.  Segment ids are checked
    /// later, against the loaded network.
    pub fn validate(&self) -> ScheduleResult<()> {
        let k = &self.init.start;
        if !(k.offset_m >= 0.0 && k.speed_mps >= 0.0) {
            return Err(ScheduleError::Invalid(format!(
                "spawn at {} needs offset and speed >= 0 (got {}, {})",
                self.tick, k.offset_m, k.speed_mps
            )));
        }
        if !self.init.vehicle.is_valid() {
            return Err(ScheduleError::Invalid(format!("spawn at {} has invalid vehicle limits", self.tick)));
        }
        Ok(())
    }
}
