//! Engine configuration gathered in one place for scenario files.

use serde::{Deserialize, Serialize};

use tf_conflict::ConflictConfig;
use tf_core::SimConfig;
use tf_network::RoutingConfig;
use tf_policy::{DecisionConfig, ObservationConfig, RewardConfig};

use crate::{SimError, SimResult};

/// What happens to vehicles whose bodies overlap after commit.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Both vehicles are removed.
    Terminal,
    /// Counted and penalised; both vehicles continue.
    #[default]
    PenaltyOnly,
}

/// Every tunable of the engine.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sim:         SimConfig,
    pub routing:     RoutingConfig,
    pub conflict:    ConflictConfig,
    pub decision:    DecisionConfig,
    pub observation: ObservationConfig,
    pub reward:      RewardConfig,
    pub collision:   CollisionPolicy,
}

impl EngineConfig {
    /// Validate every section; the first failure is reported.
    pub fn validate(&self) -> SimResult<()> {
        self.sim.validate()?;
        self.routing.validate()?;
        self.conflict.validate()?;
        self.decision.validate()?;
        self.observation.validate()?;
        self.reward.validate()?;
        if self.sim.num_threads == Some(0) {
            return Err(SimError::Config("num_threads must be > 0 when set".into()));
        }
        Ok(())
    }
}
