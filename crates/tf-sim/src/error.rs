use thiserror::Error;

use tf_conflict::ConflictError;
use tf_control::ControlError;
use tf_core::{AgentId, SegmentId, TfError};
use tf_mobility::MobilityError;
use tf_network::NetworkError;
use tf_schedule::ScheduleError;

use crate::ScenarioError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation configuration error: {0}")]
    Config(String),

    /// Decision timeouts exceeded `DecisionConfig::max_timeout_rate`.
    #[error("decision timeout rate {rate:.3} exceeds limit {limit:.3}")]
    TimeoutRate { rate: f64, limit: f64 },

    #[error("cannot spawn on {segment}: {reason}")]
    InvalidSpawn { segment: SegmentId, reason: String },

    #[error("no entry space for a new vehicle on {0}")]
    SpawnBlocked(SegmentId),

    #[error("agent {0} is not live")]
    NotLive(AgentId),

    #[error(transparent)]
    Core(#[from] TfError),

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("mobility error: {0}")]
    Mobility(#[from] MobilityError),

    #[error("conflict resolution error: {0}")]
    Conflict(#[from] ConflictError),

    #[error("traffic control error: {0}")]
    Control(#[from] ControlError),

    #[error("schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("scenario error: {0}")]
    Scenario(#[from] ScenarioError),
}

impl SimError {
    /// Fatal errors halt the run; everything else is a rejected request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SimError::Conflict(ConflictError::InvariantViolation(_)) | SimError::TimeoutRate { .. }
        )
    }
}

pub type SimResult<T> = Result<T, SimError>;
