use thiserror::Error;

use tf_core::{AgentId, SegmentId, TfError};
use tf_network::NetworkError;

#[derive(Debug, Error)]
pub enum MobilityError {
    #[error("agent {0} has no route")]
    NoRoute(AgentId),

    /// The route cursor does not point at the agent's segment.
    #[error("agent {agent} is on {actual} but its route expects {expected}")]
    RouteMismatch {
        agent:    AgentId,
        expected: SegmentId,
        actual:   SegmentId,
    },

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Core(#[from] TfError),
}

pub type MobilityResult<T> = Result<T, MobilityError>;
