//! Network and routing error type.

use thiserror::Error;

use tf_core::{AgentId, JunctionId, SegmentId, TfError};

/// Errors produced by `tf-network`.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("segment {0} not found in network")]
    SegmentNotFound(SegmentId),

    #[error("junction {0} not found in network")]
    JunctionNotFound(JunctionId),

    /// No open path exists.  Recoverable: the agent waits and retries.
    #[error("no route for {agent} from {from} to {goal}")]
    Infeasible {
        agent: AgentId,
        from:  SegmentId,
        goal:  SegmentId,
    },

    #[error("invalid topology: {0}")]
    InvalidTopology(String),
}

impl NetworkError {
    /// `true` for the recoverable routing failure.
    #[inline]
    pub fn is_infeasible(&self) -> bool {
        matches!(self, NetworkError::Infeasible { .. })
    }
}

impl From<NetworkError> for TfError {
    fn from(e: NetworkError) -> Self {
        match e {
            NetworkError::SegmentNotFound(s)  => TfError::SegmentNotFound(s),
            NetworkError::JunctionNotFound(j) => TfError::JunctionNotFound(j),
            other => TfError::Config(other.to_string()),
        }
    }
}

pub type NetworkResult<T> = Result<T, NetworkError>;
