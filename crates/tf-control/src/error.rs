use thiserror::Error;

use tf_core::{JunctionId, SegmentId, TfError};
use tf_network::NetworkError;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("controller needs at least one phase")]
    NoPhases,

    #[error("invalid signal timing: {0}")]
    InvalidTiming(String),

    #[error("{segment} is not an approach of {junction}")]
    NotAnApproach {
        junction: JunctionId,
        segment:  SegmentId,
    },

    #[error("junction {0} already has a controller")]
    Duplicate(JunctionId),

    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl From<ControlError> for TfError {
    fn from(e: ControlError) -> Self {
        match e {
            ControlError::Network(n) => n.into(),
            other => TfError::Config(other.to_string()),
        }
    }
}

pub type ControlResult<T> = Result<T, ControlError>;
