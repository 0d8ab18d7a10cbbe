use thiserror::Error;

use tf_core::TfError;
use tf_network::NetworkError;

#[derive(Debug, Error)]
pub enum ConflictError {
    /// Two live reservations for conflicting movements overlap.  Fatal.
    #[error("reservation invariant violated: {0}")]
    InvariantViolation(String),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Core(#[from] TfError),
}

pub type ConflictResult<T> = Result<T, ConflictError>;
