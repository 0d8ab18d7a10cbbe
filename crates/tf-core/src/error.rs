//! Engine-wide error type.
//!
//! Sub-crates define their own error enums and convert `TfError` into them
//! via `#[from]` where an unknown id can surface.  Every `*NotFound` variant
//! is a caller bug: it is reported immediately and never retried.

use thiserror::Error;

use crate::{AgentId, JunctionId, SegmentId};

/// The top-level error type for `tf-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum TfError {
    #[error("agent {0} not found")]
    AgentNotFound(AgentId),

    #[error("segment {0} not found")]
    SegmentNotFound(SegmentId),

    #[error("junction {0} not found")]
    JunctionNotFound(JunctionId),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for all `tf-*` crates.
pub type TfResult<T> = Result<T, TfError>;
