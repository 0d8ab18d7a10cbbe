use thiserror::Error;

/// Why a policy's answer was discarded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecisionError {
    /// The policy exceeded its time budget (or reported that it would).
    #[error("decision timed out")]
    Timeout,

    #[error("malformed action: {0}")]
    Malformed(String),
}
