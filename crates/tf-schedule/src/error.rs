use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("spawn parse error: {0}")]
    Parse(String),

    #[error("invalid spawn: {0}")]
    Invalid(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
