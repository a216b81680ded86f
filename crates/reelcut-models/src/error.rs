//! Model validation errors.

use thiserror::Error;

use crate::timestamp::TimestampError;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Invalid segment: end ({end:.3}s) must be after start ({start:.3}s)")]
    InvalidSegment { start: f64, end: f64 },

    #[error("Invalid time value: {0}")]
    InvalidTime(String),

    #[error("Invalid aspect ratio: {0}")]
    InvalidAspectRatio(String),

    #[error("Timestamp error: {0}")]
    Timestamp(#[from] TimestampError),
}
