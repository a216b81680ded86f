//! Worker error types.

use std::path::PathBuf;

use reelcut_media::MediaError;
use reelcut_models::ModelError;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    /// A collaborator (scoring, transcription, detection) is unreachable or timed out.
    #[error("Signal unavailable: {0}")]
    SignalUnavailable(String),

    /// Duration bounds or clip count could not be satisfied.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Encode failed: {0}")]
    EncodeFailed(String),

    #[error("Source media not found: {0}")]
    SourceMissing(PathBuf),

    #[error("Invalid signal manifest: {0}")]
    InvalidManifest(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn signal_unavailable(msg: impl Into<String>) -> Self {
        Self::SignalUnavailable(msg.into())
    }

    pub fn constraint_violation(msg: impl Into<String>) -> Self {
        Self::ConstraintViolation(msg.into())
    }

    pub fn extraction_failed(msg: impl Into<String>) -> Self {
        Self::ExtractionFailed(msg.into())
    }

    pub fn encode_failed(msg: impl Into<String>) -> Self {
        Self::EncodeFailed(msg.into())
    }

    pub fn invalid_manifest(msg: impl Into<String>) -> Self {
        Self::InvalidManifest(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Wrap a media failure from the extraction step.
    pub fn from_extraction(err: MediaError) -> Self {
        if err.is_cancelled() {
            Self::Cancelled
        } else {
            Self::ExtractionFailed(err.to_string())
        }
    }

    /// Wrap a media failure from the render step.
    pub fn from_render(err: MediaError) -> Self {
        if err.is_cancelled() {
            Self::Cancelled
        } else {
            Self::EncodeFailed(err.to_string())
        }
    }

    /// Whether this failure only affects the segment it happened on.
    ///
    /// Segment-local failures are reported in the run summary and the batch
    /// continues; see [`WorkerError::is_fatal`] for the rest.
    pub fn is_segment_local(&self) -> bool {
        match self {
            WorkerError::SignalUnavailable(_)
            | WorkerError::ExtractionFailed(_)
            | WorkerError::EncodeFailed(_)
            | WorkerError::Io(_) => true,
            WorkerError::Media(e) => !e.is_cancelled(),
            _ => false,
        }
    }

    /// Whether this failure stops the run: no new segment starts and the
    /// error is returned once the summary is written.
    pub fn is_fatal(&self) -> bool {
        !self.is_segment_local() && !self.is_cancelled()
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            WorkerError::Cancelled => true,
            WorkerError::Media(e) => e.is_cancelled(),
            _ => false,
        }
    }

    /// Short stable label, used for metrics and the run summary.
    pub fn reason(&self) -> &'static str {
        match self {
            WorkerError::SignalUnavailable(_) => "signal_unavailable",
            WorkerError::ConstraintViolation(_) => "constraint_violation",
            WorkerError::ExtractionFailed(_) => "extraction_failed",
            WorkerError::EncodeFailed(_) => "encode_failed",
            WorkerError::SourceMissing(_) => "source_missing",
            WorkerError::InvalidManifest(_) => "invalid_manifest",
            WorkerError::ConfigError(_) => "config",
            WorkerError::Cancelled => "cancelled",
            WorkerError::Media(e) if e.is_cancelled() => "cancelled",
            WorkerError::Media(_) => "media",
            WorkerError::Model(_) => "model",
            WorkerError::Json(_) => "json",
            WorkerError::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_local_classification() {
        assert!(WorkerError::extraction_failed("seek").is_segment_local());
        assert!(WorkerError::encode_failed("x264").is_segment_local());
        assert!(WorkerError::Media(MediaError::invalid_input("bad")).is_segment_local());

        assert!(!WorkerError::SourceMissing(PathBuf::from("/v.mp4")).is_segment_local());
        assert!(!WorkerError::config_error("x").is_segment_local());
        assert!(!WorkerError::Cancelled.is_segment_local());
        assert!(!WorkerError::Media(MediaError::Cancelled).is_segment_local());
    }

    #[test]
    fn test_fatal_classification() {
        assert!(WorkerError::SourceMissing(PathBuf::from("/v.mp4")).is_fatal());
        assert!(WorkerError::config_error("x").is_fatal());
        assert!(!WorkerError::extraction_failed("seek").is_fatal());
        assert!(!WorkerError::Cancelled.is_fatal());
        assert!(!WorkerError::Media(MediaError::Cancelled).is_fatal());
    }

    #[test]
    fn test_media_errors_keep_cancellation() {
        let err = WorkerError::from_render(MediaError::Cancelled);
        assert!(err.is_cancelled());
        assert_eq!(err.reason(), "cancelled");

        let err = WorkerError::from_extraction(MediaError::FileNotFound("/a.mp4".into()));
        assert_eq!(err.reason(), "extraction_failed");
        assert!(err.to_string().contains("/a.mp4"));
    }
}
