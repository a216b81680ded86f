//! Shared data models for the reelcut highlight pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Candidate, scored and selected segments
//! - Per-frame face/motion detections and crop windows
//! - Caption records and their style configuration
//! - Transcripts and encoding configuration

pub mod caption;
pub mod crop;
pub mod detection;
pub mod encoding;
pub mod error;
pub mod segment;
pub mod timestamp;
pub mod transcript;

// Re-export common types
pub use caption::{Caption, CaptionCue, CaptionPosition, CaptionStyle, CaptionStyleOverrides};
pub use crop::{AspectRatio, CropWindow, FrameSize};
pub use detection::{BoundingBox, DetectionKind, FrameBox};
pub use encoding::EncodingConfig;
pub use error::{ModelError, ModelResult};
pub use segment::{
    ScoreSource, ScoredSegment, Segment, SegmentRecord, SelectionResult, FALLBACK_SCORE,
};
pub use timestamp::{format_seconds, parse_timestamp, TimestampError};
pub use transcript::{Transcript, TranscriptSegment};
