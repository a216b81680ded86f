//! FFmpeg-backed media layer for the reelcut highlight pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with progress, timeout and cancellation
//! - Segment extraction and peak-level measurement
//! - Crop trajectory planning from face/motion detections
//! - Caption layout onto segment-local time and `drawtext` overlays
//! - Logical audio tracks, background music mixing and filter graphs
//! - Single-pass clip rendering and atomic output files

pub mod audio;
pub mod captions;
pub mod command;
pub mod crop;
pub mod enhance;
pub mod error;
pub mod extract;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod render;

pub use audio::{AudioMixer, AudioOp, AudioTrack, MixerConfig};
pub use captions::CaptionLayoutEngine;
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegInput, FfmpegRunner};
pub use crop::{CropPlannerConfig, CropTrajectoryPlanner};
pub use enhance::EnhancementConfig;
pub use error::{MediaError, MediaResult};
pub use extract::{measure_peak_db, ExtractedSegment, FfmpegExtractor, SegmentExtractor};
pub use fs_utils::{move_file, part_path, TempOutput};
pub use probe::{probe_duration, probe_video, VideoInfo};
pub use progress::FfmpegProgress;
pub use render::{ClipRenderer, FfmpegRenderer, RenderJob};
