//! Highlight selection and clip composition pipeline.
//!
//! This crate provides:
//! - Engagement scoring of candidate segments through a language model
//! - Duration-bounded, score-ranked segment selection
//! - Concurrent per-segment clip composition with cancellation
//! - Run summaries, scoring logs, configuration and logging

pub mod composer;
pub mod config;
pub mod error;
pub mod gemini;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod retry;
pub mod scoring;
pub mod selector;
pub mod signals;
pub mod summary;

pub use composer::{clip_file_name, ClipComposer, ClipOutcome};
pub use config::{ComposerConfig, OverlapPolicy, PipelineConfig, ScorerConfig, SelectorConfig};
pub use error::{WorkerError, WorkerResult};
pub use gemini::GeminiAnalyzer;
pub use logging::{init_tracing, RunLogger};
pub use pipeline::HighlightPipeline;
pub use scoring::{AnalysisRequest, EngagementAnalyzer, SegmentScorer, UnavailableAnalyzer};
pub use selector::SegmentSelector;
pub use signals::{ManifestSource, SignalSource, Signals};
pub use summary::{ClipReport, ClipStatus, RunSummary};
