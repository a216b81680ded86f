//! Engagement-analysis collaborator seam.

use async_trait::async_trait;
use serde::Serialize;

use reelcut_models::{format_seconds, Segment};

use crate::error::{WorkerError, WorkerResult};

/// One segment as presented to the analysis collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentBoundary {
    /// 1-based position in the full candidate list
    pub index: usize,
    pub start: f64,
    pub end: f64,
}

impl SegmentBoundary {
    pub fn new(index: usize, segment: &Segment) -> Self {
        Self {
            index,
            start: segment.start(),
            end: segment.end(),
        }
    }
}

/// A request for engagement analysis of a batch of segments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    pub transcript: String,
    pub segments: Vec<SegmentBoundary>,
}

impl AnalysisRequest {
    /// Render the request as a language model prompt.
    pub fn prompt(&self) -> String {
        let segments = self
            .segments
            .iter()
            .map(|s| {
                format!(
                    "Segment {}: {} - {} ({:.1}s)",
                    s.index,
                    format_seconds(s.start),
                    format_seconds(s.end),
                    s.end - s.start
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"You are an expert in viral short-form content creation.

Analyze this video transcript and rate each segment listed below for short-form content potential.
Consider factors like:
- Entertainment value
- Key information density
- Emotional impact
- Stand-alone coherence

TRANSCRIPT:
{transcript}

SEGMENTS:
{segments}

Return ONLY a single JSON object with this schema:
{{
  "segments": [
    {{ "index": 1, "score": 0, "rationale": "Brief explanation" }}
  ]
}}

Additional instructions:
- Score every listed segment from 0 to 100.
- Use the segment numbers exactly as listed above.
- Keep each rationale to one sentence.
"#,
            transcript = self.transcript,
        )
    }
}

/// Language-understanding collaborator that rates segments.
///
/// Returns free text; [`crate::scoring::parse_analysis`] extracts the scores.
#[async_trait]
pub trait EngagementAnalyzer: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> WorkerResult<String>;
}

/// Analyzer used when no collaborator is configured.
///
/// Every call fails, so all segments receive the fallback score.
#[derive(Debug, Clone, Default)]
pub struct UnavailableAnalyzer;

#[async_trait]
impl EngagementAnalyzer for UnavailableAnalyzer {
    async fn analyze(&self, _request: &AnalysisRequest) -> WorkerResult<String> {
        Err(WorkerError::signal_unavailable("no engagement analyzer configured"))
    }
}
