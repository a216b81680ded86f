//! Engagement scoring of candidate segments.

use std::sync::Arc;

use futures::future::join_all;
use metrics::counter;
use tracing::{debug, info, warn};

use reelcut_models::{ScoredSegment, Segment, Transcript};

use super::analyzer::{AnalysisRequest, EngagementAnalyzer, SegmentBoundary};
use super::parser::parse_analysis;
use crate::config::ScorerConfig;
use crate::metrics::names;

/// Scores segments through an [`EngagementAnalyzer`].
///
/// Never fails as a whole: segments the collaborator does not score, or
/// whose request errors or times out, get the neutral fallback score.
#[derive(Clone)]
pub struct SegmentScorer {
    analyzer: Arc<dyn EngagementAnalyzer>,
    config: ScorerConfig,
}

impl SegmentScorer {
    pub fn new(analyzer: Arc<dyn EngagementAnalyzer>, config: ScorerConfig) -> Self {
        Self { analyzer, config }
    }

    /// Score `segments` against `transcript`.
    ///
    /// The output is one-to-one with the input and in the same order.
    pub async fn score(&self, segments: &[Segment], transcript: &Transcript) -> Vec<ScoredSegment> {
        if segments.is_empty() {
            return Vec::new();
        }

        let text = transcript.timestamped_text();
        let batch_size = match self.config.batch_size {
            0 => segments.len(),
            n => n,
        };

        let batches: Vec<(usize, &[Segment])> = segments
            .chunks(batch_size)
            .enumerate()
            .map(|(i, chunk)| (i * batch_size, chunk))
            .collect();

        info!(
            segments = segments.len(),
            batches = batches.len(),
            timeout_secs = self.config.timeout.as_secs_f64(),
            "Scoring candidate segments"
        );

        let futures = batches
            .into_iter()
            .map(|(offset, chunk)| self.score_batch(offset, chunk, &text));
        let scored: Vec<ScoredSegment> = join_all(futures).await.into_iter().flatten().collect();

        let fallbacks = scored.iter().filter(|s| s.is_fallback()).count();
        if fallbacks > 0 {
            warn!(fallbacks, total = scored.len(), "Some segments received the fallback score");
        }
        scored
    }

    async fn score_batch(&self, offset: usize, chunk: &[Segment], transcript: &str) -> Vec<ScoredSegment> {
        let request = AnalysisRequest {
            transcript: transcript.to_string(),
            segments: chunk
                .iter()
                .enumerate()
                .map(|(i, seg)| SegmentBoundary::new(offset + i + 1, seg))
                .collect(),
        };

        let response = tokio::time::timeout(self.config.timeout, self.analyzer.analyze(&request)).await;
        let text = match response {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(first_index = offset + 1, error = %e, "Engagement analysis failed");
                return fallback_all(chunk, &format!("analysis unavailable: {e}"), "error");
            }
            Err(_) => {
                warn!(
                    first_index = offset + 1,
                    timeout_secs = self.config.timeout.as_secs_f64(),
                    "Engagement analysis timed out"
                );
                return fallback_all(chunk, "analysis timed out", "timeout");
            }
        };

        let mut parsed = parse_analysis(&text);
        debug!(first_index = offset + 1, parsed = parsed.len(), "Parsed engagement analysis");

        chunk
            .iter()
            .enumerate()
            .map(|(i, seg)| match parsed.remove(&(offset + i + 1)) {
                Some(score) => ScoredSegment::new(seg.clone(), score.score, score.rationale),
                None => {
                    counter!(names::SCORING_FALLBACKS_TOTAL, "reason" => "unparsed").increment(1);
                    ScoredSegment::fallback(seg.clone(), "no score in analysis response")
                }
            })
            .collect()
    }
}

fn fallback_all(chunk: &[Segment], reason: &str, label: &'static str) -> Vec<ScoredSegment> {
    counter!(names::SCORING_FALLBACKS_TOTAL, "reason" => label).increment(chunk.len() as u64);
    chunk
        .iter()
        .map(|seg| ScoredSegment::fallback(seg.clone(), reason))
        .collect()
}
