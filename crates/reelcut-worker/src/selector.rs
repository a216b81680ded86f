//! Ranking and selection of scored segments.

use std::cmp::Ordering;

use tracing::{debug, info, warn};

use reelcut_models::{ScoredSegment, SelectionResult};

use crate::config::{OverlapPolicy, SelectorConfig};

/// Picks the final clip set from scored candidates.
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentSelector {
    overlap_policy: OverlapPolicy,
}

impl SegmentSelector {
    pub fn new(overlap_policy: OverlapPolicy) -> Self {
        Self { overlap_policy }
    }

    pub fn overlap_policy(&self) -> OverlapPolicy {
        self.overlap_policy
    }

    /// Select with the bounds from `config`.
    pub fn select_with(&self, scored: &[ScoredSegment], config: &SelectorConfig) -> SelectionResult {
        self.select(scored, config.count, config.min_duration, config.max_duration)
    }

    /// Keep segments lasting `[min_duration, max_duration]`, rank them by
    /// score (earlier start wins ties) and take the best `count`.
    ///
    /// Out-of-bounds segments are dropped, never truncated. The result is in
    /// score-descending order and may be shorter than `count`.
    pub fn select(
        &self,
        scored: &[ScoredSegment],
        count: usize,
        min_duration: f64,
        max_duration: f64,
    ) -> SelectionResult {
        let mut eligible: Vec<&ScoredSegment> = scored
            .iter()
            .filter(|s| {
                let d = s.duration();
                d >= min_duration && d <= max_duration
            })
            .collect();
        let eligible_count = eligible.len();

        eligible.sort_by(|a, b| rank(a, b));

        let mut chosen: Vec<ScoredSegment> = Vec::with_capacity(count.min(eligible_count));
        for candidate in eligible {
            if chosen.len() >= count {
                break;
            }
            if self.overlap_policy == OverlapPolicy::Reject
                && chosen.iter().any(|c| c.segment().overlaps(candidate.segment()))
            {
                debug!(
                    start = candidate.start(),
                    end = candidate.end(),
                    score = candidate.engagement_score(),
                    "Skipping segment overlapping a higher-ranked selection"
                );
                continue;
            }
            chosen.push(candidate.clone());
        }

        let result = SelectionResult::new(chosen, count, eligible_count);
        if result.shortfall() > 0 {
            warn!(
                requested = count,
                selected = result.len(),
                eligible = eligible_count,
                min_duration,
                max_duration,
                "Fewer segments than requested satisfy the constraints"
            );
        } else {
            info!(selected = result.len(), eligible = eligible_count, "Selected segments");
        }
        result
    }
}

/// Score descending, then start ascending.
fn rank(a: &ScoredSegment, b: &ScoredSegment) -> Ordering {
    b.engagement_score()
        .total_cmp(&a.engagement_score())
        .then_with(|| a.start().total_cmp(&b.start()))
}
