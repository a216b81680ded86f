//! Candidate, scored and selected segments.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::timestamp::deserialize_seconds;

/// Neutral engagement score assigned when the analysis collaborator yields
/// no usable number for a segment.
pub const FALLBACK_SCORE: f64 = 50.0;

/// A contiguous time range of a source video.
///
/// Immutable once created: `end > start` is checked on construction and on
/// deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SegmentSpan")]
pub struct Segment {
    start: f64,
    end: f64,
    source_id: String,
}

#[derive(Deserialize)]
struct SegmentSpan {
    #[serde(deserialize_with = "deserialize_seconds")]
    start: f64,
    #[serde(deserialize_with = "deserialize_seconds")]
    end: f64,
    #[serde(default)]
    source_id: String,
}

impl TryFrom<SegmentSpan> for Segment {
    type Error = ModelError;

    fn try_from(span: SegmentSpan) -> Result<Self, Self::Error> {
        Segment::new(span.start, span.end, span.source_id)
    }
}

impl Segment {
    /// Create a segment, rejecting empty, inverted or non-finite ranges.
    pub fn new(start: f64, end: f64, source_id: impl Into<String>) -> ModelResult<Self> {
        if !start.is_finite() || !end.is_finite() || start < 0.0 {
            return Err(ModelError::InvalidTime(format!("{start}..{end}")));
        }
        if end <= start {
            return Err(ModelError::InvalidSegment { start, end });
        }
        Ok(Self {
            start,
            end,
            source_id: source_id.into(),
        })
    }

    /// Start time in seconds (source timeline).
    #[inline]
    pub fn start(&self) -> f64 {
        self.start
    }

    /// End time in seconds (source timeline).
    #[inline]
    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    #[inline]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether two segments of the same source share a positive-length range.
    pub fn overlaps(&self, other: &Segment) -> bool {
        self.source_id == other.source_id
            && self.start.max(other.start) < self.end.min(other.end)
    }

    /// Whether `t` (source timeline) lies within `[start, end]`.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t <= self.end
    }
}

/// Where an engagement score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    /// Parsed from the engagement-analysis response
    Analysis,
    /// Deterministic neutral default
    Fallback,
}

/// A segment with its engagement score.
///
/// Never mutated after creation; re-scoring produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredSegment {
    segment: Segment,
    engagement_score: f64,
    rationale: String,
    source: ScoreSource,
}

impl ScoredSegment {
    /// Create a scored segment; the score is clamped to `[0, 100]`.
    ///
    /// A non-finite score is replaced by [`FALLBACK_SCORE`].
    pub fn new(segment: Segment, score: f64, rationale: impl Into<String>) -> Self {
        if !score.is_finite() {
            return Self::fallback(segment, "score was not a finite number");
        }
        Self {
            segment,
            engagement_score: score.clamp(0.0, 100.0),
            rationale: rationale.into(),
            source: ScoreSource::Analysis,
        }
    }

    /// Create a scored segment carrying the neutral fallback score.
    pub fn fallback(segment: Segment, reason: impl Into<String>) -> Self {
        Self {
            segment,
            engagement_score: FALLBACK_SCORE,
            rationale: reason.into(),
            source: ScoreSource::Fallback,
        }
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    pub fn engagement_score(&self) -> f64 {
        self.engagement_score
    }

    pub fn rationale(&self) -> &str {
        &self.rationale
    }

    pub fn source(&self) -> ScoreSource {
        self.source
    }

    pub fn is_fallback(&self) -> bool {
        self.source == ScoreSource::Fallback
    }

    pub fn start(&self) -> f64 {
        self.segment.start()
    }

    pub fn end(&self) -> f64 {
        self.segment.end()
    }

    pub fn duration(&self) -> f64 {
        self.segment.duration()
    }
}

/// Ordered segments chosen for rendering.
///
/// Iteration order is rendering order and determines output numbering.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectionResult {
    segments: Vec<ScoredSegment>,
    requested: usize,
    eligible: usize,
}

impl SelectionResult {
    pub fn new(segments: Vec<ScoredSegment>, requested: usize, eligible: usize) -> Self {
        Self {
            segments,
            requested,
            eligible,
        }
    }

    pub fn segments(&self) -> &[ScoredSegment] {
        &self.segments
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredSegment> {
        self.segments.iter()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Clip count the caller asked for.
    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Number of candidates that satisfied the duration bounds.
    pub fn eligible(&self) -> usize {
        self.eligible
    }

    /// How many clips short of the request this selection is.
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.segments.len())
    }

    /// Whether `segment` is part of this selection.
    pub fn contains(&self, segment: &Segment) -> bool {
        self.segments.iter().any(|s| s.segment() == segment)
    }
}

impl<'a> IntoIterator for &'a SelectionResult {
    type Item = &'a ScoredSegment;
    type IntoIter = std::slice::Iter<'a, ScoredSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

/// One line of the per-run scoring log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SegmentRecord {
    pub start: f64,
    pub end: f64,
    pub score: f64,
    pub rationale: String,
    pub selected: bool,
    pub score_source: ScoreSource,
}

impl SegmentRecord {
    pub fn from_scored(scored: &ScoredSegment, selected: bool) -> Self {
        Self {
            start: scored.start(),
            end: scored.end(),
            score: scored.engagement_score(),
            rationale: scored.rationale().to_string(),
            selected,
            score_source: scored.source(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_rejects_inverted_range() {
        assert!(matches!(
            Segment::new(10.0, 10.0, "v"),
            Err(ModelError::InvalidSegment { .. })
        ));
        assert!(Segment::new(10.0, 5.0, "v").is_err());
        assert!(Segment::new(f64::NAN, 5.0, "v").is_err());
        assert_eq!(Segment::new(1.0, 4.5, "v").unwrap().duration(), 3.5);
    }

    #[test]
    fn test_segment_deserialize_validates() {
        let seg: Segment =
            serde_json::from_str(r#"{"start": "00:00:10", "end": 25.5, "source_id": "a"}"#)
                .unwrap();
        assert_eq!(seg.start(), 10.0);
        assert_eq!(seg.end(), 25.5);

        assert!(serde_json::from_str::<Segment>(r#"{"start": 30, "end": 20}"#).is_err());
    }

    #[test]
    fn test_overlap_requires_same_source_and_positive_length() {
        let a = Segment::new(0.0, 10.0, "v").unwrap();
        let b = Segment::new(5.0, 15.0, "v").unwrap();
        let touching = Segment::new(10.0, 20.0, "v").unwrap();
        let other_source = Segment::new(5.0, 15.0, "w").unwrap();

        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&touching));
        assert!(!a.overlaps(&other_source));
    }

    #[test]
    fn test_scored_segment_clamps_and_falls_back() {
        let seg = Segment::new(0.0, 20.0, "v").unwrap();

        assert_eq!(ScoredSegment::new(seg.clone(), 140.0, "x").engagement_score(), 100.0);
        assert_eq!(ScoredSegment::new(seg.clone(), -3.0, "x").engagement_score(), 0.0);

        let nan = ScoredSegment::new(seg.clone(), f64::NAN, "x");
        assert!(nan.is_fallback());
        assert_eq!(nan.engagement_score(), FALLBACK_SCORE);
    }

    #[test]
    fn test_selection_shortfall() {
        let seg = Segment::new(0.0, 20.0, "v").unwrap();
        let selection = SelectionResult::new(vec![ScoredSegment::new(seg, 80.0, "")], 3, 1);
        assert_eq!(selection.shortfall(), 2);
        assert_eq!(selection.len(), 1);
    }
}
