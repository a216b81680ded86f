//! Pipeline metrics.
//!
//! Counters go through the `metrics` facade; the embedding application
//! decides whether a recorder is installed.

use metrics::counter;

/// Metric names as constants for consistency.
pub mod names {
    pub const SEGMENTS_SUCCEEDED_TOTAL: &str = "reelcut_segments_succeeded_total";
    pub const SEGMENTS_FAILED_TOTAL: &str = "reelcut_segments_failed_total";
    pub const SCORING_FALLBACKS_TOTAL: &str = "reelcut_scoring_fallbacks_total";
}

/// Record a rendered clip.
pub fn record_segment_succeeded() {
    counter!(names::SEGMENTS_SUCCEEDED_TOTAL).increment(1);
}

/// Record a segment that produced no clip.
pub fn record_segment_failed(reason: &'static str) {
    counter!(names::SEGMENTS_FAILED_TOTAL, "reason" => reason).increment(1);
}
