//! Engagement scoring: collaborator seam, response parsing and the scorer.

mod analyzer;
mod parser;
mod scorer;

pub use analyzer::{AnalysisRequest, EngagementAnalyzer, SegmentBoundary, UnavailableAnalyzer};
pub use parser::{parse_analysis, ParsedScore};
pub use scorer::SegmentScorer;
