//! Run summary and scoring log.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use reelcut_media::TempOutput;
use reelcut_models::{ScoredSegment, SegmentRecord, SelectionResult};
use serde::{Deserialize, Serialize};
use tokio::fs;
use uuid::Uuid;

use crate::composer::ClipOutcome;
use crate::error::WorkerResult;

pub const SCORING_LOG_FILE: &str = "scoring.jsonl";
pub const SUMMARY_FILE: &str = "summary.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipStatus {
    Succeeded,
    Failed,
    Cancelled,
}

/// Outcome of one selected segment as reported to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipReport {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub score: f64,
    pub status: ClipStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&ClipOutcome> for ClipReport {
    fn from(outcome: &ClipOutcome) -> Self {
        let (status, output, reason, error) = match &outcome.result {
            Ok(path) => (ClipStatus::Succeeded, Some(path.clone()), None, None),
            Err(e) if e.is_cancelled() => (ClipStatus::Cancelled, None, Some(e.reason().to_string()), None),
            Err(e) => (
                ClipStatus::Failed,
                None,
                Some(e.reason().to_string()),
                Some(e.to_string()),
            ),
        };
        Self {
            index: outcome.index,
            start: outcome.scored.start(),
            end: outcome.scored.end(),
            score: outcome.scored.engagement_score(),
            status,
            output,
            reason,
            error,
        }
    }
}

/// Segments attempted, succeeded and failed in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub source: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Candidate segments received from upstream
    pub candidates: usize,
    /// Candidates scored with the fallback value
    pub fallback_scores: usize,
    /// Candidates within the duration bounds
    pub eligible: usize,
    pub requested: usize,
    pub selected: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub clips: Vec<ClipReport>,
}

impl RunSummary {
    pub fn new(
        run_id: Uuid,
        source: PathBuf,
        started_at: DateTime<Utc>,
        scored: &[ScoredSegment],
        selection: &SelectionResult,
        outcomes: &[ClipOutcome],
    ) -> Self {
        let clips: Vec<ClipReport> = outcomes.iter().map(ClipReport::from).collect();
        let count = |status| clips.iter().filter(|c| c.status == status).count();

        Self {
            run_id,
            source,
            started_at,
            finished_at: Utc::now(),
            candidates: scored.len(),
            fallback_scores: scored.iter().filter(|s| s.is_fallback()).count(),
            eligible: selection.eligible(),
            requested: selection.requested(),
            selected: selection.len(),
            succeeded: count(ClipStatus::Succeeded),
            failed: count(ClipStatus::Failed),
            cancelled: count(ClipStatus::Cancelled),
            clips,
        }
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled > 0
    }

    /// Write the summary as pretty JSON, replacing `path` atomically.
    pub async fn write(&self, path: &Path) -> WorkerResult<()> {
        let json = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &json).await
    }
}

/// One record per candidate, in candidate order.
pub fn scoring_records(scored: &[ScoredSegment], selection: &SelectionResult) -> Vec<SegmentRecord> {
    scored
        .iter()
        .map(|s| SegmentRecord::from_scored(s, selection.contains(s.segment())))
        .collect()
}

/// Write `records` as JSON lines, replacing `path` atomically.
pub async fn write_scoring_log(path: &Path, records: &[SegmentRecord]) -> WorkerResult<()> {
    let mut body = Vec::new();
    for record in records {
        serde_json::to_writer(&mut body, record)?;
        body.push(b'\n');
    }
    write_atomic(path, &body).await
}

async fn write_atomic(path: &Path, contents: &[u8]) -> WorkerResult<()> {
    let output = TempOutput::create(path).await?;
    fs::write(output.path(), contents).await?;
    output.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkerError;
    use reelcut_models::Segment;
    use tempfile::TempDir;

    fn scored(start: f64, score: f64) -> ScoredSegment {
        ScoredSegment::new(Segment::new(start, start + 20.0, "v").unwrap(), score, "ok")
    }

    fn outcomes() -> (Vec<ScoredSegment>, SelectionResult, Vec<ClipOutcome>) {
        let all = vec![
            scored(0.0, 90.0),
            scored(30.0, 80.0),
            scored(60.0, 70.0),
            ScoredSegment::fallback(Segment::new(90.0, 100.0, "v").unwrap(), "timeout"),
        ];
        let selection = SelectionResult::new(all[..3].to_vec(), 3, 3);
        let outcomes = vec![
            ClipOutcome {
                index: 1,
                scored: all[0].clone(),
                result: Ok(PathBuf::from("/out/clip_1.mp4")),
            },
            ClipOutcome {
                index: 2,
                scored: all[1].clone(),
                result: Err(WorkerError::encode_failed("x264 exited")),
            },
            ClipOutcome {
                index: 3,
                scored: all[2].clone(),
                result: Err(WorkerError::Cancelled),
            },
        ];
        (all, selection, outcomes)
    }

    #[test]
    fn test_summary_counts() {
        let (all, selection, outcomes) = outcomes();
        let summary = RunSummary::new(Uuid::new_v4(), "/v.mp4".into(), Utc::now(), &all, &selection, &outcomes);

        assert_eq!(summary.candidates, 4);
        assert_eq!(summary.fallback_scores, 1);
        assert_eq!(summary.selected, 3);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.cancelled, 1);
        assert!(summary.was_cancelled());
        assert_eq!(summary.clips[1].reason.as_deref(), Some("encode_failed"));
        assert!(summary.clips[1].error.as_deref().unwrap().contains("x264 exited"));
        assert_eq!(summary.clips[0].output, Some(PathBuf::from("/out/clip_1.mp4")));
    }

    #[tokio::test]
    async fn test_scoring_log_marks_selected() {
        let (all, selection, _) = outcomes();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SCORING_LOG_FILE);

        write_scoring_log(&path, &scoring_records(&all, &selection)).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let records: Vec<SegmentRecord> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(records.len(), 4);
        assert!(records[..3].iter().all(|r| r.selected));
        assert!(!records[3].selected);
        assert_eq!(records[3].score, 50.0);
    }

    #[tokio::test]
    async fn test_summary_roundtrips_through_file() {
        let (all, selection, outcomes) = outcomes();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SUMMARY_FILE);
        let summary = RunSummary::new(Uuid::new_v4(), "/v.mp4".into(), Utc::now(), &all, &selection, &outcomes);

        summary.write(&path).await.unwrap();

        let loaded: RunSummary = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(loaded, summary);
        assert!(!dir.path().join("summary.part.json").exists());
    }
}
