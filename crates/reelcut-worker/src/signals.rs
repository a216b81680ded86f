//! Upstream signals: candidate segments, transcript and detections.
//!
//! Scene detection, transcription and face/motion detection run outside the
//! pipeline; their results arrive as a JSON manifest.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::fs;
use tracing::info;

use reelcut_models::{CaptionCue, FrameBox, FrameSize, Segment, Transcript};

use crate::error::{WorkerError, WorkerResult};

/// Everything the pipeline knows about one source video.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Signals {
    /// Source video path
    pub source: PathBuf,
    pub frame_width: u32,
    pub frame_height: u32,
    pub frame_rate: f64,
    /// Candidate segments from the scene-boundary collaborator
    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub transcript: Transcript,
    /// Face and motion boxes on the source timeline
    #[serde(default)]
    pub frames: Vec<FrameBox>,
    /// Explicit captions; transcript timing is used when absent
    #[serde(default)]
    pub captions: Option<Vec<CaptionCue>>,
}

impl Signals {
    pub fn frame_size(&self) -> FrameSize {
        FrameSize::new(self.frame_width, self.frame_height)
    }

    /// Reject manifests the pipeline cannot work from.
    pub fn validate(&self) -> WorkerResult<()> {
        if self.frame_width < 2 || self.frame_height < 2 {
            return Err(WorkerError::invalid_manifest(format!(
                "frame size {}x{} is too small",
                self.frame_width, self.frame_height
            )));
        }
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return Err(WorkerError::invalid_manifest(format!(
                "frame rate must be positive, got {}",
                self.frame_rate
            )));
        }
        Ok(())
    }

    /// Detections inside `segment`, rebased onto its local timeline.
    pub fn frame_boxes_for(&self, segment: &Segment) -> Vec<FrameBox> {
        self.frames
            .iter()
            .filter(|b| segment.contains(b.timestamp))
            .map(|b| b.rebased(segment.start()))
            .collect()
    }

    /// Caption cues on the source timeline.
    pub fn caption_cues(&self) -> Vec<CaptionCue> {
        match &self.captions {
            Some(captions) => captions.clone(),
            None => self.transcript.caption_cues(),
        }
    }
}

/// Supplies the signals for one run.
#[async_trait]
pub trait SignalSource: Send + Sync {
    async fn load(&self) -> WorkerResult<Signals>;
}

#[async_trait]
impl SignalSource for Signals {
    async fn load(&self) -> WorkerResult<Signals> {
        self.validate()?;
        Ok(self.clone())
    }
}

/// Reads signals from a JSON manifest file.
///
/// A relative `source` path is resolved against the manifest's directory.
#[derive(Debug, Clone)]
pub struct ManifestSource {
    path: PathBuf,
}

impl ManifestSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SignalSource for ManifestSource {
    async fn load(&self) -> WorkerResult<Signals> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(WorkerError::SourceMissing(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        let mut signals: Signals = serde_json::from_slice(&raw)
            .map_err(|e| WorkerError::invalid_manifest(format!("{}: {e}", self.path.display())))?;

        if signals.source.is_relative() {
            if let Some(dir) = self.path.parent() {
                signals.source = dir.join(&signals.source);
            }
        }
        signals.validate()?;

        info!(
            manifest = %self.path.display(),
            source = %signals.source.display(),
            segments = signals.segments.len(),
            detections = signals.frames.len(),
            "Loaded signal manifest"
        );
        Ok(signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelcut_models::{BoundingBox, DetectionKind};
    use tempfile::TempDir;

    const MANIFEST: &str = r#"{
        "source": "talk.mp4",
        "frame_width": 1920,
        "frame_height": 1080,
        "frame_rate": 30,
        "segments": [
            {"start": 0, "end": 20},
            {"start": "00:01:00", "end": "00:01:30.5"}
        ],
        "transcript": {
            "segments": [{"start": 61, "end": 63, "text": "Here is the point"}]
        },
        "frames": [
            {"timestamp": 62.0, "x": 800, "y": 200, "w": 200, "h": 200, "confidence": 0.9, "kind": "face"},
            {"timestamp": 5.0, "x": 100, "y": 100, "w": 50, "h": 50, "kind": "motion"}
        ]
    }"#;

    #[tokio::test]
    async fn test_manifest_source_loads_and_resolves_paths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("signals.json");
        std::fs::write(&path, MANIFEST).unwrap();

        let signals = ManifestSource::new(&path).load().await.unwrap();

        assert_eq!(signals.source, dir.path().join("talk.mp4"));
        assert_eq!(signals.segments.len(), 2);
        assert_eq!(signals.segments[1].start(), 60.0);
        assert_eq!(signals.segments[1].end(), 90.5);
        assert_eq!(signals.frame_size(), FrameSize::new(1920, 1080));
    }

    #[tokio::test]
    async fn test_missing_manifest_is_fatal() {
        let err = ManifestSource::new("/no/such/signals.json").load().await.unwrap_err();
        assert!(matches!(err, WorkerError::SourceMissing(_)));
        assert!(!err.is_segment_local());
    }

    #[tokio::test]
    async fn test_invalid_manifest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("signals.json");
        std::fs::write(&path, MANIFEST.replace("\"frame_rate\": 30", "\"frame_rate\": 0")).unwrap();

        let err = ManifestSource::new(&path).load().await.unwrap_err();
        assert!(matches!(err, WorkerError::InvalidManifest(_)));

        std::fs::write(&path, "{\"source\": \"a.mp4\"").unwrap();
        assert!(ManifestSource::new(&path).load().await.is_err());
    }

    #[test]
    fn test_frame_boxes_are_rebased_and_filtered() {
        let signals: Signals = serde_json::from_str(MANIFEST).unwrap();
        let boxes = signals.frame_boxes_for(&signals.segments[1]);

        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].kind, DetectionKind::Face);
        assert_eq!(boxes[0].timestamp, 2.0);
        assert_eq!(boxes[0].bbox(), BoundingBox::new(800.0, 200.0, 200.0, 200.0));
    }

    #[test]
    fn test_captions_fall_back_to_transcript() {
        let mut signals: Signals = serde_json::from_str(MANIFEST).unwrap();
        let cues = signals.caption_cues();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "Here is the point");

        signals.captions = Some(vec![CaptionCue::new("Explicit", 0.0, 1.0)]);
        assert_eq!(signals.caption_cues()[0].text, "Explicit");
    }
}
