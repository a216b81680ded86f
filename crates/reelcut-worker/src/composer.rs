//! Per-segment clip composition.
//!
//! Each selected segment is extracted, reframed, captioned, mixed and
//! rendered independently. Segments run concurrently up to
//! `max_parallel`; a segment-local failure only affects its own segment.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tokio::fs;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, warn};

use reelcut_media::command::wait_for_cancel;
use reelcut_media::{
    AudioMixer, AudioTrack, CaptionLayoutEngine, ClipRenderer, CropTrajectoryPlanner, ExtractedSegment,
    RenderJob, SegmentExtractor, TempOutput,
};
use reelcut_models::{CaptionCue, ScoredSegment, SelectionResult};

use crate::config::ComposerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::metrics::{record_segment_failed, record_segment_succeeded};
use crate::signals::Signals;

/// Output file name for the clip at 1-based selection position `index`.
pub fn clip_file_name(index: usize) -> String {
    format!("clip_{index}.mp4")
}

/// Result of composing one selected segment.
#[derive(Debug)]
pub struct ClipOutcome {
    /// 1-based position in the selection
    pub index: usize,
    pub scored: ScoredSegment,
    pub result: WorkerResult<PathBuf>,
}

impl ClipOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Whether this segment failed in a way that stops the run.
    pub fn is_fatal(&self) -> bool {
        self.result.as_ref().is_err_and(WorkerError::is_fatal)
    }
}

/// Turns a selection into rendered clips.
#[derive(Clone)]
pub struct ClipComposer {
    extractor: Arc<dyn SegmentExtractor>,
    renderer: Arc<dyn ClipRenderer>,
    layout: CaptionLayoutEngine,
    mixer: AudioMixer,
    background: Option<AudioTrack>,
    config: ComposerConfig,
}

impl ClipComposer {
    pub fn new(
        extractor: Arc<dyn SegmentExtractor>,
        renderer: Arc<dyn ClipRenderer>,
        config: ComposerConfig,
    ) -> Self {
        Self {
            extractor,
            renderer,
            layout: CaptionLayoutEngine::new(config.caption_style.clone()),
            mixer: AudioMixer::new(config.mixer.clone()),
            background: None,
            config,
        }
    }

    /// Mix `track` under every clip.
    pub fn with_background(mut self, track: AudioTrack) -> Self {
        self.background = Some(track);
        self
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Compose every selected segment.
    ///
    /// Outcomes are returned in selection order regardless of completion
    /// order. Once `cancel` flips, no new segment is started and in-flight
    /// ones are abandoned; their temporary files are removed. After a fatal
    /// failure no new segment is started either; segments already running
    /// finish.
    pub async fn compose(
        &self,
        selection: &SelectionResult,
        signals: &Signals,
        cancel: watch::Receiver<bool>,
    ) -> Vec<ClipOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel.max(1)));
        let halted = Arc::new(AtomicBool::new(false));
        let cues = signals.caption_cues();

        info!(
            clips = selection.len(),
            max_parallel = self.config.max_parallel,
            output_dir = %self.config.output_dir.display(),
            "Composing clips"
        );

        let futures = selection.iter().enumerate().map(|(i, scored)| {
            let semaphore = semaphore.clone();
            let halted = halted.clone();
            let cancel = cancel.clone();
            let cues = &cues;
            async move {
                let index = i + 1;
                let result = match semaphore.acquire().await {
                    Ok(_permit) if *cancel.borrow() || halted.load(Ordering::SeqCst) => {
                        Err(WorkerError::Cancelled)
                    }
                    Ok(_permit) => {
                        tokio::select! {
                            result = self.compose_one(index, scored, signals, cues) => result,
                            _ = wait_for_cancel(Some(cancel)) => Err(WorkerError::Cancelled),
                        }
                    }
                    Err(_) => Err(WorkerError::Cancelled),
                };

                match &result {
                    Ok(path) => {
                        record_segment_succeeded();
                        info!(clip_index = index, output = %path.display(), "Clip completed");
                    }
                    Err(e) if e.is_fatal() => {
                        halted.store(true, Ordering::SeqCst);
                        record_segment_failed(e.reason());
                        error!(
                            clip_index = index,
                            reason = e.reason(),
                            error = %e,
                            "Clip failed fatally, no further clips will start"
                        );
                    }
                    Err(e) => {
                        record_segment_failed(e.reason());
                        warn!(
                            clip_index = index,
                            start = scored.start(),
                            end = scored.end(),
                            reason = e.reason(),
                            error = %e,
                            "Clip failed"
                        );
                    }
                }

                ClipOutcome {
                    index,
                    scored: scored.clone(),
                    result,
                }
            }
        });

        join_all(futures).await
    }

    async fn compose_one(
        &self,
        index: usize,
        scored: &ScoredSegment,
        signals: &Signals,
        cues: &[CaptionCue],
    ) -> WorkerResult<PathBuf> {
        let segment = scored.segment();

        if !fs::try_exists(&signals.source).await.unwrap_or(false) {
            return Err(WorkerError::SourceMissing(signals.source.clone()));
        }

        fs::create_dir_all(&self.config.work_dir).await?;
        let scratch = scratch_dir(&self.config.work_dir, index).await?;

        let extracted = self
            .extractor
            .extract(&signals.source, segment, &scratch.path().join("segment.mp4"))
            .await
            .map_err(WorkerError::from_extraction)?;

        let boxes = signals.frame_boxes_for(segment);
        let planner = CropTrajectoryPlanner::new(self.config.crop.clone(), signals.frame_size());
        let crop = planner.plan(&boxes, extracted.duration, signals.frame_rate)?;

        let captions = self.layout.layout(cues, segment);
        let audio = self.prepare_audio(&extracted)?;

        debug!(
            clip_index = index,
            duration = extracted.duration,
            detections = boxes.len(),
            windows = crop.len(),
            captions = captions.len(),
            has_audio = audio.is_some(),
            "Prepared render job"
        );

        let job = RenderJob {
            video: extracted.path.clone(),
            crop,
            captions,
            audio,
            duration: extracted.duration,
            work_dir: scratch.path().to_path_buf(),
        };

        let output = TempOutput::create(self.config.output_dir.join(clip_file_name(index))).await?;
        self.renderer
            .render(&job, output.path())
            .await
            .map_err(WorkerError::from_render)?;
        Ok(output.commit().await?)
    }

    fn prepare_audio(&self, extracted: &ExtractedSegment) -> WorkerResult<Option<AudioTrack>> {
        if !extracted.has_audio {
            if self.background.is_some() {
                warn!(
                    path = %extracted.path.display(),
                    "Segment has no audio track, rendering without background music"
                );
            }
            return Ok(None);
        }

        let mut primary = AudioTrack::from_file(&extracted.path, extracted.duration)?;
        if let Some(peak) = extracted.peak_db {
            primary = primary.with_peak_db(peak);
        }
        let mixed = self.mixer.mix(
            primary,
            self.background.clone(),
            extracted.duration,
            self.config.music_volume,
        )?;
        Ok(Some(mixed))
    }
}

/// Per-clip scratch directory, removed when dropped.
async fn scratch_dir(work_dir: &Path, index: usize) -> WorkerResult<tempfile::TempDir> {
    let work_dir = work_dir.to_path_buf();
    let dir = tokio::task::spawn_blocking(move || {
        tempfile::Builder::new()
            .prefix(&format!("clip_{index}_"))
            .tempdir_in(work_dir)
    })
    .await
    .map_err(std::io::Error::other)??;
    Ok(dir)
}
