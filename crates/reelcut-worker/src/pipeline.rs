//! End-to-end highlight pipeline.
//!
//! signals -> scoring -> selection -> composition -> summary

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{warn, Instrument};
use uuid::Uuid;

use reelcut_media::{probe_duration, AudioTrack, FfmpegExtractor, FfmpegRenderer, FfmpegRunner};

use crate::composer::ClipComposer;
use crate::config::{PipelineConfig, SelectorConfig};
use crate::error::{WorkerError, WorkerResult};
use crate::gemini::GeminiAnalyzer;
use crate::logging::RunLogger;
use crate::scoring::{EngagementAnalyzer, SegmentScorer, UnavailableAnalyzer};
use crate::selector::SegmentSelector;
use crate::signals::{ManifestSource, SignalSource};
use crate::summary::{scoring_records, write_scoring_log, RunSummary, SCORING_LOG_FILE, SUMMARY_FILE};

/// Wires the pipeline stages together for one source video.
pub struct HighlightPipeline {
    signals: Arc<dyn SignalSource>,
    scorer: SegmentScorer,
    selector: SegmentSelector,
    selector_config: SelectorConfig,
    composer: ClipComposer,
}

impl HighlightPipeline {
    pub fn new(
        signals: Arc<dyn SignalSource>,
        scorer: SegmentScorer,
        selector_config: SelectorConfig,
        composer: ClipComposer,
    ) -> Self {
        Self {
            signals,
            scorer,
            selector: SegmentSelector::new(selector_config.overlap_policy),
            selector_config,
            composer,
        }
    }

    /// Build the production pipeline: manifest signals, Gemini scoring and
    /// FFmpeg extraction and rendering. FFmpeg processes stop when `cancel`
    /// flips.
    pub async fn from_config(config: &PipelineConfig, cancel: watch::Receiver<bool>) -> WorkerResult<Self> {
        let manifest = config
            .manifest
            .clone()
            .ok_or_else(|| WorkerError::config_error("REELCUT_MANIFEST not set"))?;

        let analyzer: Arc<dyn EngagementAnalyzer> = match GeminiAnalyzer::new(&config.gemini) {
            Ok(analyzer) => Arc::new(analyzer),
            Err(e) => {
                warn!(error = %e, "Engagement analysis unavailable, every segment gets the fallback score");
                Arc::new(UnavailableAnalyzer)
            }
        };

        let mut runner = FfmpegRunner::new().with_cancel(cancel);
        if let Some(secs) = config.composer.ffmpeg_timeout_secs {
            runner = runner.with_timeout(secs);
        }
        let extractor = FfmpegExtractor::new(runner.clone());
        let renderer = FfmpegRenderer::new(
            config.composer.encoding.clone(),
            config.composer.enhancement.clone(),
            runner,
        );

        let mut composer = ClipComposer::new(Arc::new(extractor), Arc::new(renderer), config.composer.clone());
        if let Some(music) = &config.composer.background_music {
            composer = composer.with_background(load_background(music).await?);
        }

        Ok(Self::new(
            Arc::new(ManifestSource::new(manifest)),
            SegmentScorer::new(analyzer, config.scorer.clone()),
            config.selector.clone(),
            composer,
        ))
    }

    fn output_dir(&self) -> PathBuf {
        self.composer.config().output_dir.clone()
    }

    /// Run the pipeline once.
    ///
    /// Segment-local failures are reported in the returned summary. Run-level
    /// problems such as missing source media are errors; when one surfaces
    /// while composing, the summary is still written before it is returned.
    pub async fn run(&self, cancel: watch::Receiver<bool>) -> WorkerResult<RunSummary> {
        let run_id = Uuid::new_v4();
        let logger = RunLogger::new(run_id, "highlights");
        let span = logger.create_span();
        self.run_inner(run_id, logger, cancel).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        logger: RunLogger,
        cancel: watch::Receiver<bool>,
    ) -> WorkerResult<RunSummary> {
        let started_at = Utc::now();

        let signals = self.signals.load().await?;
        if !signals.source.exists() {
            logger.log_error(&format!("source video {} not found", signals.source.display()));
            return Err(WorkerError::SourceMissing(signals.source.clone()));
        }
        logger.log_start(&format!(
            "{} candidate segments from {}",
            signals.segments.len(),
            signals.source.display()
        ));

        let scored = self.scorer.score(&signals.segments, &signals.transcript).await;
        logger.stage("scoring").log_progress(&format!(
            "scored {} segments ({} fallback)",
            scored.len(),
            scored.iter().filter(|s| s.is_fallback()).count()
        ));

        let selection = self.selector.select_with(&scored, &self.selector_config);
        if selection.is_empty() {
            let violation = WorkerError::constraint_violation(format!(
                "no segment lasts between {}s and {}s",
                self.selector_config.min_duration, self.selector_config.max_duration
            ));
            logger.log_warning(&violation.to_string());
        } else if selection.shortfall() > 0 {
            let violation = WorkerError::constraint_violation(format!(
                "requested {} clips but only {} are available",
                selection.requested(),
                selection.len()
            ));
            logger.log_warning(&violation.to_string());
        }

        let output_dir = self.output_dir();
        write_scoring_log(&output_dir.join(SCORING_LOG_FILE), &scoring_records(&scored, &selection)).await?;

        let outcomes = self.composer.compose(&selection, &signals, cancel).await;

        let summary = RunSummary::new(run_id, signals.source.clone(), started_at, &scored, &selection, &outcomes);
        summary.write(&output_dir.join(SUMMARY_FILE)).await?;

        let message = format!(
            "{} of {} clips rendered ({} failed, {} cancelled)",
            summary.succeeded, summary.selected, summary.failed, summary.cancelled
        );
        let fatal = outcomes
            .into_iter()
            .find_map(|o| o.result.err().filter(WorkerError::is_fatal));
        if let Some(fatal) = fatal {
            logger.log_error(&format!("{message}; stopped by: {fatal}"));
            return Err(fatal);
        }
        if summary.was_cancelled() {
            logger.log_warning(&message);
        } else {
            logger.log_completion(&message);
        }
        Ok(summary)
    }
}

async fn load_background(path: &std::path::Path) -> WorkerResult<AudioTrack> {
    if !path.exists() {
        return Err(WorkerError::SourceMissing(path.to_path_buf()));
    }
    let duration = probe_duration(path).await?;
    Ok(AudioTrack::from_file(path, duration)?)
}
