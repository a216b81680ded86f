//! Segment extraction and audio level measurement.

use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use reelcut_models::Segment;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_video;

/// Raw media for one segment, cut out of the source.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedSegment {
    /// Extracted file; its timeline starts at zero
    pub path: PathBuf,
    /// Actual duration of the extracted file in seconds
    pub duration: f64,
    pub has_audio: bool,
    /// Peak audio level in dBFS, when measured
    pub peak_db: Option<f64>,
}

/// Cuts `[start, end]` of a source video into its own file.
///
/// Every call opens its own decoder, so concurrent extractions never share
/// a read position.
#[async_trait]
pub trait SegmentExtractor: Send + Sync {
    async fn extract(
        &self,
        source: &Path,
        segment: &Segment,
        dest: &Path,
    ) -> MediaResult<ExtractedSegment>;
}

/// FFmpeg-backed extractor producing a frame-accurate intermediate.
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    runner: FfmpegRunner,
    measure_peak: bool,
}

impl Default for FfmpegExtractor {
    fn default() -> Self {
        Self::new(FfmpegRunner::new())
    }
}

impl FfmpegExtractor {
    pub fn new(runner: FfmpegRunner) -> Self {
        Self {
            runner,
            measure_peak: true,
        }
    }

    /// Skip the `volumedetect` pass after extraction.
    pub fn without_peak_measurement(mut self) -> Self {
        self.measure_peak = false;
        self
    }
}

#[async_trait]
impl SegmentExtractor for FfmpegExtractor {
    async fn extract(
        &self,
        source: &Path,
        segment: &Segment,
        dest: &Path,
    ) -> MediaResult<ExtractedSegment> {
        if !source.exists() {
            return Err(MediaError::FileNotFound(source.to_path_buf()));
        }

        info!(
            "Extracting segment: {} -> {} (start: {:.2}s, duration: {:.2}s)",
            source.display(),
            dest.display(),
            segment.start(),
            segment.duration()
        );

        // Re-encode so the cut lands on the exact frame rather than a keyframe
        let cmd = FfmpegCommand::new(source, dest)
            .seek(segment.start())
            .duration(segment.duration())
            .video_codec("libx264")
            .preset("ultrafast")
            .crf(16)
            .audio_codec("aac")
            .output_args(["-b:a", "192k", "-avoid_negative_ts", "make_zero"]);

        self.runner.run(&cmd).await?;

        let info = probe_video(dest).await?;
        let duration = if info.duration > 0.0 {
            info.duration
        } else {
            segment.duration()
        };

        let peak_db = if info.has_audio && self.measure_peak {
            peak_or_unknown(measure_peak_db(&self.runner, dest).await, dest)?
        } else {
            None
        };

        debug!(
            path = %dest.display(),
            duration,
            has_audio = info.has_audio,
            peak_db = ?peak_db,
            "Segment extracted"
        );

        Ok(ExtractedSegment {
            path: dest.to_path_buf(),
            duration,
            has_audio: info.has_audio,
            peak_db,
        })
    }
}

/// Measure the peak audio level of `path` in dBFS with `volumedetect`.
///
/// Returns `None` when FFmpeg reports no level (e.g. silent or no audio).
pub async fn measure_peak_db(runner: &FfmpegRunner, path: &Path) -> MediaResult<Option<f64>> {
    let cmd = FfmpegCommand::new(path, "-")
        .log_level("info")
        .output_args(["-vn", "-sn", "-dn", "-af", "volumedetect", "-f", "null"]);

    let stderr = runner.run_collect_stderr(&cmd).await?;
    Ok(parse_max_volume(&stderr))
}

/// A failed peak measurement leaves the peak unknown; only cancellation
/// propagates.
fn peak_or_unknown(measured: MediaResult<Option<f64>>, path: &Path) -> MediaResult<Option<f64>> {
    match measured {
        Ok(peak) => Ok(peak),
        Err(e) if e.is_cancelled() => Err(e),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Peak measurement failed, loudness will be normalized instead");
            Ok(None)
        }
    }
}

static MAX_VOLUME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"max_volume:\s*(-?(?:\d+(?:\.\d+)?|inf))\s*dB").expect("max_volume pattern is valid")
});

fn parse_max_volume(lines: &[String]) -> Option<f64> {
    lines.iter().rev().find_map(|line| {
        let caps = MAX_VOLUME.captures(line)?;
        caps.get(1)?
            .as_str()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    })
}
