//! Logical audio tracks.
//!
//! An [`AudioTrack`] never holds samples. It names a source file plus the
//! chain of operations to apply, so its duration is known up front and the
//! whole chain renders as one FFmpeg filter graph.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{MediaError, MediaResult};

/// One step in a track's transformation chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AudioOp {
    /// Play the source `plays` times back to back (input-level, no re-encode)
    Loop { plays: u32 },
    /// Keep only the first `duration` seconds
    Trim { duration: f64 },
    /// Gain in decibels
    Gain { db: f64 },
    /// Silence the track
    Mute,
    FadeIn { duration: f64 },
    FadeOut { start: f64, duration: f64 },
    /// EBU R128 loudness normalization
    Loudnorm,
}

/// Where a track's samples come from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackSource {
    /// Audio stream of a media file
    File {
        path: PathBuf,
        /// Length of the underlying waveform in seconds
        duration: f64,
        /// Measured peak level in dBFS, when known
        #[serde(skip_serializing_if = "Option::is_none")]
        peak_db: Option<f64>,
    },
    /// Overlay of `background` onto `primary`; lasts as long as `primary`
    Mix {
        primary: Box<AudioTrack>,
        background: Box<AudioTrack>,
    },
}

/// Handle to a fixed-length waveform and the operations applied to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioTrack {
    source: TrackSource,
    ops: Vec<AudioOp>,
}

impl AudioTrack {
    /// Track backed by the audio stream of `path`.
    pub fn from_file(path: impl AsRef<Path>, duration: f64) -> MediaResult<Self> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(MediaError::invalid_input(format!(
                "audio duration must be positive, got {duration}"
            )));
        }
        Ok(Self {
            source: TrackSource::File {
                path: path.as_ref().to_path_buf(),
                duration,
                peak_db: None,
            },
            ops: Vec::new(),
        })
    }

    /// Attach a measured peak level (dBFS) to a file-backed track.
    pub fn with_peak_db(mut self, peak: f64) -> Self {
        if let TrackSource::File { peak_db, .. } = &mut self.source {
            *peak_db = peak.is_finite().then_some(peak);
        }
        self
    }

    pub(crate) fn mix(primary: AudioTrack, background: AudioTrack) -> Self {
        Self {
            source: TrackSource::Mix {
                primary: Box::new(primary),
                background: Box::new(background),
            },
            ops: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, op: AudioOp) {
        self.ops.push(op);
    }

    pub fn source(&self) -> &TrackSource {
        &self.source
    }

    pub fn ops(&self) -> &[AudioOp] {
        &self.ops
    }

    /// Peak level of the source in dBFS, if measured.
    pub fn peak_db(&self) -> Option<f64> {
        match &self.source {
            TrackSource::File { peak_db, .. } => *peak_db,
            TrackSource::Mix { .. } => None,
        }
    }

    /// Duration before any operation is applied.
    pub fn source_duration(&self) -> f64 {
        match &self.source {
            TrackSource::File { duration, .. } => *duration,
            TrackSource::Mix { primary, .. } => primary.duration(),
        }
    }

    /// Duration after the whole operation chain.
    pub fn duration(&self) -> f64 {
        self.ops.iter().fold(self.source_duration(), |len, op| match op {
            AudioOp::Loop { plays } => len * (*plays).max(1) as f64,
            AudioOp::Trim { duration } => len.min(*duration),
            _ => len,
        })
    }

    /// Number of times the source is played, from a leading loop op.
    pub fn plays(&self) -> u32 {
        match self.ops.first() {
            Some(AudioOp::Loop { plays }) => (*plays).max(1),
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_follows_op_chain() {
        let mut track = AudioTrack::from_file("music.mp3", 7.0).unwrap();
        assert_eq!(track.duration(), 7.0);

        track.push(AudioOp::Loop { plays: 3 });
        assert_eq!(track.duration(), 21.0);
        track.push(AudioOp::Trim { duration: 20.0 });
        track.push(AudioOp::Gain { db: -6.0 });
        assert_eq!(track.duration(), 20.0);
        assert_eq!(track.plays(), 3);
    }

    #[test]
    fn test_rejects_empty_source() {
        assert!(AudioTrack::from_file("a.wav", 0.0).is_err());
        assert!(AudioTrack::from_file("a.wav", f64::NAN).is_err());
    }

    #[test]
    fn test_mix_lasts_as_long_as_primary() {
        let primary = AudioTrack::from_file("clip.mp4", 12.0).unwrap();
        let background = AudioTrack::from_file("music.mp3", 30.0).unwrap();
        assert_eq!(AudioTrack::mix(primary, background).duration(), 12.0);
    }

    #[test]
    fn test_peak_only_on_file_tracks() {
        let track = AudioTrack::from_file("clip.mp4", 5.0).unwrap().with_peak_db(-3.5);
        assert_eq!(track.peak_db(), Some(-3.5));
        assert_eq!(
            AudioTrack::from_file("clip.mp4", 5.0).unwrap().with_peak_db(f64::NEG_INFINITY).peak_db(),
            None
        );
    }
}
