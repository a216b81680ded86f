//! Background music preparation and mixing.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::track::{AudioOp, AudioTrack};
use crate::error::{MediaError, MediaResult};

/// Audio mixing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixerConfig {
    /// Longest fade-in/out applied to background music (seconds)
    #[serde(default = "default_max_fade")]
    pub max_fade: f64,

    /// Peak level the primary track is normalized to (dBFS)
    #[serde(default = "default_peak_target")]
    pub peak_target_db: f64,

    /// Normalize the primary track before mixing
    #[serde(default = "default_true")]
    pub normalize_primary: bool,
}

fn default_max_fade() -> f64 {
    3.0
}

fn default_peak_target() -> f64 {
    -0.1
}

fn default_true() -> bool {
    true
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            max_fade: default_max_fade(),
            peak_target_db: default_peak_target(),
            normalize_primary: true,
        }
    }
}

/// Convert a linear volume factor to decibels.
///
/// `1.0` is unity, `(0, 1)` attenuates, `> 1` amplifies. `Ok(None)` means
/// silence (volume `0`).
pub fn volume_to_db(volume: f64) -> MediaResult<Option<f64>> {
    if !volume.is_finite() || volume < 0.0 {
        return Err(MediaError::invalid_input(format!(
            "volume must be a finite non-negative factor, got {volume}"
        )));
    }
    if volume == 0.0 {
        return Ok(None);
    }
    Ok(Some(20.0 * volume.log10()))
}

/// Shapes background music to a clip and overlays it on the clip's audio.
#[derive(Debug, Clone, Default)]
pub struct AudioMixer {
    config: MixerConfig,
}

impl AudioMixer {
    pub fn new(config: MixerConfig) -> Self {
        Self { config }
    }

    /// Mix `background` under `primary`.
    ///
    /// The background is looped and trimmed to exactly `target_duration`,
    /// scaled by `background_gain` and faded at both ends. The result
    /// always lasts as long as `primary`.
    pub fn mix(
        &self,
        primary: AudioTrack,
        background: Option<AudioTrack>,
        target_duration: f64,
        background_gain: f64,
    ) -> MediaResult<AudioTrack> {
        let primary = self.normalize(primary);

        let Some(background) = background else {
            return Ok(primary);
        };

        if !target_duration.is_finite() || target_duration <= 0.0 {
            return Err(MediaError::invalid_input(format!(
                "target duration must be positive, got {target_duration}"
            )));
        }

        let background = self.prepare_background(background, target_duration, background_gain)?;
        debug!(
            primary_duration = primary.duration(),
            background_duration = background.duration(),
            plays = background.plays(),
            "Prepared background music"
        );

        Ok(AudioTrack::mix(primary, background))
    }

    /// Normalize a track: peak gain when its peak is known, loudnorm otherwise.
    pub fn normalize(&self, mut track: AudioTrack) -> AudioTrack {
        if !self.config.normalize_primary {
            return track;
        }
        match track.peak_db() {
            Some(peak) => {
                let gain = self.config.peak_target_db - peak;
                if gain.abs() > 0.01 {
                    track.push(AudioOp::Gain { db: gain });
                }
            }
            None => track.push(AudioOp::Loudnorm),
        }
        track
    }

    /// Loop, trim, apply gain and fade a background track.
    pub fn prepare_background(
        &self,
        mut track: AudioTrack,
        target_duration: f64,
        volume: f64,
    ) -> MediaResult<AudioTrack> {
        let gain_db = volume_to_db(volume)?;

        let source = track.duration();
        let plays = (target_duration / source - 1e-9).ceil().max(1.0);
        if plays > u32::MAX as f64 {
            return Err(MediaError::invalid_input(format!(
                "background of {source}s cannot cover {target_duration}s"
            )));
        }
        if plays > 1.0 {
            track.push(AudioOp::Loop { plays: plays as u32 });
        }
        track.push(AudioOp::Trim {
            duration: target_duration,
        });

        match gain_db {
            Some(db) if db.abs() > f64::EPSILON => track.push(AudioOp::Gain { db }),
            Some(_) => {}
            None => track.push(AudioOp::Mute),
        }

        let fade = self.config.max_fade.min(target_duration / 4.0);
        if fade > 0.0 {
            track.push(AudioOp::FadeIn { duration: fade });
            track.push(AudioOp::FadeOut {
                start: target_duration - fade,
                duration: fade,
            });
        }

        Ok(track)
    }
}
