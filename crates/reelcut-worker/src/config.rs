//! Pipeline configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reelcut_media::audio::volume_to_db;
use reelcut_media::{CropPlannerConfig, EnhancementConfig, MixerConfig};
use reelcut_models::{CaptionStyle, EncodingConfig};
use serde::{Deserialize, Serialize};

use crate::error::{WorkerError, WorkerResult};

/// Default models tried in order by the engagement collaborator.
pub const DEFAULT_GEMINI_MODELS: &[&str] = &["gemini-2.5-flash", "gemini-2.5-flash-lite", "gemini-2.5-pro"];

/// Upper bound on a single FFmpeg invocation.
pub const DEFAULT_FFMPEG_TIMEOUT_SECS: u64 = 1800;

/// How the selector treats candidates whose time ranges overlap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Skip a candidate that overlaps an already selected segment
    #[default]
    Reject,
    /// Keep overlapping candidates
    Allow,
}

impl FromStr for OverlapPolicy {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "allow" => Ok(Self::Allow),
            other => Err(WorkerError::config_error(format!(
                "unknown overlap policy '{other}', expected 'reject' or 'allow'"
            ))),
        }
    }
}

/// Segment selection bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Number of clips to produce
    pub count: usize,
    /// Shortest acceptable segment (seconds)
    pub min_duration: f64,
    /// Longest acceptable segment (seconds)
    pub max_duration: f64,
    pub overlap_policy: OverlapPolicy,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            count: 5,
            min_duration: 15.0,
            max_duration: 60.0,
            overlap_policy: OverlapPolicy::Reject,
        }
    }
}

/// Engagement scoring configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ScorerConfig {
    /// Bound on each call to the engagement collaborator
    pub timeout: Duration,
    /// Segments per request; 0 sends every segment in one request
    pub batch_size: usize,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            batch_size: 0,
        }
    }
}

/// Gemini collaborator settings.
#[derive(Clone, Default)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub models: Vec<String>,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("models", &self.models)
            .finish()
    }
}

/// Clip composition settings.
#[derive(Debug, Clone)]
pub struct ComposerConfig {
    /// Directory receiving `clip_{n}.mp4`, the scoring log and the summary
    pub output_dir: PathBuf,
    /// Scratch directory for extracted segments and render scripts
    pub work_dir: PathBuf,
    /// Maximum segments processed at once
    pub max_parallel: usize,
    /// Optional background music mixed under every clip
    pub background_music: Option<PathBuf>,
    /// Linear background music volume
    pub music_volume: f64,
    /// Kill any FFmpeg process running longer than this; `None` disables
    pub ffmpeg_timeout_secs: Option<u64>,
    pub crop: CropPlannerConfig,
    pub caption_style: CaptionStyle,
    pub mixer: MixerConfig,
    pub encoding: EncodingConfig,
    pub enhancement: EnhancementConfig,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./clips"),
            work_dir: std::env::temp_dir().join("reelcut"),
            max_parallel: 4,
            background_music: None,
            music_volume: 0.2,
            ffmpeg_timeout_secs: Some(DEFAULT_FFMPEG_TIMEOUT_SECS),
            crop: CropPlannerConfig::default(),
            caption_style: CaptionStyle::default(),
            mixer: MixerConfig::default(),
            encoding: EncodingConfig::default(),
            enhancement: EnhancementConfig::default(),
        }
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Signal manifest describing the source video and its detections
    pub manifest: Option<PathBuf>,
    pub selector: SelectorConfig,
    pub scorer: ScorerConfig,
    pub composer: ComposerConfig,
    pub gemini: GeminiConfig,
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from any key lookup, e.g. a map in tests.
    pub fn from_lookup<F>(lookup: F) -> WorkerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let selector = SelectorConfig {
            count: parse_or(&lookup, "REELCUT_CLIP_COUNT", defaults.selector.count)?,
            min_duration: parse_or(&lookup, "REELCUT_MIN_DURATION", defaults.selector.min_duration)?,
            max_duration: parse_or(&lookup, "REELCUT_MAX_DURATION", defaults.selector.max_duration)?,
            overlap_policy: parse_or(&lookup, "REELCUT_OVERLAP_POLICY", defaults.selector.overlap_policy)?,
        };

        let scorer = ScorerConfig {
            timeout: Duration::from_secs(parse_or(&lookup, "REELCUT_SCORING_TIMEOUT_SECS", 30u64)?),
            batch_size: parse_or(&lookup, "REELCUT_SCORING_BATCH_SIZE", defaults.scorer.batch_size)?,
        };

        let mut composer = defaults.composer;
        if let Some(dir) = non_empty(&lookup, "REELCUT_OUTPUT_DIR") {
            composer.output_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty(&lookup, "REELCUT_WORK_DIR") {
            composer.work_dir = PathBuf::from(dir);
        }
        composer.max_parallel = parse_or(&lookup, "REELCUT_MAX_PARALLEL", composer.max_parallel)?;
        composer.background_music = non_empty(&lookup, "REELCUT_BACKGROUND_MUSIC").map(PathBuf::from);
        composer.music_volume = parse_or(&lookup, "REELCUT_MUSIC_VOLUME", composer.music_volume)?;
        composer.enhancement.enabled = parse_or(&lookup, "REELCUT_ENHANCE", false)?;
        let ffmpeg_timeout = parse_or(&lookup, "REELCUT_FFMPEG_TIMEOUT_SECS", DEFAULT_FFMPEG_TIMEOUT_SECS)?;
        composer.ffmpeg_timeout_secs = (ffmpeg_timeout > 0).then_some(ffmpeg_timeout);

        let gemini = GeminiConfig {
            api_key: non_empty(&lookup, "GEMINI_API_KEY"),
            models: match non_empty(&lookup, "GEMINI_MODELS") {
                Some(list) => list
                    .split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(String::from)
                    .collect(),
                None => DEFAULT_GEMINI_MODELS.iter().map(|m| m.to_string()).collect(),
            },
        };

        let config = Self {
            manifest: non_empty(&lookup, "REELCUT_MANIFEST").map(PathBuf::from),
            selector,
            scorer,
            composer,
            gemini,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> WorkerResult<()> {
        let s = &self.selector;
        if !s.min_duration.is_finite() || !s.max_duration.is_finite() || s.min_duration < 0.0 {
            return Err(WorkerError::config_error("duration bounds must be finite and non-negative"));
        }
        if s.min_duration > s.max_duration {
            return Err(WorkerError::config_error(format!(
                "min duration {}s exceeds max duration {}s",
                s.min_duration, s.max_duration
            )));
        }
        if self.composer.max_parallel == 0 {
            return Err(WorkerError::config_error("max parallel segments must be at least 1"));
        }
        if self.scorer.timeout.is_zero() {
            return Err(WorkerError::config_error("scoring timeout must be positive"));
        }
        volume_to_db(self.composer.music_volume)
            .map_err(|e| WorkerError::config_error(format!("music volume: {e}")))?;
        Ok(())
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse `key` when set, falling back to `default` when unset or empty.
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> WorkerResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match non_empty(lookup, key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| WorkerError::config_error(format!("{key} has an invalid value '{raw}'"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> WorkerResult<PipelineConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PipelineConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.selector.count, 5);
        assert_eq!(config.selector.min_duration, 15.0);
        assert_eq!(config.selector.max_duration, 60.0);
        assert_eq!(config.selector.overlap_policy, OverlapPolicy::Reject);
        assert_eq!(config.scorer.timeout, Duration::from_secs(30));
        assert_eq!(config.composer.max_parallel, 4);
        assert_eq!(config.composer.music_volume, 0.2);
        assert!(!config.composer.enhancement.enabled);
        assert_eq!(config.composer.ffmpeg_timeout_secs, Some(DEFAULT_FFMPEG_TIMEOUT_SECS));
        assert!(config.gemini.api_key.is_none());
        assert_eq!(config.gemini.models.len(), DEFAULT_GEMINI_MODELS.len());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("REELCUT_CLIP_COUNT", "3"),
            ("REELCUT_MIN_DURATION", "10"),
            ("REELCUT_MAX_DURATION", "45.5"),
            ("REELCUT_OVERLAP_POLICY", "Allow"),
            ("REELCUT_BACKGROUND_MUSIC", "/music/bed.mp3"),
            ("REELCUT_ENHANCE", "true"),
            ("GEMINI_MODELS", "model-a, model-b,"),
            ("GEMINI_API_KEY", "secret"),
        ])
        .unwrap();
        assert_eq!(config.selector.count, 3);
        assert_eq!(config.selector.max_duration, 45.5);
        assert_eq!(config.selector.overlap_policy, OverlapPolicy::Allow);
        assert_eq!(config.composer.background_music, Some(PathBuf::from("/music/bed.mp3")));
        assert!(config.composer.enhancement.enabled);
        assert_eq!(config.gemini.models, vec!["model-a", "model-b"]);
        assert!(!format!("{:?}", config.gemini).contains("secret"));
    }

    #[test]
    fn test_ffmpeg_timeout() {
        let config = config_from(&[("REELCUT_FFMPEG_TIMEOUT_SECS", "90")]).unwrap();
        assert_eq!(config.composer.ffmpeg_timeout_secs, Some(90));

        let config = config_from(&[("REELCUT_FFMPEG_TIMEOUT_SECS", "0")]).unwrap();
        assert_eq!(config.composer.ffmpeg_timeout_secs, None);

        assert!(config_from(&[("REELCUT_FFMPEG_TIMEOUT_SECS", "-5")]).is_err());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            config_from(&[("REELCUT_CLIP_COUNT", "many")]),
            Err(WorkerError::ConfigError(_))
        ));
        assert!(config_from(&[("REELCUT_MIN_DURATION", "90")]).is_err());
        assert!(config_from(&[("REELCUT_MAX_PARALLEL", "0")]).is_err());
        assert!(config_from(&[("REELCUT_MUSIC_VOLUME", "-0.5")]).is_err());
        assert!(config_from(&[("REELCUT_OVERLAP_POLICY", "merge")]).is_err());
    }
}
