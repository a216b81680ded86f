//! Transcript text with optional per-segment timing.

use serde::{Deserialize, Serialize};

use crate::caption::CaptionCue;
use crate::timestamp::{deserialize_seconds, format_seconds};

/// A timed span of transcribed speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    #[serde(deserialize_with = "deserialize_seconds")]
    pub start: f64,
    #[serde(deserialize_with = "deserialize_seconds")]
    pub end: f64,
    pub text: String,
}

/// Output of the transcription collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.segments.is_empty()
    }

    /// Plain transcript text; rebuilt from timed segments when no text was supplied.
    pub fn full_text(&self) -> String {
        if !self.text.trim().is_empty() {
            return self.text.clone();
        }
        self.segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Transcript with `[HH:MM:SS]` markers for prompting, when timing is available.
    pub fn timestamped_text(&self) -> String {
        if self.segments.is_empty() {
            return self.text.clone();
        }
        self.segments
            .iter()
            .map(|s| format!("[{}] {}", format_seconds(s.start), s.text.trim()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// One caption cue per timed segment, on the source timeline.
    pub fn caption_cues(&self) -> Vec<CaptionCue> {
        self.segments
            .iter()
            .filter(|s| !s.text.trim().is_empty() && s.end > s.start)
            .map(|s| CaptionCue::new(s.text.trim(), s.start, s.end))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transcript {
        Transcript {
            text: String::new(),
            segments: vec![
                TranscriptSegment {
                    start: 0.0,
                    end: 2.0,
                    text: " Hello there ".into(),
                },
                TranscriptSegment {
                    start: 2.0,
                    end: 2.0,
                    text: "dropped".into(),
                },
                TranscriptSegment {
                    start: 62.5,
                    end: 64.0,
                    text: "world".into(),
                },
            ],
        }
    }

    #[test]
    fn test_full_text_falls_back_to_segments() {
        assert_eq!(sample().full_text(), "Hello there dropped world");
    }

    #[test]
    fn test_timestamped_text() {
        let text = sample().timestamped_text();
        assert!(text.starts_with("[00:00:00] Hello there"));
        assert!(text.contains("[00:01:02.500] world"));
    }

    #[test]
    fn test_caption_cues_skip_empty_ranges() {
        let cues = sample().caption_cues();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].text, "Hello there");
        assert_eq!(cues[1].start, 62.5);
    }
}
