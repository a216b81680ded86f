//! Mapping source-time captions onto a segment's local timeline.

use tracing::{debug, warn};

use reelcut_models::{Caption, CaptionCue, CaptionStyle, Segment};

/// Lays out caption cues for one segment.
#[derive(Debug, Clone, Default)]
pub struct CaptionLayoutEngine {
    base_style: CaptionStyle,
}

impl CaptionLayoutEngine {
    pub fn new(base_style: CaptionStyle) -> Self {
        Self { base_style }
    }

    pub fn base_style(&self) -> &CaptionStyle {
        &self.base_style
    }

    /// Rebase `cues` into `segment`-local time.
    ///
    /// Cues entirely outside the segment are dropped and partially
    /// overlapping ones are clipped to its boundaries. Input order is kept
    /// and doubles as overlay order; overlapping captions are allowed.
    pub fn layout(&self, cues: &[CaptionCue], segment: &Segment) -> Vec<Caption> {
        let seg_start = segment.start();
        let seg_end = segment.end();

        let captions: Vec<Caption> = cues
            .iter()
            .filter_map(|cue| {
                if !cue.start.is_finite() || !cue.end.is_finite() || cue.end <= cue.start {
                    warn!(
                        text = %cue.text,
                        start = cue.start,
                        end = cue.end,
                        "Skipping caption with an empty time range"
                    );
                    return None;
                }
                if cue.end <= seg_start || cue.start >= seg_end {
                    return None;
                }
                Some(Caption {
                    text: cue.text.clone(),
                    start: cue.start.max(seg_start) - seg_start,
                    end: cue.end.min(seg_end) - seg_start,
                    style: cue.style.resolve(&self.base_style),
                })
            })
            .collect();

        debug!(
            total = cues.len(),
            kept = captions.len(),
            segment_start = seg_start,
            "Laid out captions"
        );
        captions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelcut_models::{CaptionPosition, CaptionStyleOverrides};

    fn segment() -> Segment {
        Segment::new(10.0, 20.0, "src").unwrap()
    }

    #[test]
    fn test_drops_captions_outside_segment() {
        let cues = vec![
            CaptionCue::new("before", 2.0, 9.0),
            CaptionCue::new("touching start", 8.0, 10.0),
            CaptionCue::new("touching end", 20.0, 22.0),
            CaptionCue::new("after", 25.0, 30.0),
        ];
        assert!(CaptionLayoutEngine::default().layout(&cues, &segment()).is_empty());
    }

    #[test]
    fn test_rebases_and_clips_to_segment() {
        let cues = vec![
            CaptionCue::new("inside", 12.0, 14.5),
            CaptionCue::new("straddles start", 8.0, 11.0),
            CaptionCue::new("straddles end", 19.0, 23.0),
            CaptionCue::new("covers all", 0.0, 100.0),
        ];
        let captions = CaptionLayoutEngine::default().layout(&cues, &segment());

        let ranges: Vec<(f64, f64)> = captions.iter().map(|c| (c.start, c.end)).collect();
        assert_eq!(ranges, vec![(2.0, 4.5), (0.0, 1.0), (9.0, 10.0), (0.0, 10.0)]);
        assert!(captions.iter().all(|c| c.start >= 0.0 && c.end <= segment().duration()));
    }

    #[test]
    fn test_resolves_default_and_override_styles() {
        let cues = vec![
            CaptionCue::new("plain", 11.0, 12.0),
            CaptionCue::new("styled", 11.0, 12.0).with_style(CaptionStyleOverrides {
                position: Some(CaptionPosition::TopCenter),
                font_size: Some(64),
                ..Default::default()
            }),
        ];
        let captions = CaptionLayoutEngine::default().layout(&cues, &segment());

        assert_eq!(captions[0].style, CaptionStyle::default());
        assert_eq!(captions[1].style.position, CaptionPosition::TopCenter);
        assert_eq!(captions[1].style.font_size, 64);
        assert_eq!(captions[1].style.color, "white");
    }

    #[test]
    fn test_overlapping_captions_are_kept() {
        let cues = vec![
            CaptionCue::new("a", 11.0, 15.0),
            CaptionCue::new("b", 12.0, 16.0),
        ];
        assert_eq!(CaptionLayoutEngine::default().layout(&cues, &segment()).len(), 2);
    }

    #[test]
    fn test_skips_inverted_cues() {
        let cues = vec![CaptionCue::new("bad", 15.0, 12.0)];
        assert!(CaptionLayoutEngine::default().layout(&cues, &segment()).is_empty());
    }
}
