//! Per-frame crop planning from face and motion detections.

use serde::{Deserialize, Serialize};
use tracing::debug;

use reelcut_models::{AspectRatio, BoundingBox, CropWindow, DetectionKind, FrameBox, FrameSize};

use super::smoothing::{limit_step, moving_average, window_frames};
use crate::error::{MediaError, MediaResult};

/// Configuration for crop trajectory planning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropPlannerConfig {
    /// Target output aspect ratio
    #[serde(default)]
    pub target_aspect: AspectRatio,

    /// Moving-average window in seconds
    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: f64,

    /// Maximum horizontal camera speed in pixels/second (None = unlimited)
    #[serde(default = "default_max_pan_speed")]
    pub max_pan_speed: Option<f64>,
}

fn default_smoothing_window() -> f64 {
    0.5
}

fn default_max_pan_speed() -> Option<f64> {
    Some(600.0)
}

impl Default for CropPlannerConfig {
    fn default() -> Self {
        Self {
            target_aspect: AspectRatio::PORTRAIT,
            smoothing_window: default_smoothing_window(),
            max_pan_speed: default_max_pan_speed(),
        }
    }
}

/// Crop width and height for a frame at the target aspect.
///
/// Full frame height is kept when possible; the width is rounded down to an
/// even number for the encoder.
pub fn crop_geometry(frame: FrameSize, aspect: AspectRatio) -> (u32, u32) {
    let ratio = aspect.ratio();
    let width = even_floor(frame.height as f64 * ratio);
    if width <= frame.width {
        return (width.max(2).min(frame.width), frame.height);
    }
    let width = even_floor(frame.width as f64).max(2);
    let height = even_floor(width as f64 / ratio).clamp(2, frame.height.max(2));
    (width, height)
}

fn even_floor(value: f64) -> u32 {
    let v = value.floor().max(0.0) as u32;
    v - v % 2
}

/// Plans a smoothed crop window for each output frame of a segment.
///
/// Stateless and deterministic: identical detections always give identical
/// windows.
#[derive(Debug, Clone)]
pub struct CropTrajectoryPlanner {
    config: CropPlannerConfig,
    frame: FrameSize,
}

impl CropTrajectoryPlanner {
    pub fn new(config: CropPlannerConfig, frame: FrameSize) -> Self {
        Self { config, frame }
    }

    pub fn frame(&self) -> FrameSize {
        self.frame
    }

    /// Plan crop windows for a segment.
    ///
    /// `frame_boxes` carry segment-local timestamps. Frames without any box
    /// fall back to the frame center.
    pub fn plan(
        &self,
        frame_boxes: &[FrameBox],
        segment_duration: f64,
        frame_rate: f64,
    ) -> MediaResult<Vec<CropWindow>> {
        if !segment_duration.is_finite() || segment_duration <= 0.0 {
            return Err(MediaError::invalid_input(format!(
                "segment duration must be positive, got {segment_duration}"
            )));
        }
        if !frame_rate.is_finite() || frame_rate <= 0.0 {
            return Err(MediaError::invalid_input(format!(
                "frame rate must be positive, got {frame_rate}"
            )));
        }
        if self.frame.width < 2 || self.frame.height < 2 {
            return Err(MediaError::invalid_input(format!(
                "frame size {}x{} is too small to crop",
                self.frame.width, self.frame.height
            )));
        }

        let frame_count = ((segment_duration * frame_rate) - 1e-6).ceil().max(1.0) as usize;
        let (crop_w, crop_h) = crop_geometry(self.frame, self.config.target_aspect);

        let buckets = bucket_by_frame(frame_boxes, frame_rate, frame_count);
        let half = crop_w as f64 / 2.0;
        let max_center = self.frame.width as f64 - half;

        let raw: Vec<f64> = buckets
            .iter()
            .map(|boxes| self.focus_x(boxes).clamp(half, max_center))
            .collect();

        let window = window_frames(self.config.smoothing_window, frame_rate);
        let mut centers = moving_average(&raw, window);
        if let Some(speed) = self.config.max_pan_speed {
            centers = limit_step(&centers, speed / frame_rate);
        }

        let with_detections = buckets.iter().filter(|b| !b.is_empty()).count();
        debug!(
            frames = frame_count,
            with_detections,
            smoothing_frames = window,
            crop_width = crop_w,
            crop_height = crop_h,
            "Planned crop trajectory"
        );

        let max_x = self.frame.width - crop_w;
        let y = (self.frame.height - crop_h) / 2;
        Ok(centers
            .iter()
            .enumerate()
            .map(|(i, cx)| {
                let x = (cx - half).round().clamp(0.0, max_x as f64) as u32;
                CropWindow::new(i as f64 / frame_rate, x, y, crop_w, crop_h)
            })
            .collect())
    }

    /// Horizontal focus for one frame: best face, else motion union, else center.
    fn focus_x(&self, boxes: &[&FrameBox]) -> f64 {
        let best_face = boxes
            .iter()
            .filter(|b| b.kind == DetectionKind::Face)
            .fold(None::<&FrameBox>, |best, b| match best {
                Some(current) if current.confidence >= b.confidence => Some(current),
                _ => Some(*b),
            });
        if let Some(face) = best_face {
            return face.bbox().cx();
        }

        let motion: Vec<BoundingBox> = boxes
            .iter()
            .filter(|b| b.kind == DetectionKind::Motion)
            .map(|b| b.bbox())
            .collect();
        match BoundingBox::union(&motion) {
            Some(union) => union.cx(),
            None => self.frame.center_x(),
        }
    }
}

/// Group boxes by the output frame nearest to their timestamp.
fn bucket_by_frame(frame_boxes: &[FrameBox], frame_rate: f64, frame_count: usize) -> Vec<Vec<&FrameBox>> {
    let mut buckets: Vec<Vec<&FrameBox>> = vec![Vec::new(); frame_count];
    for fb in frame_boxes {
        if !fb.timestamp.is_finite() || fb.timestamp < 0.0 || !valid_box(fb) {
            continue;
        }
        let index = (fb.timestamp * frame_rate).round() as usize;
        if let Some(bucket) = buckets.get_mut(index) {
            bucket.push(fb);
        }
    }
    buckets
}

fn valid_box(fb: &FrameBox) -> bool {
    [fb.x, fb.y, fb.w, fb.h, fb.confidence]
        .iter()
        .all(|v| v.is_finite())
        && fb.w > 0.0
        && fb.h > 0.0
}
