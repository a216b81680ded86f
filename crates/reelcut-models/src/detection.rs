//! Per-frame face and motion detections.
//!
//! Detection itself happens outside the pipeline; these types only carry
//! its results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::timestamp::deserialize_seconds;

/// Bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    /// Left edge x-coordinate
    pub x: f64,
    /// Top edge y-coordinate
    pub y: f64,
    /// Box width
    pub width: f64,
    /// Box height
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Center x-coordinate.
    #[inline]
    pub fn cx(&self) -> f64 {
        self.x + self.width / 2.0
    }

    /// Center y-coordinate.
    #[inline]
    pub fn cy(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// Right edge x-coordinate.
    #[inline]
    pub fn x2(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge y-coordinate.
    #[inline]
    pub fn y2(&self) -> f64 {
        self.y + self.height
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Compute bounding box that contains all input boxes.
    pub fn union<'a, I>(boxes: I) -> Option<BoundingBox>
    where
        I: IntoIterator<Item = &'a BoundingBox>,
    {
        boxes.into_iter().fold(None, |acc, b| {
            Some(match acc {
                None => *b,
                Some(u) => {
                    let x = u.x.min(b.x);
                    let y = u.y.min(b.y);
                    BoundingBox {
                        x,
                        y,
                        width: u.x2().max(b.x2()) - x,
                        height: u.y2().max(b.y2()) - y,
                    }
                }
            })
        })
    }
}

/// What produced a detection box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DetectionKind {
    Face,
    Motion,
}

/// One detection on one frame. A frame may carry several boxes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameBox {
    /// Frame time in seconds, segment-local once extracted
    #[serde(deserialize_with = "deserialize_seconds")]
    pub timestamp: f64,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    /// Detector confidence (0.0-1.0). Motion boxes usually carry 1.0.
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    pub kind: DetectionKind,
}

fn default_confidence() -> f64 {
    1.0
}

impl FrameBox {
    pub fn face(timestamp: f64, bbox: BoundingBox, confidence: f64) -> Self {
        Self::with_kind(DetectionKind::Face, timestamp, bbox, confidence)
    }

    pub fn motion(timestamp: f64, bbox: BoundingBox) -> Self {
        Self::with_kind(DetectionKind::Motion, timestamp, bbox, 1.0)
    }

    fn with_kind(kind: DetectionKind, timestamp: f64, bbox: BoundingBox, confidence: f64) -> Self {
        Self {
            timestamp,
            x: bbox.x,
            y: bbox.y,
            w: bbox.width,
            h: bbox.height,
            confidence,
            kind,
        }
    }

    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(self.x, self.y, self.w, self.h)
    }

    /// Copy of this box shifted onto a timeline starting at `origin`.
    pub fn rebased(&self, origin: f64) -> Self {
        Self {
            timestamp: self.timestamp - origin,
            ..self.clone()
        }
    }
}
