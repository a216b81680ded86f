//! Aspect ratios, frame sizes and crop windows.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Target aspect ratio for output video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct AspectRatio {
    /// Width component
    pub width: u32,
    /// Height component
    pub height: u32,
}

impl AspectRatio {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns width/height as float.
    pub fn ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Portrait 9:16 (TikTok, Instagram Reels, YouTube Shorts)
    pub const PORTRAIT: AspectRatio = AspectRatio { width: 9, height: 16 };

    /// Square 1:1 (Instagram)
    pub const SQUARE: AspectRatio = AspectRatio { width: 1, height: 1 };

    /// Landscape 16:9 (YouTube)
    pub const LANDSCAPE: AspectRatio = AspectRatio { width: 16, height: 9 };
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::PORTRAIT
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(':')
            .ok_or_else(|| ModelError::InvalidAspectRatio(s.to_string()))?;
        let width: u32 = w
            .trim()
            .parse()
            .map_err(|_| ModelError::InvalidAspectRatio(s.to_string()))?;
        let height: u32 = h
            .trim()
            .parse()
            .map_err(|_| ModelError::InvalidAspectRatio(s.to_string()))?;
        if width == 0 || height == 0 {
            return Err(ModelError::InvalidAspectRatio(s.to_string()));
        }
        Ok(Self { width, height })
    }
}

/// Source frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn center_x(&self) -> f64 {
        self.width as f64 / 2.0
    }
}

/// Crop window applied to one output frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CropWindow {
    /// Frame time in segment-local seconds, stored as milliseconds so the
    /// window is `Eq` and renders identically on every run.
    pub timestamp_ms: u64,
    /// Left edge x-coordinate
    pub x: u32,
    /// Top edge y-coordinate
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropWindow {
    pub fn new(timestamp: f64, x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            timestamp_ms: (timestamp.max(0.0) * 1000.0).round() as u64,
            x,
            y,
            width,
            height,
        }
    }

    /// Frame time in seconds.
    pub fn timestamp(&self) -> f64 {
        self.timestamp_ms as f64 / 1000.0
    }

    /// Whether the window has the same geometry as `other`.
    pub fn same_geometry(&self, other: &CropWindow) -> bool {
        self.x == other.x
            && self.y == other.y
            && self.width == other.width
            && self.height == other.height
    }
}
