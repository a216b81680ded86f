//! Caption records and caption style configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::timestamp::deserialize_seconds;

pub const DEFAULT_CAPTION_FONT: &str = "Arial-Bold";
pub const DEFAULT_CAPTION_FONT_SIZE: u32 = 40;
pub const DEFAULT_CAPTION_COLOR: &str = "white";
pub const DEFAULT_CAPTION_STROKE_COLOR: &str = "black";
pub const DEFAULT_CAPTION_STROKE_WIDTH: u32 = 2;
/// Fade-in applied to animated captions (seconds).
pub const DEFAULT_CAPTION_FADE_IN: f64 = 0.5;

/// Where a caption sits on the output frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaptionPosition {
    TopCenter,
    Center,
    #[default]
    BottomCenter,
}

/// Fully resolved caption style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CaptionStyle {
    #[serde(default = "default_font")]
    pub font: String,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    /// Fill color (FFmpeg color name or `#RRGGBB`)
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_stroke_color")]
    pub stroke_color: String,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: u32,
    #[serde(default)]
    pub position: CaptionPosition,
    /// Vertical margin from the anchored edge as a fraction of frame height
    #[serde(default = "default_margin")]
    pub margin: f64,
    /// Fade the caption in over `fade_in` seconds
    #[serde(default)]
    pub animate: bool,
    #[serde(default = "default_fade_in")]
    pub fade_in: f64,
}

fn default_font() -> String {
    DEFAULT_CAPTION_FONT.to_string()
}
fn default_font_size() -> u32 {
    DEFAULT_CAPTION_FONT_SIZE
}
fn default_color() -> String {
    DEFAULT_CAPTION_COLOR.to_string()
}
fn default_stroke_color() -> String {
    DEFAULT_CAPTION_STROKE_COLOR.to_string()
}
fn default_stroke_width() -> u32 {
    DEFAULT_CAPTION_STROKE_WIDTH
}
fn default_margin() -> f64 {
    0.08
}
fn default_fade_in() -> f64 {
    DEFAULT_CAPTION_FADE_IN
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font: default_font(),
            font_size: DEFAULT_CAPTION_FONT_SIZE,
            color: default_color(),
            stroke_color: default_stroke_color(),
            stroke_width: DEFAULT_CAPTION_STROKE_WIDTH,
            position: CaptionPosition::default(),
            margin: default_margin(),
            animate: false,
            fade_in: DEFAULT_CAPTION_FADE_IN,
        }
    }
}

/// Per-caption style overrides; unset fields fall back to a base style.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CaptionStyleOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<CaptionPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fade_in: Option<f64>,
}

impl CaptionStyleOverrides {
    /// Resolve against `base`, taking every field this override leaves unset.
    pub fn resolve(&self, base: &CaptionStyle) -> CaptionStyle {
        CaptionStyle {
            font: self.font.clone().unwrap_or_else(|| base.font.clone()),
            font_size: self.font_size.unwrap_or(base.font_size),
            color: self.color.clone().unwrap_or_else(|| base.color.clone()),
            stroke_color: self
                .stroke_color
                .clone()
                .unwrap_or_else(|| base.stroke_color.clone()),
            stroke_width: self.stroke_width.unwrap_or(base.stroke_width),
            position: self.position.unwrap_or(base.position),
            margin: self.margin.unwrap_or(base.margin),
            animate: self.animate.unwrap_or(base.animate),
            fade_in: self.fade_in.unwrap_or(base.fade_in),
        }
    }
}

/// A caption on the source timeline, as supplied upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionCue {
    pub text: String,
    #[serde(deserialize_with = "deserialize_seconds")]
    pub start: f64,
    #[serde(deserialize_with = "deserialize_seconds")]
    pub end: f64,
    #[serde(default)]
    pub style: CaptionStyleOverrides,
}

impl CaptionCue {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            style: CaptionStyleOverrides::default(),
        }
    }

    pub fn with_style(mut self, style: CaptionStyleOverrides) -> Self {
        self.style = style;
        self
    }
}

/// A caption laid out on a segment-local timeline with a resolved style.
///
/// Captions are independent overlay layers; overlapping time ranges are
/// rendered on top of each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub style: CaptionStyle,
}

impl Caption {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}
