//! Optional visual enhancement filters.

use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// Visual enhancement applied after cropping and before captions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancementConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Contrast multiplier (1.0 = unchanged)
    #[serde(default = "default_contrast")]
    pub contrast: f64,

    /// Additive brightness offset (-1.0..1.0)
    #[serde(default)]
    pub brightness: f64,

    /// Saturation multiplier (1.0 = unchanged)
    #[serde(default = "default_saturation")]
    pub saturation: f64,

    /// Unsharp-mask strength (1.0 = unchanged)
    #[serde(default = "default_sharpen")]
    pub sharpen: f64,

    /// Vignette strength (0.0 = off, 1.0 = strongest)
    #[serde(default)]
    pub vignette: f64,

    /// Center zoom factor (1.0 = off)
    #[serde(default = "default_zoom")]
    pub zoom: f64,
}

fn default_contrast() -> f64 {
    1.2
}
fn default_saturation() -> f64 {
    1.2
}
fn default_sharpen() -> f64 {
    1.5
}
fn default_zoom() -> f64 {
    1.0
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            contrast: default_contrast(),
            brightness: 0.0,
            saturation: default_saturation(),
            sharpen: default_sharpen(),
            vignette: 0.0,
            zoom: default_zoom(),
        }
    }
}

impl EnhancementConfig {
    /// Filters for a frame of `width`x`height`, or empty when disabled.
    pub fn filters(&self, width: u32, height: u32) -> Vec<String> {
        if !self.enabled {
            return Vec::new();
        }

        let mut filters = Vec::new();

        if self.zoom > 1.0 {
            filters.push(format!(
                "crop=iw/{z:.3}:ih/{z:.3},scale={width}:{height}:flags=lanczos,setsar=1",
                z = self.zoom
            ));
        }

        let contrast = self.contrast.clamp(-1000.0, 1000.0);
        let brightness = self.brightness.clamp(-1.0, 1.0);
        let saturation = self.saturation.clamp(0.0, 3.0);
        if (contrast - 1.0).abs() > f64::EPSILON
            || brightness.abs() > f64::EPSILON
            || (saturation - 1.0).abs() > f64::EPSILON
        {
            filters.push(format!(
                "eq=contrast={contrast:.3}:brightness={brightness:.3}:saturation={saturation:.3}"
            ));
        }

        // unsharp amount is the extra detail added on top of the frame
        let amount = (self.sharpen - 1.0).clamp(-1.5, 1.5);
        if amount.abs() > f64::EPSILON {
            filters.push(format!("unsharp=5:5:{amount:.3}:5:5:0"));
        }

        if self.vignette > 0.0 {
            let angle = self.vignette.min(1.0) * FRAC_PI_2;
            filters.push(format!("vignette=angle={angle:.4}"));
        }

        filters
    }
}
