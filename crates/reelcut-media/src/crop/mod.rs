//! Crop trajectory planning for vertical reframing.
//!
//! Turns per-frame face and motion boxes into one crop window per output
//! frame, smoothed so the virtual camera never jumps.

mod planner;
pub mod smoothing;

pub use planner::{crop_geometry, CropPlannerConfig, CropTrajectoryPlanner};
