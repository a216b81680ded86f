//! Caption layout and overlay rendering.

pub mod drawtext;
mod layout;

pub use drawtext::{caption_filter_chain, drawtext_filter};
pub use layout::CaptionLayoutEngine;
