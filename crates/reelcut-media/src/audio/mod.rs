//! Audio track shaping and mixing.

pub mod graph;
mod mixer;
mod track;

pub use graph::{build_audio_graph, AudioGraph, AudioInput, InputRegistry};
pub use mixer::{volume_to_db, AudioMixer, MixerConfig};
pub use track::{AudioOp, AudioTrack, TrackSource};
