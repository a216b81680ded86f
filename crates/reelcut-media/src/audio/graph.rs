//! Rendering logical audio tracks as FFmpeg filter graphs.

use std::path::{Path, PathBuf};

use super::track::{AudioOp, AudioTrack, TrackSource};
use crate::command::FfmpegInput;

/// Loudness target used when a track's peak level is unknown.
const LOUDNORM_FILTER: &str = "loudnorm=I=-16:TP=-1.5:LRA=11";

/// An FFmpeg input feeding the audio graph.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioInput {
    pub path: PathBuf,
    /// Times the file is played back to back
    pub plays: u32,
}

impl AudioInput {
    /// The `-i` input, with `-stream_loop` when the file repeats.
    pub fn to_ffmpeg_input(&self) -> FfmpegInput {
        let input = FfmpegInput::new(&self.path);
        if self.plays > 1 {
            input
                .arg("-stream_loop")
                .arg((self.plays - 1).to_string())
        } else {
            input
        }
    }
}

/// Input indices shared between the video and audio parts of a command.
#[derive(Debug, Clone, Default)]
pub struct InputRegistry {
    inputs: Vec<AudioInput>,
    preexisting: usize,
}

impl InputRegistry {
    /// Registry whose first inputs are already part of the command.
    pub fn with_existing(existing: Vec<AudioInput>) -> Self {
        let preexisting = existing.len();
        Self {
            inputs: existing,
            preexisting,
        }
    }

    /// Index of the input for `path` played `plays` times, adding it if new.
    pub fn register(&mut self, path: &Path, plays: u32) -> usize {
        if let Some(index) = self
            .inputs
            .iter()
            .position(|i| i.path == path && i.plays == plays)
        {
            return index;
        }
        self.inputs.push(AudioInput {
            path: path.to_path_buf(),
            plays,
        });
        self.inputs.len() - 1
    }

    /// Inputs added by graph building, in index order.
    pub fn added(&self) -> &[AudioInput] {
        &self.inputs[self.preexisting..]
    }
}

/// Audio part of an FFmpeg command.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioGraph {
    /// `-filter_complex` chains, if any processing is needed
    pub filter: Option<String>,
    /// Value for `-map`
    pub map: String,
}

/// Build the filter graph producing `track`.
pub fn build_audio_graph(track: &AudioTrack, registry: &mut InputRegistry) -> AudioGraph {
    let mut builder = GraphBuilder {
        registry,
        chains: Vec::new(),
        next_label: 0,
    };
    let label = builder.visit(track);

    if builder.chains.is_empty() {
        AudioGraph {
            filter: None,
            map: label,
        }
    } else {
        AudioGraph {
            filter: Some(builder.chains.join(";")),
            map: format!("[{label}]"),
        }
    }
}

struct GraphBuilder<'r> {
    registry: &'r mut InputRegistry,
    chains: Vec<String>,
    next_label: usize,
}

impl GraphBuilder<'_> {
    fn fresh_label(&mut self) -> String {
        let label = format!("a{}", self.next_label);
        self.next_label += 1;
        label
    }

    fn visit(&mut self, track: &AudioTrack) -> String {
        let label = match track.source() {
            TrackSource::File { path, .. } => {
                let index = self.registry.register(path, track.plays());
                format!("{index}:a")
            }
            TrackSource::Mix {
                primary,
                background,
            } => {
                let primary = self.visit(primary);
                let background = self.visit(background);
                let out = self.fresh_label();
                self.chains.push(format!(
                    "[{primary}][{background}]amix=inputs=2:duration=first:dropout_transition=0:normalize=0[{out}]"
                ));
                out
            }
        };

        let filters: Vec<String> = track.ops().iter().filter_map(op_filter).collect();
        if filters.is_empty() {
            return label;
        }
        let out = self.fresh_label();
        self.chains.push(format!("[{label}]{}[{out}]", filters.join(",")));
        out
    }
}

fn op_filter(op: &AudioOp) -> Option<String> {
    match op {
        AudioOp::Loop { .. } => None,
        AudioOp::Trim { duration } => Some(format!("atrim=end={duration:.3},asetpts=PTS-STARTPTS")),
        AudioOp::Gain { db } => Some(format!("volume={db:.2}dB")),
        AudioOp::Mute => Some("volume=0".to_string()),
        AudioOp::FadeIn { duration } => Some(format!("afade=t=in:st=0:d={duration:.3}")),
        AudioOp::FadeOut { start, duration } => {
            Some(format!("afade=t=out:st={start:.3}:d={duration:.3}"))
        }
        AudioOp::Loudnorm => Some(LOUDNORM_FILTER.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioMixer;

    fn clip_registry() -> InputRegistry {
        InputRegistry::with_existing(vec![AudioInput {
            path: PathBuf::from("clip.mp4"),
            plays: 1,
        }])
    }

    #[test]
    fn test_plain_track_maps_stream_directly() {
        let track = AudioTrack::from_file("clip.mp4", 10.0).unwrap();
        let mut registry = clip_registry();
        let graph = build_audio_graph(&track, &mut registry);

        assert_eq!(graph.filter, None);
        assert_eq!(graph.map, "0:a");
        assert!(registry.added().is_empty());
    }

    #[test]
    fn test_mixed_track_graph() {
        let primary = AudioTrack::from_file("clip.mp4", 20.0).unwrap().with_peak_db(-3.1);
        let music = AudioTrack::from_file("music.mp3", 8.0).unwrap();
        let mixed = AudioMixer::default().mix(primary, Some(music), 20.0, 0.5).unwrap();

        let mut registry = clip_registry();
        let graph = build_audio_graph(&mixed, &mut registry);
        let filter = graph.filter.unwrap();

        assert_eq!(
            registry.added(),
            &[AudioInput {
                path: PathBuf::from("music.mp3"),
                plays: 3
            }]
        );
        assert!(filter.contains("[0:a]volume=3.00dB[a0]"));
        assert!(filter.contains(
            "[1:a]atrim=end=20.000,asetpts=PTS-STARTPTS,volume=-6.02dB,afade=t=in:st=0:d=3.000,afade=t=out:st=17.000:d=3.000[a1]"
        ));
        assert!(filter.ends_with("[a0][a1]amix=inputs=2:duration=first:dropout_transition=0:normalize=0[a2]"));
        assert_eq!(graph.map, "[a2]");
    }

    #[test]
    fn test_looped_input_uses_stream_loop() {
        let input = AudioInput {
            path: PathBuf::from("music.mp3"),
            plays: 3,
        };
        let cmd = crate::command::FfmpegCommand::new("clip.mp4", "out.mp4").input(input.to_ffmpeg_input());
        let args = cmd.build_args();
        let pos = args.iter().position(|a| a == "-stream_loop").unwrap();
        assert_eq!(args[pos + 1], "2");
    }
}
