//! Final clip rendering.
//!
//! A single FFmpeg pass crops with a `sendcmd`-driven `crop` filter, scales
//! to the portrait output, applies enhancement, draws captions above the
//! video and maps the mixed audio graph.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use reelcut_models::{Caption, CropWindow, EncodingConfig};

use crate::audio::{build_audio_graph, AudioInput, AudioTrack, InputRegistry};
use crate::captions::caption_filter_chain;
use crate::captions::drawtext::quote_filter_value;
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::enhance::EnhancementConfig;
use crate::error::{MediaError, MediaResult};

/// Name of the crop filter instance targeted by `sendcmd`.
const CROP_TARGET: &str = "crop@reframe";

/// Everything needed to render one clip.
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Extracted segment media (segment-local timeline)
    pub video: PathBuf,
    /// One crop window per output frame
    pub crop: Vec<CropWindow>,
    /// Caption overlays in z-order
    pub captions: Vec<Caption>,
    /// Final audio; `None` renders a silent clip
    pub audio: Option<AudioTrack>,
    /// Clip duration in seconds
    pub duration: f64,
    /// Scratch directory for scripts and caption text files
    pub work_dir: PathBuf,
}

/// Encodes a render job into an output file.
#[async_trait]
pub trait ClipRenderer: Send + Sync {
    async fn render(&self, job: &RenderJob, output: &Path) -> MediaResult<()>;
}

/// `sendcmd` script moving the crop window; `None` when it never moves.
pub fn sendcmd_script(windows: &[CropWindow]) -> Option<String> {
    let first = windows.first()?;
    if windows.iter().all(|w| w.same_geometry(first)) {
        return None;
    }

    let mut lines = Vec::new();
    let mut prev = *first;
    for window in &windows[1..] {
        let mut commands = Vec::new();
        if window.x != prev.x {
            commands.push(format!("{CROP_TARGET} x {}", window.x));
        }
        if window.y != prev.y {
            commands.push(format!("{CROP_TARGET} y {}", window.y));
        }
        if !commands.is_empty() {
            lines.push(format!("{:.3} {};", window.timestamp(), commands.join(", ")));
        }
        prev = *window;
    }
    Some(lines.join("\n"))
}

/// FFmpeg-backed [`ClipRenderer`].
#[derive(Debug, Clone, Default)]
pub struct FfmpegRenderer {
    encoding: EncodingConfig,
    enhancement: EnhancementConfig,
    runner: FfmpegRunner,
}

impl FfmpegRenderer {
    pub fn new(encoding: EncodingConfig, enhancement: EnhancementConfig, runner: FfmpegRunner) -> Self {
        Self {
            encoding,
            enhancement,
            runner,
        }
    }

    /// Build the render command.
    ///
    /// `crop_script` is the path of a written [`sendcmd_script`], and
    /// `caption_files[i]` holds the text of `job.captions[i]`.
    pub fn build_command(
        &self,
        job: &RenderJob,
        output: &Path,
        crop_script: Option<&Path>,
        caption_files: &[PathBuf],
    ) -> MediaResult<FfmpegCommand> {
        let initial = job
            .crop
            .first()
            .ok_or_else(|| MediaError::invalid_input("render job has no crop windows"))?;
        if !job.duration.is_finite() || job.duration <= 0.0 {
            return Err(MediaError::invalid_input(format!(
                "render duration must be positive, got {}",
                job.duration
            )));
        }

        let out_w = self.encoding.output_width;
        let out_h = self.encoding.output_height;

        let mut video_chain = vec!["setpts=PTS-STARTPTS".to_string()];
        if let Some(script) = crop_script {
            video_chain.push(format!(
                "sendcmd=f={}",
                quote_filter_value(&script.to_string_lossy())
            ));
        }
        video_chain.push(format!(
            "{CROP_TARGET}=w={}:h={}:x={}:y={}:exact=1",
            initial.width, initial.height, initial.x, initial.y
        ));
        video_chain.push(format!("scale={out_w}:{out_h}:flags=lanczos,setsar=1"));
        video_chain.extend(self.enhancement.filters(out_w, out_h));
        if let Some(captions) = caption_filter_chain(&job.captions, caption_files, out_h) {
            video_chain.push(captions);
        }
        video_chain.push("format=yuv420p".to_string());

        let mut filter_complex = format!("[0:v]{}[vout]", video_chain.join(","));

        let mut cmd = FfmpegCommand::new(&job.video, output);
        let audio_map = match &job.audio {
            Some(track) => {
                let mut registry = InputRegistry::with_existing(vec![AudioInput {
                    path: job.video.clone(),
                    plays: 1,
                }]);
                let graph = build_audio_graph(track, &mut registry);
                for input in registry.added() {
                    cmd = cmd.input(input.to_ffmpeg_input());
                }
                if let Some(audio_filter) = graph.filter {
                    filter_complex.push(';');
                    filter_complex.push_str(&audio_filter);
                }
                Some(graph.map)
            }
            None => None,
        };

        cmd = cmd.filter_complex(filter_complex).map("[vout]");
        cmd = match audio_map {
            Some(map) => cmd.map(map),
            None => cmd.output_arg("-an"),
        };

        Ok(cmd
            .output_args(self.encoding.to_ffmpeg_args())
            .output_args(["-t".to_string(), format!("{:.3}", job.duration)]))
    }
}

#[async_trait]
impl ClipRenderer for FfmpegRenderer {
    async fn render(&self, job: &RenderJob, output: &Path) -> MediaResult<()> {
        fs::create_dir_all(&job.work_dir).await?;

        let crop_script = match sendcmd_script(&job.crop) {
            Some(script) => {
                let path = job.work_dir.join("crop.cmd");
                fs::write(&path, script).await?;
                Some(path)
            }
            None => None,
        };

        let mut caption_files = Vec::with_capacity(job.captions.len());
        for (i, caption) in job.captions.iter().enumerate() {
            let path = job.work_dir.join(format!("caption_{i}.txt"));
            fs::write(&path, &caption.text).await?;
            caption_files.push(path);
        }

        let cmd = self.build_command(job, output, crop_script.as_deref(), &caption_files)?;

        info!(
            output = %output.display(),
            duration = job.duration,
            captions = job.captions.len(),
            dynamic_crop = crop_script.is_some(),
            "Rendering clip"
        );

        let total_ms = (job.duration * 1000.0) as i64;
        self.runner
            .run_with_progress(&cmd, move |progress| {
                debug!(percent = progress.percentage(total_ms), speed = progress.speed, "Render progress");
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioMixer;
    use reelcut_models::CaptionStyle;

    fn windows(xs: &[u32]) -> Vec<CropWindow> {
        xs.iter()
            .enumerate()
            .map(|(i, x)| CropWindow::new(i as f64 / 30.0, *x, 0, 606, 1080))
            .collect()
    }

    fn job(crop: Vec<CropWindow>, audio: Option<AudioTrack>) -> RenderJob {
        RenderJob {
            video: PathBuf::from("/work/seg_1/source.mp4"),
            crop,
            captions: vec![Caption {
                text: "hi".into(),
                start: 0.0,
                end: 1.0,
                style: CaptionStyle::default(),
            }],
            audio,
            duration: 20.0,
            work_dir: PathBuf::from("/work/seg_1"),
        }
    }

    #[test]
    fn test_static_trajectory_needs_no_script() {
        assert_eq!(sendcmd_script(&windows(&[657, 657, 657])), None);
        assert_eq!(sendcmd_script(&[]), None);
    }

    #[test]
    fn test_script_emits_only_changes() {
        let script = sendcmd_script(&windows(&[657, 657, 670, 670, 690])).unwrap();
        assert_eq!(
            script,
            "0.067 crop@reframe x 670;\n0.133 crop@reframe x 690;"
        );
    }

    #[test]
    fn test_command_layers_video_captions_and_audio() {
        let primary = AudioTrack::from_file("/work/seg_1/source.mp4", 20.0)
            .unwrap()
            .with_peak_db(-1.0);
        let music = AudioTrack::from_file("/music/bed.mp3", 45.0).unwrap();
        let audio = AudioMixer::default().mix(primary, Some(music), 20.0, 0.2).unwrap();

        let renderer = FfmpegRenderer::default();
        let job = job(windows(&[657, 700]), Some(audio));
        let cmd = renderer
            .build_command(
                &job,
                Path::new("/out/clip_1.part.mp4"),
                Some(Path::new("/work/seg_1/crop.cmd")),
                &[PathBuf::from("/work/seg_1/caption_0.txt")],
            )
            .unwrap();
        let args = cmd.build_args();
        let graph = &args[args.iter().position(|a| a == "-filter_complex").unwrap() + 1];

        assert!(graph.starts_with("[0:v]setpts=PTS-STARTPTS,sendcmd=f='/work/seg_1/crop.cmd',crop@reframe=w=606:h=1080:x=657:y=0:exact=1,scale=1080:1920"));
        // captions are drawn after scaling, before the output format
        let scale = graph.find("scale=1080:1920").unwrap();
        let text = graph.find("drawtext=").unwrap();
        assert!(scale < text);
        assert!(graph.contains("amix=inputs=2:duration=first"));
        assert!(args.contains(&"/music/bed.mp3".to_string()));
        assert!(args.contains(&"[vout]".to_string()));
        assert!(!args.contains(&"-an".to_string()));
        assert_eq!(args.last().unwrap(), "/out/clip_1.part.mp4");
    }

    #[test]
    fn test_silent_job_drops_audio() {
        let renderer = FfmpegRenderer::default();
        let cmd = renderer
            .build_command(&job(windows(&[657]), None), Path::new("out.mp4"), None, &[PathBuf::from("c.txt")])
            .unwrap();
        let args = cmd.build_args();
        assert!(args.contains(&"-an".to_string()));
        assert!(!args.iter().any(|a| a.contains("sendcmd")));
    }

    #[test]
    fn test_empty_trajectory_is_rejected() {
        let renderer = FfmpegRenderer::default();
        let result = renderer.build_command(&job(Vec::new(), None), Path::new("out.mp4"), None, &[]);
        assert!(matches!(result, Err(MediaError::InvalidInput(_))));
    }
}
