use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{FilterGraph, RenderPlanBackend as _, SegmentInput};
use crate::encode::runner::{CommandSpec, ProcessRunner, RunControl, SystemRunner};
use crate::foundation::core::Fps;
use crate::foundation::error::{StoryreelError, StoryreelResult};

/// Output format shared by every ffmpeg step of a job.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodeSettings {
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
    pub crf: u8,
    pub preset: String,
    pub program: String,
    /// Hard limit for each ffmpeg invocation.
    pub timeout: Duration,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: Fps::default(),
            crf: 20,
            preset: "veryfast".to_string(),
            program: "ffmpeg".to_string(),
            timeout: Duration::from_secs(600),
        }
    }
}

impl EncodeSettings {
    pub fn validate(&self) -> StoryreelResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(StoryreelError::validation(
                "encode width/height must be non-zero",
            ));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(StoryreelError::validation(
                "encode width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Fps::new(self.fps.num, self.fps.den)?;
        if self.timeout.is_zero() {
            return Err(StoryreelError::validation("encode timeout must be > 0"));
        }
        Ok(())
    }

    fn command(&self, step: &str) -> CommandSpec {
        CommandSpec::new(step, &self.program, self.timeout).args([
            "-y",
            "-hide_banner",
            "-nostdin",
            "-loglevel",
            "error",
        ])
    }

    fn h264_args(&self) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
        ]
    }
}

/// Scale to cover, centre crop, constant frame rate, audio stripped.
pub fn normalize_clip_cmd(src: &Path, dst: &Path, s: &EncodeSettings) -> CommandSpec {
    let (w, h) = (s.width, s.height);
    s.command("normalize")
        .arg("-i")
        .arg(src)
        .arg("-vf")
        .arg(format!(
            "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},fps={},setsar=1",
            s.fps.ffmpeg_rate()
        ))
        .arg("-an")
        .args(s.h264_args())
        .arg(dst)
}

/// Solid colour stand-in for a clip that could not be read.
pub fn placeholder_clip_cmd(
    color: &str,
    duration_sec: f64,
    dst: &Path,
    s: &EncodeSettings,
) -> CommandSpec {
    s.command("normalize")
        .args(["-f", "lavfi", "-i"])
        .arg(format!(
            "color=c={color}:s={}x{}:r={}:d={duration_sec:.3}",
            s.width,
            s.height,
            s.fps.ffmpeg_rate()
        ))
        .arg("-an")
        .args(s.h264_args())
        .arg(dst)
}

/// Cut one background segment, crossfade tail included. Short sources loop.
pub fn cut_segment_cmd(
    src: &Path,
    dst: &Path,
    seg: &SegmentInput,
    s: &EncodeSettings,
) -> CommandSpec {
    let source_span = seg.rendered_duration_sec * seg.speed_multiplier;
    s.command("cut")
        .args(["-stream_loop", "-1", "-ss"])
        .arg(format!("{:.3}", seg.source_start_sec))
        .arg("-t")
        .arg(format!("{source_span:.3}"))
        .arg("-i")
        .arg(src)
        .arg("-vf")
        .arg(format!(
            "setpts=(PTS-STARTPTS)/{:.4},fps={}",
            seg.speed_multiplier,
            s.fps.ffmpeg_rate()
        ))
        .arg("-t")
        .arg(format!("{:.3}", seg.rendered_duration_sec))
        .arg("-an")
        .args(s.h264_args())
        .arg(dst)
}

/// Join cut segments; a single segment is stream-copied.
pub fn concat_cmd(
    segments: &[PathBuf],
    graph: &FilterGraph,
    dst: &Path,
    s: &EncodeSettings,
) -> StoryreelResult<CommandSpec> {
    if segments.is_empty() {
        return Err(StoryreelError::schedule("no background segments to concatenate"));
    }
    let mut cmd = s.command("concat");
    for p in segments {
        cmd = cmd.arg("-i").arg(p);
    }
    match graph.background_filter(false) {
        None => Ok(cmd.args(["-c", "copy"]).arg(dst)),
        Some(filter) => Ok(cmd
            .arg("-filter_complex")
            .arg(filter)
            .args(["-map", "[bg]"])
            .args(s.h264_args())
            .args(["-progress", "pipe:1", "-nostats"])
            .arg(dst)),
    }
}

/// Final composite: banner overlay, captions and the narration track(s).
pub fn mux_cmd(
    background: &Path,
    banner: Option<&Path>,
    narration: &[PathBuf],
    font: Option<&Path>,
    graph: &FilterGraph,
    dst: &Path,
    s: &EncodeSettings,
) -> StoryreelResult<CommandSpec> {
    if narration.is_empty() {
        return Err(StoryreelError::validation("at least one narration track is required"));
    }
    let total_sec = graph.plan().total_duration_ms / 1000.0;
    let mut cmd = s.command("mux").arg("-i").arg(background);
    let banner_input = match banner {
        Some(p) => {
            cmd = cmd.args(["-loop", "1", "-i"]).arg(p);
            Some(1)
        }
        None => None,
    };
    let first_audio = if banner_input.is_some() { 2 } else { 1 };
    for p in narration {
        cmd = cmd.arg("-i").arg(p);
    }

    let mut filter = graph.overlay_filter("0:v", banner_input, font);
    let audio_map = if narration.len() == 1 {
        format!("{first_audio}:a")
    } else {
        filter.push(';');
        for i in 0..narration.len() {
            let _ = write!(filter, "[{}:a]", first_audio + i);
        }
        let _ = write!(filter, "concat=n={}:v=0:a=1[aout]", narration.len());
        "[aout]".to_string()
    };

    Ok(cmd
        .arg("-filter_complex")
        .arg(filter)
        .args(["-map", "[vout]", "-map"])
        .arg(audio_map)
        .arg("-t")
        .arg(format!("{total_sec:.3}"))
        .args(s.h264_args())
        .args(["-c:a", "aac", "-b:a", "192k", "-movflags", "+faststart"])
        .args(["-progress", "pipe:1", "-nostats"])
        .arg(dst))
}

/// Reads a media file's duration.
pub trait DurationProbe: Send + Sync {
    fn duration_sec(&self, path: &Path) -> StoryreelResult<f64>;
}

/// [`DurationProbe`] backed by `ffprobe`.
#[derive(Clone)]
pub struct FfprobeProbe {
    program: String,
    timeout: Duration,
    runner: Arc<dyn ProcessRunner>,
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self {
            program: "ffprobe".to_string(),
            timeout: Duration::from_secs(30),
            runner: Arc::new(SystemRunner::new()),
        }
    }
}

impl FfprobeProbe {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }
}

impl DurationProbe for FfprobeProbe {
    fn duration_sec(&self, path: &Path) -> StoryreelResult<f64> {
        let spec = CommandSpec::new("probe", &self.program, self.timeout)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path);
        let out = self.runner.run(&spec, &RunControl::default())?;
        parse_probe_duration(&String::from_utf8_lossy(&out.stdout)).map_err(|e| {
            StoryreelError::asset(format!("cannot read duration of '{}': {e}", path.display()))
        })
    }
}

pub fn parse_probe_duration(stdout: &str) -> StoryreelResult<f64> {
    let line = stdout
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| StoryreelError::asset("ffprobe printed no duration"))?;
    let d: f64 = line
        .parse()
        .map_err(|_| StoryreelError::asset(format!("unparseable duration '{line}'")))?;
    if !d.is_finite() || d <= 0.0 {
        return Err(StoryreelError::asset(format!("non-positive duration {d}")));
    }
    Ok(d)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
