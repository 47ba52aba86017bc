use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::alignment::estimate::{ALIGNMENT_SAMPLE_RATE, estimate_alignment};
use crate::alignment::model::{Alignment, WordStamp};
use crate::encode::runner::{CommandSpec, ProcessRunner, RunControl, SystemRunner};
use crate::foundation::error::{StoryreelError, StoryreelResult};

/// Confidence assumed for aligned words that carry no score.
const DEFAULT_WORD_SCORE: f64 = 0.9;

/// Produces a word-level [`Alignment`] for a narration track.
pub trait AlignmentProvider {
    fn align(
        &self,
        script: &str,
        audio: &Path,
        ctl: &RunControl<'_>,
    ) -> StoryreelResult<Alignment>;
}

/// Forced alignment through the `whisperx` command line tool.
pub struct WhisperXAligner {
    program: String,
    model: String,
    language: String,
    timeout: Duration,
    runner: Arc<dyn ProcessRunner>,
}

impl Default for WhisperXAligner {
    fn default() -> Self {
        Self {
            program: "whisperx".to_string(),
            model: "base".to_string(),
            language: "en".to_string(),
            timeout: Duration::from_secs(300),
            runner: Arc::new(SystemRunner::new()),
        }
    }
}

impl WhisperXAligner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>, language: impl Into<String>) -> Self {
        self.model = model.into();
        self.language = language.into();
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    fn command(&self, audio: &Path, transcript: &Path, out_dir: &Path) -> CommandSpec {
        CommandSpec::new("align", &self.program, self.timeout)
            .arg(audio)
            .args([
                "--model",
                self.model.as_str(),
                "--align",
                "--language",
                self.language.as_str(),
            ])
            .arg("--transcript")
            .arg(transcript)
            .arg("--output_dir")
            .arg(out_dir)
            .args(["--output_format", "json"])
    }
}

impl AlignmentProvider for WhisperXAligner {
    #[tracing::instrument(skip(self, script, ctl), fields(program = %self.program))]
    fn align(
        &self,
        script: &str,
        audio: &Path,
        ctl: &RunControl<'_>,
    ) -> StoryreelResult<Alignment> {
        use anyhow::Context as _;

        let work = tempfile::Builder::new()
            .prefix("storyreel-align-")
            .tempdir()
            .context("create alignment working directory")?;
        let transcript = work.path().join("script.txt");
        std::fs::write(&transcript, script).context("write alignment transcript")?;

        self.runner
            .run(&self.command(audio, &transcript, work.path()), ctl)?;

        let out = whisperx_output_path(work.path(), audio);
        let json = std::fs::read_to_string(&out).map_err(|e| {
            StoryreelError::alignment(format!(
                "whisperx output '{}' not readable: {e}",
                out.display()
            ))
        })?;
        let alignment = parse_whisperx_json(&json)?;
        tracing::info!(words = alignment.words.len(), "forced alignment complete");
        Ok(alignment)
    }
}

/// whisperx names its JSON after the audio file stem.
fn whisperx_output_path(out_dir: &Path, audio: &Path) -> PathBuf {
    let stem = audio
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());
    out_dir.join(format!("{stem}.json"))
}

#[derive(serde::Deserialize)]
struct WxOutput {
    #[serde(default)]
    segments: Vec<WxSegment>,
}

#[derive(serde::Deserialize)]
struct WxSegment {
    #[serde(default)]
    words: Vec<WxWord>,
}

#[derive(serde::Deserialize)]
struct WxWord {
    word: String,
    start: Option<f64>,
    end: Option<f64>,
    score: Option<f64>,
}

/// Parse whisperx's JSON output (`segments[].words[]`, seconds) into an [`Alignment`].
///
/// Words whisperx could not time (numerals, symbols) come without `start`/`end` and are skipped.
pub fn parse_whisperx_json(json: &str) -> StoryreelResult<Alignment> {
    let parsed: WxOutput = serde_json::from_str(json)
        .map_err(|e| StoryreelError::alignment(format!("whisperx json parse failed: {e}")))?;

    let mut words = Vec::new();
    let mut skipped = 0usize;
    for w in parsed.segments.into_iter().flat_map(|s| s.words) {
        let text = w.word.trim();
        let (Some(start), Some(end)) = (w.start, w.end) else {
            skipped += 1;
            continue;
        };
        let start_ms = (start * 1000.0).round();
        let end_ms = (end * 1000.0).round();
        if text.is_empty() || end_ms <= start_ms {
            skipped += 1;
            continue;
        }
        words.push(WordStamp {
            word: text.to_string(),
            start_ms,
            end_ms,
            confidence: Some(
                w.score
                    .filter(|s| *s > 0.0)
                    .map_or(DEFAULT_WORD_SCORE, |s| s.min(1.0)),
            ),
        });
    }
    if skipped > 0 {
        tracing::debug!(skipped, "whisperx words without usable timestamps");
    }
    if words.is_empty() {
        return Err(StoryreelError::alignment("whisperx returned no timed words"));
    }

    let alignment = Alignment {
        words,
        sample_rate: ALIGNMENT_SAMPLE_RATE,
    };
    alignment
        .validate()
        .map_err(|e| StoryreelError::alignment(format!("whisperx output rejected: {e}")))?;
    Ok(alignment)
}

/// Forced alignment with the estimated alignment as fallback; never fails.
pub fn align_or_estimate(
    provider: &dyn AlignmentProvider,
    script: &str,
    audio: &Path,
    ctl: &RunControl<'_>,
) -> Alignment {
    match provider.align(script, audio, ctl) {
        Ok(a) => a,
        Err(e) => {
            tracing::warn!(error = %e, "forced alignment failed, using estimated alignment");
            estimate_alignment(script)
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/alignment/whisperx.rs"]
mod tests;
