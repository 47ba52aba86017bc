use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::backend::FilterGraph;
use crate::compile::plan::RenderPlan;
use crate::encode::ffmpeg::{
    EncodeSettings, concat_cmd, cut_segment_cmd, mux_cmd, normalize_clip_cmd, placeholder_clip_cmd,
};
use crate::encode::runner::{
    CommandSpec, ProcessRunner, RunControl, SystemRunner, ensure_parent_dir,
};
use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::schedule::background::{ClipOrigin, ClipPool};

/// Fallback colour when a scheduled clip file vanished after scanning.
const MISSING_CLIP_COLOR: &str = "black";

/// Inputs of one encode job.
#[derive(Clone, Debug)]
pub struct EncodeJob {
    pub plan: Arc<RenderPlan>,
    pub pool: ClipPool,
    /// Narration tracks in playback order (opening, then story).
    pub narration: Vec<PathBuf>,
    pub banner_image: Option<PathBuf>,
    pub font_file: Option<PathBuf>,
    pub output: PathBuf,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EncodeOutcome {
    pub output: PathBuf,
    /// Subprocesses run, in order.
    pub commands: usize,
}

/// Sequential ffmpeg pipeline: normalize -> cut -> concat -> mux.
///
/// Each run works in its own temporary directory, so concurrent jobs never share files.
pub struct EncodePipeline {
    settings: EncodeSettings,
    runner: Arc<dyn ProcessRunner>,
    work_root: Option<PathBuf>,
}

impl EncodePipeline {
    pub fn new(settings: EncodeSettings) -> Self {
        Self {
            settings,
            runner: Arc::new(SystemRunner::new()),
            work_root: None,
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Create job directories under `root` instead of the system temp dir.
    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = Some(root.into());
        self
    }

    pub fn settings(&self) -> &EncodeSettings {
        &self.settings
    }

    #[tracing::instrument(skip(self, job, ctl), fields(output = %job.output.display()))]
    pub fn run(&self, job: &EncodeJob, ctl: &RunControl<'_>) -> StoryreelResult<EncodeOutcome> {
        use anyhow::Context as _;

        self.settings.validate()?;
        if job.plan.canvas.width != self.settings.width
            || job.plan.canvas.height != self.settings.height
            || job.plan.fps != self.settings.fps
        {
            return Err(StoryreelError::validation(
                "plan canvas/fps do not match the encode settings",
            ));
        }
        let graph = FilterGraph::from_plan(job.plan.clone())?;

        let mut builder = tempfile::Builder::new();
        builder.prefix("storyreel-job-");
        let workdir = match &self.work_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .context("failed to create job working directory")?;
        let dir = workdir.path();
        tracing::info!(workdir = %dir.display(), "encode job started");

        let mut commands = 0usize;
        let mut run = |spec: CommandSpec| -> StoryreelResult<()> {
            if ctl.is_cancelled() {
                return Err(StoryreelError::Cancelled {
                    program: spec.program.clone(),
                });
            }
            self.runner.run(&spec, ctl)?;
            commands += 1;
            Ok(())
        };

        // Normalize every distinct clip once.
        let mut normalized: BTreeMap<&str, PathBuf> = BTreeMap::new();
        for seg in graph.segment_inputs() {
            if normalized.contains_key(seg.clip_id.as_str()) {
                continue;
            }
            let clip = job.pool.get(&seg.clip_id).ok_or_else(|| {
                StoryreelError::schedule(format!(
                    "segment {} uses clip '{}' which is not in the pool",
                    seg.index, seg.clip_id
                ))
            })?;
            let dst = dir.join(format!("norm_{:03}.mp4", normalized.len()));
            let spec = match &clip.origin {
                ClipOrigin::File { path } if path.exists() => {
                    normalize_clip_cmd(path, &dst, &self.settings)
                }
                ClipOrigin::File { path } => {
                    tracing::warn!(
                        clip = %clip.id,
                        path = %path.display(),
                        "clip file missing, using placeholder"
                    );
                    placeholder_clip_cmd(MISSING_CLIP_COLOR, clip.duration_sec, &dst, &self.settings)
                }
                ClipOrigin::Placeholder { color } => {
                    placeholder_clip_cmd(color, clip.duration_sec, &dst, &self.settings)
                }
            };
            run(spec)?;
            normalized.insert(seg.clip_id.as_str(), dst);
        }
        tracing::info!(clips = normalized.len(), "clips normalized");

        let mut cut_files = Vec::new();
        for seg in graph.segment_inputs() {
            let src = normalized.get(seg.clip_id.as_str()).ok_or_else(|| {
                StoryreelError::evaluation(format!("clip '{}' was not normalized", seg.clip_id))
            })?;
            let dst = dir.join(format!("seg_{:03}.mp4", seg.index));
            run(cut_segment_cmd(src, &dst, seg, &self.settings))?;
            cut_files.push(dst);
        }
        tracing::info!(segments = cut_files.len(), "segments cut");

        let background = dir.join("background.mp4");
        run(concat_cmd(&cut_files, &graph, &background, &self.settings)?)?;

        ensure_parent_dir(&job.output)?;
        run(mux_cmd(
            &background,
            job.banner_image.as_deref(),
            &job.narration,
            job.font_file.as_deref(),
            &graph,
            &job.output,
            &self.settings,
        )?)?;

        tracing::info!(commands, "encode job finished");
        Ok(EncodeOutcome {
            output: job.output.clone(),
            commands,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/pipeline.rs"]
mod tests;
