use rand::Rng;

use crate::alignment::model::Alignment;
use crate::assets::banner::{banner_dimensions, banner_size};
use crate::assets::clips::ClipLibrary;
use crate::compile::compiler::{PlanInputs, compile_plan, timeline_duration_ms};
use crate::compile::plan::RenderPlan;
use crate::config::JobConfig;
use crate::foundation::error::StoryreelResult;
use crate::schedule::background::{ClipPool, plan_background};
use crate::schedule::banner::schedule_banner;

/// Narration timing of one job.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NarrationTiming {
    /// Length of the opening (title) narration; the story starts right after it.
    pub opening_ms: f64,
    /// Length of the story narration when known.
    pub story_audio_ms: Option<f64>,
}

/// A compiled plan together with what the encoder needs to realize it.
#[derive(Clone, Debug)]
pub struct PlannedJob {
    pub plan: RenderPlan,
    pub pool: ClipPool,
    /// Pixel size of the banner image the plan was placed for.
    pub banner_px: (u32, u32),
}

/// Run every scheduler for one job and compile the result.
#[tracing::instrument(skip_all, fields(words = alignment.words.len(), opening_ms = timing.opening_ms))]
pub fn plan_job<R: Rng + ?Sized>(
    cfg: &JobConfig,
    alignment: &Alignment,
    timing: NarrationTiming,
    library: &ClipLibrary,
    rng: &mut R,
) -> StoryreelResult<PlannedJob> {
    cfg.validate()?;
    alignment.validate()?;
    let canvas = cfg.canvas();

    let pool = library.pool(&cfg.background.selection, &cfg.background.high_motion)?;
    let total_ms = timeline_duration_ms(
        alignment,
        timing.opening_ms,
        timing.story_audio_ms,
        cfg.tail_padding_ms,
    );

    let banner_px = banner_dimensions(canvas, cfg.banner.height_fraction)?;
    let banner = schedule_banner(
        timing.opening_ms,
        total_ms,
        canvas,
        &cfg.safe_zone,
        banner_size(banner_px.0, banner_px.1),
        &cfg.banner_options(),
    )?;
    let background = plan_background(&pool, total_ms / 1000.0, &cfg.background_options(), rng)?;

    let plan = compile_plan(&PlanInputs {
        alignment,
        fps: cfg.video.fps,
        canvas,
        safe_zone: cfg.safe_zone,
        narration_offset_ms: timing.opening_ms,
        total_duration_ms: total_ms,
        captions: cfg.caption_options(),
        banner: &banner,
        background: &background,
    })?;
    tracing::info!(
        total_ms,
        frames = plan.total_frames,
        segments = plan.segments.len(),
        "job planned"
    );
    Ok(PlannedJob {
        plan,
        pool,
        banner_px,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/compile/job_plan.rs"]
mod tests;
