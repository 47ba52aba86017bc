use crate::alignment::model::Alignment;
use crate::animation::caption::{BounceConfig, CaptionAnimator};
use crate::compile::plan::{
    BannerTrack, CaptionEvent, CaptionStyle, CrossfadeTrack, RenderPlan, SegmentTrack,
};
use crate::foundation::core::{
    Canvas, Fps, FrameIndex, MsWindow, Point, SafeZone, first_frame_at_or_after,
};
use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::layout::caption_wrap::{CaptionLayoutOptions, layout_caption_words};
use crate::schedule::background::{BackgroundSchedule, DURATION_EPSILON_SEC};
use crate::schedule::banner::BannerSchedule;

/// Caption presentation knobs.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CaptionOptions {
    pub layout: CaptionLayoutOptions,
    /// How long a word stays up past its end when the next word has not started.
    pub linger_ms: f64,
    /// Wrap lines shown together; later lines reuse the same rows.
    pub max_lines_per_page: usize,
    pub bounce: BounceConfig,
}

impl Default for CaptionOptions {
    fn default() -> Self {
        Self {
            layout: CaptionLayoutOptions::default(),
            linger_ms: 250.0,
            max_lines_per_page: 2,
            bounce: BounceConfig::default(),
        }
    }
}

/// Everything the compiler reads. Nothing here is mutated.
#[derive(Clone, Copy, Debug)]
pub struct PlanInputs<'a> {
    pub alignment: &'a Alignment,
    pub fps: Fps,
    pub canvas: Canvas,
    pub safe_zone: SafeZone,
    /// Where narration time 0 lands on the output timeline.
    pub narration_offset_ms: f64,
    pub total_duration_ms: f64,
    pub captions: CaptionOptions,
    pub banner: &'a BannerSchedule,
    pub background: &'a BackgroundSchedule,
}

/// Output length: opening segment plus the story body (its audio length when known, otherwise
/// the last word's end plus `tail_padding_ms`).
pub fn timeline_duration_ms(
    alignment: &Alignment,
    opening_ms: f64,
    story_audio_ms: Option<f64>,
    tail_padding_ms: f64,
) -> f64 {
    let spoken = alignment.last_end_ms() + tail_padding_ms.max(0.0);
    let body = story_audio_ms.map_or(spoken, |a| a.max(alignment.last_end_ms()));
    opening_ms.max(0.0) + body
}

/// Compile the single timeline both backends render from.
///
/// Rejects schedules that break their invariants instead of emitting a plan with drift.
#[tracing::instrument(skip(inputs), fields(words = inputs.alignment.words.len()))]
pub fn compile_plan(inputs: &PlanInputs<'_>) -> StoryreelResult<RenderPlan> {
    let fps = Fps::new(inputs.fps.num, inputs.fps.den)?;
    inputs.canvas.validate()?;
    inputs.alignment.validate()?;
    let total_ms = inputs.total_duration_ms;
    if !total_ms.is_finite() || total_ms <= 0.0 {
        return Err(StoryreelError::validation(
            "total duration must be finite and > 0",
        ));
    }
    if !inputs.narration_offset_ms.is_finite() || inputs.narration_offset_ms < 0.0 {
        return Err(StoryreelError::validation(
            "narration offset must be finite and >= 0",
        ));
    }
    if inputs.captions.max_lines_per_page == 0 {
        return Err(StoryreelError::validation("max_lines_per_page must be > 0"));
    }
    let animator = CaptionAnimator::new(inputs.captions.bounce)?;

    let caption_events = compile_captions(inputs, fps, total_ms)?;
    let banner = compile_banner(inputs.banner, fps, total_ms)?;
    let segments = compile_segments(inputs.background, fps, total_ms)?;

    let plan = RenderPlan {
        fps,
        canvas: inputs.canvas,
        total_duration_ms: total_ms,
        total_frames: first_frame_at_or_after(total_ms, fps),
        narration_offset_ms: inputs.narration_offset_ms,
        caption_style: CaptionStyle {
            font_size: inputs.captions.layout.font_size,
            line_height: inputs.captions.layout.line_height,
            animator,
        },
        caption_events,
        banner,
        background: inputs.background.clone(),
        segments,
    };
    tracing::info!(
        frames = plan.total_frames,
        captions = plan.caption_events.len(),
        segments = plan.segments.len(),
        "render plan compiled"
    );
    Ok(plan)
}

fn compile_captions(
    inputs: &PlanInputs<'_>,
    fps: Fps,
    total_ms: f64,
) -> StoryreelResult<Vec<CaptionEvent>> {
    let opts = &inputs.captions;
    let content = inputs.safe_zone.content_rect(inputs.canvas)?;
    let layout_opts = CaptionLayoutOptions {
        container_width: opts.layout.container_width.min(content.width()),
        ..opts.layout
    };
    let positions = layout_caption_words(
        inputs.alignment.words.iter().map(|w| w.word.as_str()),
        &layout_opts,
    )?;

    let container_x0 = content.x0 + (content.width() - layout_opts.container_width) / 2.0;
    let advance = layout_opts.font_size * layout_opts.line_height;
    let rows = opts.max_lines_per_page as f64;
    let page_top = content.y1 - rows * advance;

    let windows = inputs.alignment.activation_windows(opts.linger_ms);
    let offset = inputs.narration_offset_ms;

    let mut events = Vec::with_capacity(windows.len());
    for (i, ((word, window), pos)) in inputs
        .alignment
        .words
        .iter()
        .zip(&windows)
        .zip(&positions)
        .enumerate()
    {
        let start = (window.start_ms + offset).min(total_ms);
        let end = (window.end_ms + offset).min(total_ms);
        let timeline = MsWindow::new(start, end.max(start))?;
        let row = (pos.line_index % opts.max_lines_per_page) as f64;
        events.push(CaptionEvent {
            word_index: i,
            word: word.word.clone(),
            start_ms: word.start_ms + offset,
            end_ms: word.end_ms + offset,
            window: timeline.aligned(fps),
            frames: timeline.frames(fps),
            line: pos.line_index,
            position_hint: Point::new(
                container_x0 + pos.x + pos.width / 2.0,
                page_top.max(content.y0) + row * advance,
            ),
        });
    }
    Ok(events)
}

fn compile_banner(banner: &BannerSchedule, fps: Fps, total_ms: f64) -> StoryreelResult<BannerTrack> {
    if banner.window.start_ms < 0.0 || banner.window.end_ms > total_ms {
        return Err(StoryreelError::schedule(format!(
            "banner window [{}, {})ms lies outside the {total_ms}ms video",
            banner.window.start_ms, banner.window.end_ms
        )));
    }
    Ok(BannerTrack {
        window: banner.window.aligned(fps),
        frames: banner.window.frames(fps),
        placement: banner.placement,
    })
}

fn compile_segments(
    schedule: &BackgroundSchedule,
    fps: Fps,
    total_ms: f64,
) -> StoryreelResult<Vec<SegmentTrack>> {
    schedule.validate()?;
    let schedule_ms = schedule.total_duration_sec * 1000.0;
    if (schedule_ms - total_ms).abs() > DURATION_EPSILON_SEC * 1000.0 {
        return Err(StoryreelError::schedule(format!(
            "background covers {schedule_ms}ms but the video is {total_ms}ms"
        )));
    }

    let starts = schedule.segment_starts_sec();
    let crossfade_ms = schedule.crossfade_sec * 1000.0;
    let mut tracks = Vec::with_capacity(schedule.segments.len());
    for (i, seg) in schedule.segments.iter().enumerate() {
        let start_ms = if i == 0 { 0.0 } else { starts[i] * 1000.0 };
        // The last segment ends on the video's own end so rounding never leaves a gap.
        let end_ms = match starts.get(i + 1) {
            Some(next) => next * 1000.0,
            None => total_ms,
        };
        let window = MsWindow::new(start_ms, end_ms.max(start_ms))?;
        let crossfade_in = if i > 0 && crossfade_ms > 0.0 {
            let fade = MsWindow::new(start_ms, (start_ms + crossfade_ms).min(end_ms))?;
            Some(CrossfadeTrack {
                boundary_ms: start_ms,
                duration_ms: crossfade_ms,
                window: fade.aligned(fps),
                frames: fade.frames(fps),
            })
        } else {
            None
        };
        tracks.push(SegmentTrack {
            segment: seg.clone(),
            start_ms,
            window: window.aligned(fps),
            frames: window.frames(fps),
            crossfade_in,
        });
    }

    if let Some(last) = tracks.last()
        && last.frames.end != FrameIndex(first_frame_at_or_after(total_ms, fps))
    {
        return Err(StoryreelError::schedule(
            "background segments do not reach the end of the video",
        ));
    }
    Ok(tracks)
}

#[cfg(test)]
#[path = "../../tests/unit/compile/compiler.rs"]
mod tests;
