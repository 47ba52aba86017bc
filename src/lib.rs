//! storyreel turns a narration timeline into a short vertical video.
//!
//! One word-level [`Alignment`] drives everything:
//!
//! - [`CaptionAnimator`] and the caption wrap decide how each word enters and where it sits
//! - [`schedule_banner`] shows the title banner over the opening narration
//! - [`plan_background`] tiles the video with background clip segments and crossfades
//! - [`compile_plan`] freezes all of it into a frame-aligned [`RenderPlan`]
//!
//! The plan is read by two backends that agree on every instant: [`FrameSampledScene`] answers
//! per-frame queries, [`FilterGraph`] bakes the same timeline into time-gated ffmpeg operations
//! that [`EncodePipeline`] runs.
#![forbid(unsafe_code)]

pub mod alignment;
pub mod animation;
pub mod assets;
pub mod backend;
pub mod compile;
pub mod config;
pub mod encode;
pub mod foundation;
pub mod job;
pub mod layout;
pub mod schedule;

#[cfg(test)]
#[path = "../tests/unit/support.rs"]
pub(crate) mod test_support;

pub use alignment::estimate::{ALIGNMENT_SAMPLE_RATE, estimate_alignment};
pub use alignment::model::{Alignment, WordStamp, active_word_index};
pub use alignment::whisperx::{
    AlignmentProvider, WhisperXAligner, align_or_estimate, parse_whisperx_json,
};
pub use animation::caption::{AnimationFrame, BounceConfig, CaptionAnimator};
pub use animation::ease::Ease;
pub use assets::banner::{
    BannerImageProvider, FileBanner, banner_dimensions, banner_or_placeholder, placeholder_banner,
};
pub use assets::clips::{ClipLibrary, ClipSelection};
pub use assets::fonts::{FontFallback, ResolvedFont};
pub use backend::{
    BackendKind, CrossfadeSample, FilterGraph, FrameSampledScene, GraphOp, RenderPlanBackend,
    SampleFingerprint, TimelineState, create_backend, fingerprint_sample,
};
pub use compile::compiler::{CaptionOptions, PlanInputs, compile_plan, timeline_duration_ms};
pub use compile::job_plan::{NarrationTiming, PlannedJob, plan_job};
pub use compile::plan::{
    BannerTrack, CaptionEvent, CaptionStyle, CrossfadeTrack, RenderPlan, SegmentTrack,
};
pub use config::JobConfig;
pub use encode::ffmpeg::{DurationProbe, EncodeSettings, FfprobeProbe};
pub use encode::pipeline::{EncodeJob, EncodeOutcome, EncodePipeline};
pub use encode::runner::{
    CancelToken, CommandSpec, ProcessRunner, ProgressEvent, RunControl, SystemRunner,
    is_ffmpeg_on_path,
};
pub use foundation::core::{
    Canvas, Fps, FrameIndex, FrameRange, MsWindow, Point, Rect, SafeZone, Size,
    first_frame_at_or_after, frames_to_ms, ms_to_frames,
};
pub use foundation::error::{StoryreelError, StoryreelResult};
pub use job::{JobState, JobStatus};
pub use layout::banner_fit::{FittedTitle, TitleFitOptions, fit_title};
pub use layout::caption_wrap::{CaptionLayoutOptions, LinePosition, layout_caption_words};
pub use layout::measure::{EstimatedMeasurer, ParleyMeasurer, TextMeasurer};
pub use schedule::background::{
    BackgroundOptions, BackgroundSchedule, BackgroundSegment, ClipOrigin, ClipPool, ClipSource,
    plan_background,
};
pub use schedule::banner::{BannerOptions, BannerSchedule, schedule_banner};
