use crate::animation::caption::CaptionAnimator;
use crate::foundation::core::{Canvas, Fps, FrameIndex, FrameRange, MsWindow, Point, Rect};
use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::schedule::background::{BackgroundSchedule, BackgroundSegment};

/// One word's caption: what to draw, where, and when it is the active word.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionEvent {
    pub word_index: usize,
    pub word: String,
    /// Spoken range on the output timeline (narration offset applied).
    pub start_ms: f64,
    pub end_ms: f64,
    /// Activation window snapped to frame timestamps.
    pub window: MsWindow,
    pub frames: FrameRange,
    /// Global wrap line the word belongs to.
    pub line: usize,
    /// Horizontal centre and top edge of the word box, in canvas pixels.
    pub position_hint: Point,
}

/// Caption styling shared by every event.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionStyle {
    pub font_size: f64,
    pub line_height: f64,
    pub animator: CaptionAnimator,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerTrack {
    pub window: MsWindow,
    pub frames: FrameRange,
    pub placement: Rect,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossfadeTrack {
    /// Raw boundary between the outgoing and incoming segment.
    pub boundary_ms: f64,
    pub duration_ms: f64,
    pub window: MsWindow,
    pub frames: FrameRange,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentTrack {
    pub segment: BackgroundSegment,
    /// Raw timeline start, used for source offsets.
    pub start_ms: f64,
    pub window: MsWindow,
    pub frames: FrameRange,
    /// Crossfade from the previous segment, if any.
    pub crossfade_in: Option<CrossfadeTrack>,
}

impl SegmentTrack {
    /// Source position (seconds) shown at timeline instant `t_ms`.
    pub fn source_offset_sec(&self, t_ms: f64) -> f64 {
        self.segment.source_start_sec
            + ((t_ms - self.start_ms).max(0.0) / 1000.0) * self.segment.speed_multiplier
    }
}

/// The compiled, backend-agnostic timeline of one render job.
///
/// Every window in here is already snapped to frame timestamps, so backends only compare
/// against stored bounds and never convert time themselves.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPlan {
    pub fps: Fps,
    pub canvas: Canvas,
    pub total_duration_ms: f64,
    pub total_frames: u64,
    pub narration_offset_ms: f64,
    pub caption_style: CaptionStyle,
    pub caption_events: Vec<CaptionEvent>,
    pub banner: BannerTrack,
    pub background: BackgroundSchedule,
    pub segments: Vec<SegmentTrack>,
}

impl RenderPlan {
    pub fn banner_window(&self) -> MsWindow {
        self.banner.window
    }

    pub fn background_schedule(&self) -> &[BackgroundSegment] {
        &self.background.segments
    }

    pub fn frame_range(&self) -> FrameRange {
        FrameRange {
            start: FrameIndex(0),
            end: FrameIndex(self.total_frames),
        }
    }

    /// Structural checks for plans that did not come straight from the compiler (e.g. JSON).
    pub fn validate(&self) -> StoryreelResult<()> {
        Fps::new(self.fps.num, self.fps.den)?;
        self.canvas.validate()?;
        self.caption_style.animator.config().validate()?;
        self.background.validate()?;
        if self.segments.len() != self.background.segments.len() {
            return Err(StoryreelError::schedule(
                "segment tracks do not match the background schedule",
            ));
        }
        let mut expected_start = 0;
        for (i, s) in self.segments.iter().enumerate() {
            if s.frames.start.0 != expected_start {
                return Err(StoryreelError::schedule(format!(
                    "segment {i} frames do not continue the previous segment"
                )));
            }
            expected_start = s.frames.end.0;
        }
        if expected_start != self.total_frames {
            return Err(StoryreelError::schedule(
                "segment frames do not cover the whole video",
            ));
        }
        for (i, s) in self.segments.iter().enumerate() {
            self.check_window(&format!("segment {i}"), s.window, s.frames)?;
            if let Some(c) = s.crossfade_in {
                self.check_window(&format!("crossfade into segment {i}"), c.window, c.frames)?;
            }
        }
        self.check_window("banner", self.banner.window, self.banner.frames)?;
        if self.banner.frames.end.0 > self.total_frames {
            return Err(StoryreelError::schedule("banner window extends past the video"));
        }
        for (i, e) in self.caption_events.iter().enumerate() {
            if e.word_index != i {
                return Err(StoryreelError::schedule(format!(
                    "caption event {i} is out of order"
                )));
            }
            self.check_window(&format!("caption event {i}"), e.window, e.frames)?;
            if e.frames.end.0 > self.total_frames {
                return Err(StoryreelError::schedule(format!(
                    "caption event {i} extends past the video"
                )));
            }
        }
        Ok(())
    }

    /// A stored window must sit exactly on the timestamps of its frame range.
    fn check_window(
        &self,
        what: &str,
        window: MsWindow,
        frames: FrameRange,
    ) -> StoryreelResult<()> {
        if frames.start.0 > frames.end.0 || window != frames.ms_window(self.fps) {
            return Err(StoryreelError::schedule(format!(
                "{what} window [{}, {})ms does not match frames [{}, {})",
                window.start_ms, window.end_ms, frames.start.0, frames.end.0
            )));
        }
        Ok(())
    }

    pub fn from_json_str(s: &str) -> StoryreelResult<Self> {
        let plan: Self = serde_json::from_str(s)?;
        plan.validate()?;
        Ok(plan)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compile/plan.rs"]
mod tests;
