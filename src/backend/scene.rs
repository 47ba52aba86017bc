use std::sync::Arc;

use crate::backend::{BackendKind, CrossfadeSample, RenderPlanBackend, TimelineState, check_instant};
use crate::compile::plan::RenderPlan;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{StoryreelError, StoryreelResult};

/// Frame-indexed view of a plan: `sample(frame)` is a pure function of the frame number.
#[derive(Clone, Debug)]
pub struct FrameSampledScene {
    plan: Arc<RenderPlan>,
}

impl FrameSampledScene {
    pub fn new(plan: Arc<RenderPlan>) -> Self {
        Self { plan }
    }

    #[tracing::instrument(level = "trace", skip(self))]
    pub fn sample(&self, frame: FrameIndex) -> StoryreelResult<TimelineState> {
        let plan = &*self.plan;
        if frame.0 >= plan.total_frames {
            return Err(StoryreelError::evaluation("frame is out of bounds"));
        }
        let frame_ms = plan.fps.frames_to_ms(frame);

        let active = plan
            .caption_events
            .iter()
            .find(|e| e.frames.contains(frame));
        let animation = active.map(|e| plan.caption_style.animator.sample(frame_ms - e.start_ms));

        let Some((index, segment)) = plan
            .segments
            .iter()
            .enumerate()
            .find(|(_, s)| s.frames.contains(frame))
        else {
            return Err(StoryreelError::evaluation(format!(
                "no background segment covers frame {}",
                frame.0
            )));
        };
        let crossfade = segment
            .crossfade_in
            .filter(|c| c.frames.contains(frame))
            .and_then(|c| {
                Some(CrossfadeSample {
                    outgoing: index.checked_sub(1)?,
                    progress: ((frame_ms - c.boundary_ms) / c.duration_ms).clamp(0.0, 1.0),
                })
            });

        Ok(TimelineState {
            active_word_index: active.map(|e| e.word_index),
            animation,
            banner_visible: plan.banner.frames.contains(frame),
            background_segment_index: index,
            background_source_offset_sec: segment.source_offset_sec(frame_ms),
            crossfade,
        })
    }
}

impl RenderPlanBackend for FrameSampledScene {
    fn kind(&self) -> BackendKind {
        BackendKind::Scene
    }

    fn plan(&self) -> &RenderPlan {
        &self.plan
    }

    fn state_at_ms(&self, t_ms: f64) -> StoryreelResult<TimelineState> {
        check_instant(&self.plan, t_ms)?;
        self.sample(self.plan.fps.ms_to_frames(t_ms))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/backend/scene.rs"]
mod tests;
