use std::sync::Arc;

use crate::animation::caption::AnimationFrame;
use crate::compile::plan::RenderPlan;
use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::foundation::math::Fnv1a64;

pub(crate) mod graph;
pub(crate) mod scene;

pub use graph::{AnimationKey, CutOp, DrawCaption, FilterGraph, GraphOp, SegmentInput};
pub use scene::FrameSampledScene;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Pure per-frame sampling for a compositing renderer.
    Scene,
    /// Pre-baked time-gated operations for a batch encoder.
    Graph,
}

/// Crossfade in progress at a sampled instant.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossfadeSample {
    /// Segment blending out.
    pub outgoing: usize,
    /// 0 at the boundary, approaching 1 at the end of the fade.
    pub progress: f64,
}

/// Everything visible at one instant of the timeline.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineState {
    pub active_word_index: Option<usize>,
    /// Animation of the active word; `None` when no word is active.
    pub animation: Option<AnimationFrame>,
    pub banner_visible: bool,
    pub background_segment_index: usize,
    pub background_source_offset_sec: f64,
    pub crossfade: Option<CrossfadeSample>,
}

/// One view over a compiled [`RenderPlan`].
///
/// Implementations never recompute timing; they only read the windows stored in the plan, so
/// any two backends agree at every instant.
pub trait RenderPlanBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn plan(&self) -> &RenderPlan;

    /// State at output time `t_ms`, which must lie in `[0, total_duration_ms)`.
    fn state_at_ms(&self, t_ms: f64) -> StoryreelResult<TimelineState>;
}

pub fn create_backend(
    kind: BackendKind,
    plan: Arc<RenderPlan>,
) -> StoryreelResult<Box<dyn RenderPlanBackend>> {
    plan.validate()?;
    match kind {
        BackendKind::Scene => Ok(Box::new(FrameSampledScene::new(plan))),
        BackendKind::Graph => Ok(Box::new(FilterGraph::from_plan(plan)?)),
    }
}

pub(crate) fn check_instant(plan: &RenderPlan, t_ms: f64) -> StoryreelResult<()> {
    if !t_ms.is_finite() || t_ms < 0.0 || t_ms >= plan.total_duration_ms {
        return Err(StoryreelError::evaluation(format!(
            "time {t_ms}ms is outside [0, {})",
            plan.total_duration_ms
        )));
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub struct SampleFingerprint {
    pub hi: u64,
    pub lo: u64,
}

/// Stable 128-bit digest of a sampled state, for regression snapshots.
pub fn fingerprint_sample(state: &TimelineState) -> SampleFingerprint {
    let mut a = Fnv1a64::new_default();
    let mut b = Fnv1a64::new(0x9ae1_6a3b_2f90_404f);

    match state.active_word_index {
        Some(i) => {
            write_u8_pair(&mut a, &mut b, 1);
            write_u64_pair(&mut a, &mut b, i as u64);
        }
        None => write_u8_pair(&mut a, &mut b, 0),
    }
    match state.animation {
        Some(f) => {
            write_u8_pair(&mut a, &mut b, 1);
            write_f64_pair(&mut a, &mut b, f.translate_y);
            write_f64_pair(&mut a, &mut b, f.scale);
            write_f64_pair(&mut a, &mut b, f.opacity);
        }
        None => write_u8_pair(&mut a, &mut b, 0),
    }
    write_u8_pair(&mut a, &mut b, u8::from(state.banner_visible));
    write_u64_pair(&mut a, &mut b, state.background_segment_index as u64);
    write_f64_pair(&mut a, &mut b, state.background_source_offset_sec);
    match state.crossfade {
        Some(c) => {
            write_u8_pair(&mut a, &mut b, 1);
            write_u64_pair(&mut a, &mut b, c.outgoing as u64);
            write_f64_pair(&mut a, &mut b, c.progress);
        }
        None => write_u8_pair(&mut a, &mut b, 0),
    }

    SampleFingerprint {
        hi: a.finish(),
        lo: b.finish(),
    }
}

fn write_u8_pair(a: &mut Fnv1a64, b: &mut Fnv1a64, v: u8) {
    a.write_u8(v);
    b.write_u8(v);
}

fn write_u64_pair(a: &mut Fnv1a64, b: &mut Fnv1a64, v: u64) {
    a.write_u64(v);
    b.write_u64(v);
}

fn write_f64_pair(a: &mut Fnv1a64, b: &mut Fnv1a64, v: f64) {
    a.write_f64(v);
    b.write_f64(v);
}

#[cfg(test)]
#[path = "../../tests/unit/backend/mod.rs"]
mod tests;
