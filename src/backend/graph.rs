use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use crate::animation::caption::AnimationFrame;
use crate::backend::{BackendKind, CrossfadeSample, RenderPlanBackend, TimelineState, check_instant};
use crate::compile::plan::{CaptionEvent, RenderPlan};
use crate::foundation::core::{FrameIndex, FrameRange, MsWindow, Point, Rect};
use crate::foundation::error::{StoryreelError, StoryreelResult};

/// Animation value held for one output frame.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct AnimationKey {
    pub at: FrameIndex,
    pub window: MsWindow,
    pub frame: AnimationFrame,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawCaption {
    pub word_index: usize,
    pub text: String,
    pub window: MsWindow,
    pub frames: FrameRange,
    /// Horizontal centre and top edge of the word at rest.
    pub anchor: Point,
    pub font_size: f64,
    /// Per-frame animation while the entrance runs; `settled` afterwards.
    pub keys: Vec<AnimationKey>,
    pub settled: AnimationFrame,
}

impl DrawCaption {
    pub fn animation_at(&self, frame: FrameIndex) -> AnimationFrame {
        self.keys
            .iter()
            .find(|k| k.at == frame)
            .map_or(self.settled, |k| k.frame)
    }
}

/// Background input `index`, shown on the output timeline over `window`.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentInput {
    pub index: usize,
    pub clip_id: String,
    pub window: MsWindow,
    pub frames: FrameRange,
    pub timeline_start_ms: f64,
    pub source_start_sec: f64,
    pub speed_multiplier: f64,
    /// Output seconds the cut file must hold, crossfade tail included.
    pub rendered_duration_sec: f64,
}

/// Boundary between two background inputs. `window` is empty for a hard cut.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CutOp {
    pub from: usize,
    pub to: usize,
    pub boundary_ms: f64,
    pub duration_ms: f64,
    pub window: MsWindow,
    pub frames: FrameRange,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum GraphOp {
    DrawCaption(DrawCaption),
    OverlayBanner {
        window: MsWindow,
        frames: FrameRange,
        placement: Rect,
    },
    Segment(SegmentInput),
    Cut(CutOp),
}

impl GraphOp {
    pub fn window(&self) -> MsWindow {
        match self {
            Self::DrawCaption(d) => d.window,
            Self::OverlayBanner { window, .. } => *window,
            Self::Segment(s) => s.window,
            Self::Cut(c) => c.window,
        }
    }
}

/// Time-gated operations for a batch encoder.
///
/// Every op carries an absolute `[start_ms, end_ms)` enable window copied from the plan, plus
/// the frame range behind it. Queries are gated on frames so that a window read back from
/// JSON can never shift a boundary. Continuous values (source offsets, crossfade progress) are
/// evaluated at the timestamp of the frame that contains the queried instant.
#[derive(Clone, Debug)]
pub struct FilterGraph {
    plan: Arc<RenderPlan>,
    ops: Vec<GraphOp>,
}

impl FilterGraph {
    #[tracing::instrument(skip(plan), fields(words = plan.caption_events.len()))]
    pub fn from_plan(plan: Arc<RenderPlan>) -> StoryreelResult<Self> {
        plan.validate()?;
        let mut ops = Vec::with_capacity(
            plan.caption_events.len() + 2 * plan.segments.len() + 1,
        );

        ops.extend(
            plan.caption_events
                .iter()
                .map(|e| GraphOp::DrawCaption(bake_caption(&plan, e))),
        );
        ops.push(GraphOp::OverlayBanner {
            window: plan.banner.window,
            frames: plan.banner.frames,
            placement: plan.banner.placement,
        });
        for (i, track) in plan.segments.iter().enumerate() {
            ops.push(GraphOp::Segment(SegmentInput {
                index: i,
                clip_id: track.segment.clip_id.clone(),
                window: track.window,
                frames: track.frames,
                timeline_start_ms: track.start_ms,
                source_start_sec: track.segment.source_start_sec,
                speed_multiplier: track.segment.speed_multiplier,
                rendered_duration_sec: plan.background.rendered_duration_sec(i),
            }));
        }
        for (i, track) in plan.segments.iter().enumerate().skip(1) {
            let cut = match track.crossfade_in {
                Some(c) => CutOp {
                    from: i - 1,
                    to: i,
                    boundary_ms: c.boundary_ms,
                    duration_ms: c.duration_ms,
                    window: c.window,
                    frames: c.frames,
                },
                None => CutOp {
                    from: i - 1,
                    to: i,
                    boundary_ms: track.start_ms,
                    duration_ms: 0.0,
                    window: MsWindow {
                        start_ms: track.window.start_ms,
                        end_ms: track.window.start_ms,
                    },
                    frames: FrameRange {
                        start: track.frames.start,
                        end: track.frames.start,
                    },
                },
            };
            ops.push(GraphOp::Cut(cut));
        }
        tracing::debug!(ops = ops.len(), "filter graph built");
        Ok(Self { plan, ops })
    }

    pub fn ops(&self) -> &[GraphOp] {
        &self.ops
    }

    pub fn segment_inputs(&self) -> impl Iterator<Item = &SegmentInput> {
        self.ops.iter().filter_map(|op| match op {
            GraphOp::Segment(s) => Some(s),
            _ => None,
        })
    }

    fn banner_op(&self) -> Option<(MsWindow, Rect)> {
        self.ops.iter().find_map(|op| match op {
            GraphOp::OverlayBanner {
                window, placement, ..
            } => Some((*window, *placement)),
            _ => None,
        })
    }

    pub fn cuts(&self) -> impl Iterator<Item = &CutOp> {
        self.ops.iter().filter_map(|op| match op {
            GraphOp::Cut(c) => Some(c),
            _ => None,
        })
    }

    /// Join the cut segment files (inputs `0..n`) into `[bg]` (and `[bga]` with audio).
    ///
    /// Returns `None` for a single segment, which needs no filter.
    pub fn background_filter(&self, keep_audio: bool) -> Option<String> {
        let n = self.plan.segments.len();
        if n < 2 {
            return None;
        }
        let cuts: Vec<&CutOp> = self.cuts().collect();
        let mut out = String::new();

        if cuts.iter().all(|c| c.duration_ms <= 0.0) {
            for i in 0..n {
                let _ = write!(out, "[{i}:v]");
                if keep_audio {
                    let _ = write!(out, "[{i}:a]");
                }
            }
            let a = u8::from(keep_audio);
            let _ = write!(out, "concat=n={n}:v=1:a={a}[bg]");
            if keep_audio {
                out.push_str("[bga]");
            }
            return Some(out);
        }

        let mut prev = "0:v".to_string();
        for (k, cut) in cuts.iter().enumerate() {
            let label = if k + 1 == cuts.len() {
                "bg".to_string()
            } else {
                format!("v{}", cut.to)
            };
            if !out.is_empty() {
                out.push(';');
            }
            let _ = write!(
                out,
                "[{prev}][{}:v]xfade=transition=fade:duration={:.3}:offset={:.3}[{label}]",
                cut.to,
                cut.duration_ms / 1000.0,
                cut.boundary_ms / 1000.0
            );
            prev = label;
        }
        if keep_audio {
            let mut prev = "0:a".to_string();
            for (k, cut) in cuts.iter().enumerate() {
                let label = if k + 1 == cuts.len() {
                    "bga".to_string()
                } else {
                    format!("a{}", cut.to)
                };
                let _ = write!(
                    out,
                    ";[{prev}][{}:a]acrossfade=d={:.3}[{label}]",
                    cut.to,
                    cut.duration_ms / 1000.0
                );
                prev = label;
            }
        }
        Some(out)
    }

    /// Banner overlay and word captions on top of `[video]`, ending in `[vout]`.
    ///
    /// Enable gates are shifted back by half a frame so every frame timestamp sits well inside
    /// its gate regardless of float formatting.
    pub fn overlay_filter(
        &self,
        video: &str,
        banner_input: Option<usize>,
        font_file: Option<&Path>,
    ) -> String {
        let half_sec = self.plan.fps.frame_duration_ms() / 2000.0;
        let mut out = String::new();
        let mut base = video.to_string();

        if let Some(input) = banner_input
            && let Some((window, placement)) = self.banner_op()
            && !window.is_empty()
        {
            let _ = write!(
                out,
                "[{input}:v]scale={w:.0}:{h:.0}[bnr];[{base}][bnr]overlay=x={x:.0}:y={y:.0}:enable='{gate}'[ovb];",
                w = placement.width(),
                h = placement.height(),
                x = placement.x0,
                y = placement.y0,
                gate = gate_expr(window, half_sec),
            );
            base = "ovb".to_string();
        }

        let draws: Vec<String> = self
            .ops
            .iter()
            .filter_map(|op| match op {
                GraphOp::DrawCaption(d) if !d.window.is_empty() => {
                    Some(drawtext(d, half_sec, font_file))
                }
                _ => None,
            })
            .collect();
        if draws.is_empty() {
            let _ = write!(out, "[{base}]null[vout]");
        } else {
            let _ = write!(out, "[{base}]{}[vout]", draws.join(","));
        }
        out
    }
}

impl RenderPlanBackend for FilterGraph {
    fn kind(&self) -> BackendKind {
        BackendKind::Graph
    }

    fn plan(&self) -> &RenderPlan {
        &self.plan
    }

    fn state_at_ms(&self, t_ms: f64) -> StoryreelResult<TimelineState> {
        check_instant(&self.plan, t_ms)?;
        let fps = self.plan.fps;
        let frame = fps.ms_to_frames(t_ms);
        let frame_ms = fps.frames_to_ms(frame);

        let mut caption: Option<&DrawCaption> = None;
        let mut banner_visible = false;
        let mut segment: Option<&SegmentInput> = None;
        let mut cuts = Vec::new();
        for op in &self.ops {
            match op {
                GraphOp::DrawCaption(d) => {
                    if caption.is_none() && d.frames.contains(frame) {
                        caption = Some(d);
                    }
                }
                GraphOp::OverlayBanner { frames, .. } => {
                    banner_visible |= frames.contains(frame);
                }
                GraphOp::Segment(s) => {
                    if segment.is_none() && s.frames.contains(frame) {
                        segment = Some(s);
                    }
                }
                GraphOp::Cut(c) => cuts.push(c),
            }
        }

        let Some(segment) = segment else {
            return Err(StoryreelError::evaluation(format!(
                "no background input is enabled at {t_ms}ms"
            )));
        };
        let crossfade = cuts
            .into_iter()
            .find(|c| c.to == segment.index && c.frames.contains(frame))
            .map(|c| CrossfadeSample {
                outgoing: c.from,
                progress: ((frame_ms - c.boundary_ms) / c.duration_ms).clamp(0.0, 1.0),
            });

        Ok(TimelineState {
            active_word_index: caption.map(|d| d.word_index),
            animation: caption.map(|d| d.animation_at(frame)),
            banner_visible,
            background_segment_index: segment.index,
            background_source_offset_sec: segment.source_start_sec
                + ((frame_ms - segment.timeline_start_ms).max(0.0) / 1000.0)
                    * segment.speed_multiplier,
            crossfade,
        })
    }
}

fn bake_caption(plan: &RenderPlan, e: &CaptionEvent) -> DrawCaption {
    let animator = &plan.caption_style.animator;
    let mut keys = Vec::new();
    for f in e.frames.start.0..e.frames.end.0 {
        let at = plan.fps.frames_to_ms(FrameIndex(f));
        let elapsed = at - e.start_ms;
        if animator.is_settled(elapsed) {
            break;
        }
        keys.push(AnimationKey {
            at: FrameIndex(f),
            window: MsWindow {
                start_ms: at,
                end_ms: plan.fps.frames_to_ms(FrameIndex(f + 1)),
            },
            frame: animator.sample(elapsed),
        });
    }
    DrawCaption {
        word_index: e.word_index,
        text: e.word.clone(),
        window: e.window,
        frames: e.frames,
        anchor: e.position_hint,
        font_size: plan.caption_style.font_size,
        keys,
        settled: AnimationFrame::SETTLED,
    }
}

fn gate_expr(window: MsWindow, half_sec: f64) -> String {
    format!(
        "gte(t,{:.6})*lt(t,{:.6})",
        window.start_ms / 1000.0 - half_sec,
        window.end_ms / 1000.0 - half_sec
    )
}

/// Nested `if(lt(t,end),value,...)` over the baked keys, falling back to the settled value.
fn keyed_expr(d: &DrawCaption, half_sec: f64, value: impl Fn(&AnimationFrame) -> f64) -> String {
    let mut expr = format!("{:.4}", value(&d.settled));
    for k in d.keys.iter().rev() {
        expr = format!(
            "if(lt(t,{:.6}),{:.4},{expr})",
            k.window.end_ms / 1000.0 - half_sec,
            value(&k.frame)
        );
    }
    expr
}

fn drawtext(d: &DrawCaption, half_sec: f64, font_file: Option<&Path>) -> String {
    let mut s = String::from("drawtext=");
    if let Some(font) = font_file {
        let _ = write!(s, "fontfile='{}':", escape_filter_value(&font.to_string_lossy()));
    }
    let size = d.font_size;
    let _ = write!(
        s,
        "text='{}':fontcolor=white:borderw=4:bordercolor=black:fontsize='{}':alpha='{}':x='{:.1}-text_w/2':y='{:.1}+{}':enable='{}'",
        escape_drawtext(&d.text),
        keyed_expr(d, half_sec, |f| size * f.scale),
        keyed_expr(d, half_sec, |f| f.opacity),
        d.anchor.x,
        d.anchor.y,
        keyed_expr(d, half_sec, |f| f.translate_y),
        gate_expr(d.window, half_sec),
    );
    s
}

/// Escape caption text for a single-quoted `drawtext` value.
pub(crate) fn escape_drawtext(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push('\u{2019}'),
            ':' => out.push_str("\\:"),
            '%' => out.push_str("\\%"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_filter_value(text: &str) -> String {
    text.replace('\\', "/").replace(':', "\\:").replace('\'', "")
}

#[cfg(test)]
#[path = "../../tests/unit/backend/graph.rs"]
mod tests;
