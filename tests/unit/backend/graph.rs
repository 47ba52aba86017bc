use super::*;
use crate::test_support::sample_plan;
use crate::compile::plan::SegmentTrack;
use crate::foundation::core::FrameRange;
use crate::schedule::background::BackgroundSchedule;

fn graph(opening_ms: f64, seed: u64) -> FilterGraph {
    FilterGraph::from_plan(sample_plan(opening_ms, seed)).unwrap()
}

#[test]
fn one_op_per_word_banner_segment_and_boundary() {
    let g = graph(1000.0, 1);
    let count = |f: fn(&GraphOp) -> bool| g.ops().iter().filter(|op| f(op)).count();
    assert_eq!(count(|op| matches!(op, GraphOp::DrawCaption(_))), 5);
    assert_eq!(count(|op| matches!(op, GraphOp::OverlayBanner { .. })), 1);
    assert_eq!(g.segment_inputs().count(), 3);
    assert_eq!(g.cuts().count(), 2);

    for op in g.ops() {
        let w = op.window();
        assert!(w.start_ms <= w.end_ms);
        assert!(w.end_ms <= g.plan().total_duration_ms + g.plan().fps.frame_duration_ms());
    }
}

#[test]
fn entrance_is_baked_per_frame() {
    let g = graph(1000.0, 1);
    let GraphOp::DrawCaption(first) = &g.ops()[0] else {
        panic!("first op should draw the first word");
    };
    assert_eq!(first.text, "Once");
    // 120ms entrance at 30fps: frames at +0, +33, +67 and +100ms.
    assert_eq!(first.keys.len(), 4);
    assert_eq!(first.keys[0].frame.translate_y, -6.0);
    assert_eq!(first.keys[0].window.start_ms, 1000.0);
    assert_eq!(first.keys[0].at, FrameIndex(30));
    assert_eq!(first.animation_at(FrameIndex(45)), AnimationFrame::SETTLED);
    assert_eq!(first.animation_at(FrameIndex(30)), first.keys[0].frame);
    assert_eq!(first.animation_at(FrameIndex(31)), first.keys[1].frame);
}

#[test]
fn cuts_follow_segment_boundaries() {
    let g = graph(0.0, 4);
    let cuts: Vec<&CutOp> = g.cuts().collect();
    assert_eq!((cuts[0].from, cuts[0].to), (0, 1));
    assert_eq!(cuts[0].boundary_ms, 1500.0);
    assert_eq!(cuts[0].duration_ms, 400.0);
    assert_eq!(cuts[1].boundary_ms, 3000.0);

    let inputs: Vec<&SegmentInput> = g.segment_inputs().collect();
    assert!((inputs[0].rendered_duration_sec - 1.9).abs() < 1e-12);
    assert!((inputs[2].rendered_duration_sec - 0.56).abs() < 1e-9);
}

#[test]
fn ops_are_gated_on_their_frames() {
    let mut g = graph(1000.0, 1);
    let first = g.plan().caption_events[0].frames.start;
    let t = g.plan().fps.frames_to_ms(first);
    // A window read back one ulp past its frame timestamp must not move the gate.
    let GraphOp::DrawCaption(d) = &mut g.ops[0] else {
        panic!("first op should draw the first word");
    };
    d.window.start_ms = f64::from_bits(t.to_bits() + 1);
    assert_eq!(d.frames.start, first);
    assert_eq!(g.state_at_ms(t).unwrap().active_word_index, Some(0));
}

#[test]
fn background_filter_chains_xfades() {
    let g = graph(0.0, 4);
    let f = g.background_filter(false).unwrap();
    assert_eq!(
        f,
        "[0:v][1:v]xfade=transition=fade:duration=0.400:offset=1.500[v1];\
         [v1][2:v]xfade=transition=fade:duration=0.400:offset=3.000[bg]"
    );
    let with_audio = g.background_filter(true).unwrap();
    assert!(with_audio.contains("[0:a][1:a]acrossfade=d=0.400[a1]"));
    assert!(with_audio.ends_with("[a1][2:a]acrossfade=d=0.400[bga]"));
}

#[test]
fn single_segment_needs_no_background_filter() {
    let mut plan = (*sample_plan(0.0, 4)).clone();
    let mut seg = plan.background.segments[0].clone();
    seg.duration_sec = plan.total_duration_ms / 1000.0;
    plan.background = BackgroundSchedule {
        segments: vec![seg.clone()],
        total_duration_sec: seg.duration_sec,
        crossfade_sec: 0.4,
    };
    plan.segments = vec![SegmentTrack {
        segment: seg,
        start_ms: 0.0,
        window: MsWindow {
            start_ms: 0.0,
            end_ms: plan.fps.frames_to_ms(FrameIndex(plan.total_frames)),
        },
        frames: FrameRange {
            start: FrameIndex(0),
            end: FrameIndex(plan.total_frames),
        },
        crossfade_in: None,
    }];
    let g = FilterGraph::from_plan(Arc::new(plan)).unwrap();
    assert_eq!(g.cuts().count(), 0);
    assert!(g.background_filter(true).is_none());
}

#[test]
fn overlay_filter_gates_banner_and_words() {
    let g = graph(1000.0, 1);
    let f = g.overlay_filter("bg", Some(3), Some(Path::new("/fonts/Inter.ttf")));
    assert!(f.starts_with("[3:v]scale=840:311[bnr];[bg][bnr]overlay=x=120:y=320:enable="));
    assert!(f.contains("enable='gte(t,-0.016667)*lt(t,0.983333)'[ovb]"));
    assert!(f.contains("[ovb]drawtext="));
    assert_eq!(f.matches("drawtext=").count(), 5);
    assert!(f.contains("text='midnight'"));
    assert!(f.contains("fontfile='/fonts/Inter.ttf'"));
    assert!(f.ends_with("[vout]"));
}

#[test]
fn overlay_filter_without_banner_input() {
    let g = graph(0.0, 1);
    let f = g.overlay_filter("bg", None, None);
    assert!(f.starts_with("[bg]drawtext="));
    assert!(!f.contains("overlay"));
    assert!(!f.contains("fontfile"));
}

#[test]
fn drawtext_escaping() {
    assert_eq!(escape_drawtext("plain"), "plain");
    assert_eq!(escape_drawtext("it's 50%: a\\b"), "it\u{2019}s 50\\%\\: a\\\\b");
}
