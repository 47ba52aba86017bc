use super::*;
use crate::animation::caption::AnimationFrame;
use crate::test_support::sample_plan;

#[test]
fn frame_out_of_bounds_is_an_error() {
    let plan = sample_plan(1000.0, 2);
    let scene = FrameSampledScene::new(plan.clone());
    assert!(scene.sample(FrameIndex(plan.total_frames - 1)).is_ok());
    let err = scene.sample(FrameIndex(plan.total_frames)).unwrap_err();
    assert!(err.to_string().contains("out of bounds"));
}

#[test]
fn opening_shows_banner_without_captions() {
    let plan = sample_plan(1000.0, 2);
    let scene = FrameSampledScene::new(plan);
    let s = scene.sample(FrameIndex(10)).unwrap();
    assert!(s.banner_visible);
    assert_eq!(s.active_word_index, None);
    assert_eq!(s.animation, None);

    // First word starts at 1000ms -> frame 30; banner window ends there too.
    let s = scene.sample(FrameIndex(30)).unwrap();
    assert!(!s.banner_visible);
    assert_eq!(s.active_word_index, Some(0));
}

#[test]
fn animation_runs_then_settles() {
    let plan = sample_plan(0.0, 2);
    let scene = FrameSampledScene::new(plan.clone());
    let enter = scene.sample(FrameIndex(0)).unwrap().animation.unwrap();
    assert_eq!(enter.translate_y, -6.0);
    assert_eq!(enter.scale, 1.0);
    assert_eq!(enter.opacity, 0.8);

    let mid = scene.sample(FrameIndex(2)).unwrap().animation.unwrap();
    assert!(mid.scale > 1.0);
    assert!(mid.translate_y > -6.0 && mid.translate_y < 0.0);

    let later = scene.sample(FrameIndex(8)).unwrap().animation.unwrap();
    assert_eq!(later, AnimationFrame::SETTLED);
}

#[test]
fn crossfade_reports_outgoing_and_progress() {
    let plan = sample_plan(0.0, 4);
    let scene = FrameSampledScene::new(plan.clone());
    let fade = plan.segments[1].crossfade_in.unwrap();
    let first = scene.sample(fade.frames.start).unwrap();
    assert_eq!(first.background_segment_index, 1);
    let c = first.crossfade.unwrap();
    assert_eq!(c.outgoing, 0);
    assert!(c.progress >= 0.0 && c.progress < 0.1);

    let last = scene
        .sample(FrameIndex(fade.frames.end.0 - 1))
        .unwrap()
        .crossfade
        .unwrap();
    assert!(last.progress > c.progress && last.progress < 1.0);

    let after = scene.sample(fade.frames.end).unwrap();
    assert_eq!(after.background_segment_index, 1);
    assert!(after.crossfade.is_none());

    let before = scene.sample(FrameIndex(fade.frames.start.0 - 1)).unwrap();
    assert_eq!(before.background_segment_index, 0);
    assert!(before.crossfade.is_none());
}

#[test]
fn source_offset_advances_with_time() {
    let plan = sample_plan(0.0, 5);
    let scene = FrameSampledScene::new(plan.clone());
    let a = scene.sample(FrameIndex(0)).unwrap();
    let b = scene.sample(FrameIndex(15)).unwrap();
    assert_eq!(a.background_source_offset_sec, plan.segments[0].segment.source_start_sec);
    assert!((b.background_source_offset_sec - a.background_source_offset_sec - 0.5).abs() < 1e-9);
}

#[test]
fn state_at_ms_matches_frame_sampling() {
    let plan = sample_plan(1000.0, 6);
    let scene = FrameSampledScene::new(plan.clone());
    for t in [0.0, 33.3, 999.9, 1000.0, 1420.0, 2345.6] {
        let frame = plan.fps.ms_to_frames(t);
        assert_eq!(scene.state_at_ms(t).unwrap(), scene.sample(frame).unwrap(), "t={t}");
    }
}
