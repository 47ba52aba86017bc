use super::*;
use crate::alignment::model::WordStamp;
use crate::foundation::core::{FrameRange, Rect, Size};
use crate::schedule::background::BackgroundSegment;
use crate::schedule::banner::{BannerOptions, schedule_banner};

fn hello_world() -> Alignment {
    Alignment {
        words: vec![
            WordStamp::new("Hello", 0.0, 300.0),
            WordStamp::new("world", 300.0, 600.0),
        ],
        sample_rate: 16_000,
    }
}

fn schedule(durations: &[f64], crossfade_sec: f64) -> BackgroundSchedule {
    BackgroundSchedule {
        segments: durations
            .iter()
            .enumerate()
            .map(|(i, d)| BackgroundSegment {
                clip_id: format!("c{}", i % 2),
                source_start_sec: 1.0,
                duration_sec: *d,
                speed_multiplier: 1.0,
            })
            .collect(),
        total_duration_sec: durations.iter().sum(),
        crossfade_sec,
    }
}

fn banner(opening_ms: f64, total_ms: f64) -> BannerSchedule {
    schedule_banner(
        opening_ms,
        total_ms,
        Canvas::default(),
        &SafeZone::default(),
        Size::new(1080.0, 400.0),
        &BannerOptions::default(),
    )
    .unwrap()
}

fn compile(
    alignment: &Alignment,
    offset: f64,
    bg: &BackgroundSchedule,
    b: &BannerSchedule,
) -> StoryreelResult<RenderPlan> {
    compile_plan(&PlanInputs {
        alignment,
        fps: Fps::new(30, 1).unwrap(),
        canvas: Canvas::default(),
        safe_zone: SafeZone::default(),
        narration_offset_ms: offset,
        total_duration_ms: bg.total_duration_sec * 1000.0,
        captions: CaptionOptions::default(),
        banner: b,
        background: bg,
    })
}

#[test]
fn timeline_duration_adds_opening_and_tail() {
    let a = hello_world();
    assert_eq!(timeline_duration_ms(&a, 0.0, None, 1500.0), 2100.0);
    assert_eq!(timeline_duration_ms(&a, 2000.0, None, 1500.0), 4100.0);
    assert_eq!(timeline_duration_ms(&a, 2000.0, Some(900.0), 1500.0), 2900.0);
    assert_eq!(timeline_duration_ms(&a, 0.0, Some(100.0), 1500.0), 600.0);
}

#[test]
fn hello_world_frames() {
    let a = hello_world();
    let bg = schedule(&[2.1], 0.4);
    let plan = compile(&a, 0.0, &bg, &banner(0.0, 2100.0)).unwrap();
    plan.validate().unwrap();
    assert_eq!(plan.total_frames, 63);

    let e = &plan.caption_events;
    assert_eq!(e.len(), 2);
    assert_eq!(e[0].frames, FrameRange::new(FrameIndex(0), FrameIndex(9)).unwrap());
    // "world" lingers 250ms past 600ms -> [300, 850) -> frames [9, 26)
    assert_eq!(e[1].frames, FrameRange::new(FrameIndex(9), FrameIndex(26)).unwrap());
    assert!(e[1].frames.contains(FrameIndex(20)));
    assert_eq!(e[1].window.start_ms, 300.0);
    assert!(plan.banner.frames.is_empty());
}

#[test]
fn narration_offset_shifts_captions() {
    let a = hello_world();
    let bg = schedule(&[5.0, 1.1], 0.4);
    let plan = compile(&a, 4000.0, &bg, &banner(4000.0, 6100.0)).unwrap();
    let e = &plan.caption_events;
    assert_eq!(e[0].start_ms, 4000.0);
    assert_eq!(e[0].frames.start, FrameIndex(120));
    assert_eq!(e[1].frames.start, FrameIndex(129));
    assert_eq!(plan.banner.frames.end, FrameIndex(120));
}

#[test]
fn captions_stay_inside_safe_zone() {
    let words: Vec<WordStamp> = "this is a fairly long story that will certainly need more than one caption line to fit on screen"
        .split(' ')
        .enumerate()
        .map(|(i, w)| WordStamp::new(w, i as f64 * 300.0, i as f64 * 300.0 + 280.0))
        .collect();
    let a = Alignment {
        words,
        sample_rate: 16_000,
    };
    let total_sec = (a.last_end_ms() + 1500.0) / 1000.0;
    let bg = schedule(&[5.0, total_sec - 5.0], 0.4);
    let plan = compile(&a, 0.0, &bg, &banner(0.0, total_sec * 1000.0)).unwrap();
    let zone = SafeZone::default().content_rect(Canvas::default()).unwrap();
    let mut lines = std::collections::BTreeSet::new();
    for e in &plan.caption_events {
        lines.insert(e.line);
        assert!(e.position_hint.x > zone.x0 && e.position_hint.x < zone.x1);
        assert!(e.position_hint.y >= zone.y0 && e.position_hint.y < zone.y1);
    }
    assert!(lines.len() > 2);
}

#[test]
fn segment_tracks_tile_the_video() {
    let a = hello_world();
    let bg = schedule(&[5.0, 5.0, 2.3], 0.4);
    let plan = compile(&a, 0.0, &bg, &banner(1000.0, 12_300.0)).unwrap();
    let s = &plan.segments;
    assert_eq!(s.len(), 3);
    assert_eq!(s[0].frames.start, FrameIndex(0));
    assert_eq!(s[0].frames.end, s[1].frames.start);
    assert_eq!(s[1].frames.end, FrameIndex(300));
    assert_eq!(s[2].frames.end, FrameIndex(plan.total_frames));
    assert!(s[0].crossfade_in.is_none());
    let fade = s[1].crossfade_in.unwrap();
    assert_eq!(fade.boundary_ms, 5000.0);
    assert_eq!(fade.frames, FrameRange::new(FrameIndex(150), FrameIndex(162)).unwrap());
    assert!((s[1].source_offset_sec(6000.0) - 2.0).abs() < 1e-12);
}

#[test]
fn mismatched_background_is_a_schedule_error() {
    let a = hello_world();
    let bg = schedule(&[5.0, 5.0], 0.4);
    let err = compile_plan(&PlanInputs {
        alignment: &a,
        fps: Fps::new(30, 1).unwrap(),
        canvas: Canvas::default(),
        safe_zone: SafeZone::default(),
        narration_offset_ms: 0.0,
        total_duration_ms: 12_000.0,
        captions: CaptionOptions::default(),
        banner: &banner(0.0, 12_000.0),
        background: &bg,
    })
    .unwrap_err();
    assert!(matches!(err, StoryreelError::Schedule(_)), "{err}");
}

#[test]
fn crossfade_longer_than_segment_is_rejected() {
    let a = hello_world();
    let bg = schedule(&[5.0, 0.3], 0.4);
    let err = compile(&a, 0.0, &bg, &banner(0.0, 5300.0)).unwrap_err();
    assert!(matches!(err, StoryreelError::Schedule(_)), "{err}");
}

#[test]
fn banner_outside_video_is_rejected() {
    let a = hello_world();
    let bg = schedule(&[2.0], 0.4);
    let b = BannerSchedule {
        window: MsWindow {
            start_ms: 0.0,
            end_ms: 3000.0,
        },
        placement: Rect::new(0.0, 0.0, 10.0, 10.0),
    };
    assert!(matches!(
        compile(&a, 0.0, &bg, &b),
        Err(StoryreelError::Schedule(_))
    ));
}

#[test]
fn invalid_alignment_is_rejected() {
    let mut a = hello_world();
    a.words[0].end_ms = -1.0;
    let bg = schedule(&[2.1], 0.4);
    assert!(matches!(
        compile(&a, 0.0, &bg, &banner(0.0, 2100.0)),
        Err(StoryreelError::Validation(_))
    ));
}

#[test]
fn plan_json_reloads_and_validates() {
    let a = hello_world();
    let bg = schedule(&[5.0, 2.0], 0.4);
    let plan = compile(&a, 0.0, &bg, &banner(500.0, 7000.0)).unwrap();
    let json = serde_json::to_string(&plan).unwrap();
    assert!(json.contains("\"captionEvents\""));
    let back = RenderPlan::from_json_str(&json).unwrap();
    assert_eq!(back.total_frames, plan.total_frames);
    assert_eq!(back.caption_events.len(), 2);
    assert_eq!(back.caption_events[1].frames, plan.caption_events[1].frames);
    assert_eq!(back.segments[1].frames, plan.segments[1].frames);
    assert_eq!(back.banner.frames, plan.banner.frames);
}
