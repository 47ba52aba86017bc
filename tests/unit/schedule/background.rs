use super::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn clip(id: &str, duration_sec: f64) -> ClipSource {
    ClipSource {
        id: id.to_string(),
        category: "cooking".to_string(),
        origin: ClipOrigin::File {
            path: PathBuf::from(format!("/clips/{id}.mp4")),
        },
        duration_sec,
    }
}

fn pool(n: usize) -> ClipPool {
    ClipPool::new(
        (0..n)
            .map(|i| clip(&format!("c{i}"), 30.0 + i as f64))
            .collect(),
    )
    .unwrap()
}

#[test]
fn durations_cover_total_exactly() {
    let opts = BackgroundOptions::default();
    for total in [0.3, 4.9, 5.0, 5.3, 12.0, 17.25, 61.7] {
        let s = plan_background(&pool(4), total, &opts, &mut StdRng::seed_from_u64(7)).unwrap();
        let sum: f64 = s.segments.iter().map(|x| x.duration_sec).sum();
        assert!((sum - total).abs() <= DURATION_EPSILON_SEC, "total={total}");
        let (last, body) = s.segments.split_last().unwrap();
        assert!(body.iter().all(|x| x.duration_sec == 5.0), "total={total}");
        assert!(last.duration_sec > 0.0);
    }
}

#[test]
fn last_segment_is_clipped_not_dropped() {
    let s = plan_background(
        &pool(3),
        12.0,
        &BackgroundOptions::default(),
        &mut StdRng::seed_from_u64(1),
    )
    .unwrap();
    let d: Vec<f64> = s.segments.iter().map(|x| x.duration_sec).collect();
    assert_eq!(d, [5.0, 5.0, 2.0]);
}

#[test]
fn runt_tail_is_absorbed() {
    let s = plan_background(
        &pool(3),
        10.3,
        &BackgroundOptions::default(),
        &mut StdRng::seed_from_u64(1),
    )
    .unwrap();
    assert_eq!(s.segments.len(), 2);
    assert!((s.segments[1].duration_sec - 5.3).abs() < 1e-9);
    s.validate().unwrap();
}

#[test]
fn no_immediate_repeats_with_several_clips() {
    for seed in 0..50 {
        let s = plan_background(
            &pool(2),
            120.0,
            &BackgroundOptions::default(),
            &mut StdRng::seed_from_u64(seed),
        )
        .unwrap();
        for pair in s.segments.windows(2) {
            assert_ne!(pair[0].clip_id, pair[1].clip_id, "seed={seed}");
        }
    }
}

#[test]
fn single_clip_pool_repeats() {
    let s = plan_background(
        &pool(1),
        15.0,
        &BackgroundOptions::default(),
        &mut StdRng::seed_from_u64(3),
    )
    .unwrap();
    assert_eq!(s.segments.len(), 3);
    assert!(s.segments.iter().all(|x| x.clip_id == "c0"));
}

#[test]
fn same_seed_same_schedule() {
    let opts = BackgroundOptions::default();
    let a = plan_background(&pool(5), 42.0, &opts, &mut StdRng::seed_from_u64(99)).unwrap();
    let b = plan_background(&pool(5), 42.0, &opts, &mut StdRng::seed_from_u64(99)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn source_start_leaves_tail_margin() {
    let opts = BackgroundOptions {
        speed_multiplier: 1.5,
        ..BackgroundOptions::default()
    };
    let p = pool(6);
    for seed in 0..20 {
        let s = plan_background(&p, 33.0, &opts, &mut StdRng::seed_from_u64(seed)).unwrap();
        for (i, seg) in s.segments.iter().enumerate() {
            let src = p.get(&seg.clip_id).unwrap();
            let used = s.rendered_duration_sec(i) * seg.speed_multiplier;
            assert!(seg.source_start_sec >= 0.0);
            assert!(seg.source_start_sec + used + SOURCE_TAIL_MARGIN_SEC <= src.duration_sec);
            assert_eq!(seg.speed_multiplier, 1.5);
        }
    }
}

#[test]
fn short_clip_starts_at_zero() {
    let p = ClipPool::new(vec![clip("tiny", 2.0)]).unwrap();
    let s = plan_background(
        &p,
        5.0,
        &BackgroundOptions::default(),
        &mut StdRng::seed_from_u64(0),
    )
    .unwrap();
    assert_eq!(s.segments[0].source_start_sec, 0.0);
}

#[test]
fn transitions_sit_on_boundaries() {
    let s = plan_background(
        &pool(3),
        14.0,
        &BackgroundOptions::default(),
        &mut StdRng::seed_from_u64(5),
    )
    .unwrap();
    assert_eq!(s.segment_starts_sec(), [0.0, 5.0, 10.0]);
    let t = s.transitions();
    assert_eq!(t.len(), 2);
    assert_eq!(t[0].incoming, 1);
    assert_eq!(t[1].at_sec, 10.0);
    assert_eq!(s.rendered_duration_sec(0), 5.4);
    assert_eq!(s.rendered_duration_sec(2), 4.0);

    let single = plan_background(
        &pool(3),
        3.0,
        &BackgroundOptions::default(),
        &mut StdRng::seed_from_u64(5),
    )
    .unwrap();
    assert!(single.transitions().is_empty());
}

#[test]
fn validate_catches_broken_schedules() {
    let seg = |d: f64| BackgroundSegment {
        clip_id: "c0".to_string(),
        source_start_sec: 0.0,
        duration_sec: d,
        speed_multiplier: 1.0,
    };
    let short_sum = BackgroundSchedule {
        segments: vec![seg(5.0), seg(4.0)],
        total_duration_sec: 10.0,
        crossfade_sec: 0.4,
    };
    assert!(matches!(
        short_sum.validate(),
        Err(StoryreelError::Schedule(_))
    ));

    let long_fade = BackgroundSchedule {
        segments: vec![seg(5.0), seg(0.3)],
        total_duration_sec: 5.3,
        crossfade_sec: 0.4,
    };
    assert!(matches!(
        long_fade.validate(),
        Err(StoryreelError::Schedule(_))
    ));

    let empty = BackgroundSchedule {
        segments: vec![],
        total_duration_sec: 1.0,
        crossfade_sec: 0.0,
    };
    assert!(empty.validate().is_err());
}

#[test]
fn bad_inputs_are_rejected() {
    assert!(matches!(
        ClipPool::new(vec![]),
        Err(StoryreelError::Asset(_))
    ));
    assert!(ClipPool::new(vec![clip("a", 0.0)]).is_err());
    assert!(ClipPool::new(vec![clip("a", 5.0), clip("a", 6.0)]).is_err());

    let mut rng = StdRng::seed_from_u64(0);
    let bad_fade = BackgroundOptions {
        crossfade_sec: 5.0,
        ..BackgroundOptions::default()
    };
    assert!(plan_background(&pool(2), 10.0, &bad_fade, &mut rng).is_err());
    assert!(plan_background(&pool(2), 0.0, &BackgroundOptions::default(), &mut rng).is_err());
}
