use std::path::Path;

use super::*;
use crate::encode::runner::CancelToken;
use crate::schedule::background::ClipSource;
use crate::test_support::{RecordingRunner, sample_plan, sample_pool};

fn job(out_dir: &Path) -> EncodeJob {
    EncodeJob {
        plan: sample_plan(1000.0, 4),
        pool: sample_pool(),
        narration: vec![PathBuf::from("opening.wav"), PathBuf::from("story.wav")],
        banner_image: Some(PathBuf::from("banner.png")),
        font_file: None,
        output: out_dir.join("nested").join("final.mp4"),
    }
}

#[test]
fn steps_run_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = Arc::new(RecordingRunner::default());
    let pipeline = EncodePipeline::new(EncodeSettings::default()).with_runner(runner.clone());
    let job = job(tmp.path());
    let outcome = pipeline.run(&job, &RunControl::default()).unwrap();

    let mut distinct: Vec<&str> = job
        .plan
        .segments
        .iter()
        .map(|s| s.segment.clip_id.as_str())
        .collect();
    distinct.sort_unstable();
    distinct.dedup();
    let n = job.plan.segments.len();

    let mut expected = vec!["normalize".to_string(); distinct.len()];
    expected.extend(std::iter::repeat_n("cut".to_string(), n));
    expected.push("concat".to_string());
    expected.push("mux".to_string());
    assert_eq!(runner.steps(), expected);
    assert_eq!(outcome.commands, expected.len());
    assert_eq!(outcome.output, job.output);
    assert!(job.output.parent().unwrap().is_dir());

    let calls = runner.calls();
    let mux = calls.last().unwrap().args_lossy();
    assert_eq!(mux.last().unwrap().as_str(), job.output.to_str().unwrap());
    assert!(mux.contains(&"banner.png".to_string()));
}

#[test]
fn job_directory_is_scoped_and_cleaned_up() {
    let root = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let runner = Arc::new(RecordingRunner::default());
    let pipeline = EncodePipeline::new(EncodeSettings::default())
        .with_runner(runner.clone())
        .with_work_root(root.path());
    pipeline.run(&job(out.path()), &RunControl::default()).unwrap();

    let cut = runner
        .calls()
        .into_iter()
        .find(|c| c.step == "cut")
        .unwrap();
    let seg_file = PathBuf::from(cut.args_lossy().last().unwrap());
    assert!(seg_file.starts_with(root.path()));
    assert!(
        seg_file
            .parent()
            .unwrap()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("storyreel-job-")
    );
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}

#[test]
fn failure_stops_the_pipeline() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = Arc::new(RecordingRunner::failing_at("cut"));
    let pipeline = EncodePipeline::new(EncodeSettings::default()).with_runner(runner.clone());
    let err = pipeline
        .run(&job(tmp.path()), &RunControl::default())
        .unwrap_err();
    assert!(matches!(err, StoryreelError::Encoding { ref step, .. } if step == "cut"));
    assert!(err.to_string().contains("simulated failure"));
    let steps = runner.steps();
    assert_eq!(steps.last().unwrap(), "cut");
    assert!(!steps.iter().any(|s| s == "concat" || s == "mux"));
}

#[test]
fn cancelled_job_runs_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = Arc::new(RecordingRunner::default());
    let pipeline = EncodePipeline::new(EncodeSettings::default()).with_runner(runner.clone());
    let token = CancelToken::new();
    token.cancel();
    let ctl = RunControl {
        cancel: Some(&token),
        progress: None,
    };
    let err = pipeline.run(&job(tmp.path()), &ctl).unwrap_err();
    assert!(matches!(err, StoryreelError::Cancelled { .. }));
    assert!(runner.calls().is_empty());
}

#[test]
fn settings_must_match_the_plan() {
    let tmp = tempfile::tempdir().unwrap();
    let settings = EncodeSettings {
        width: 720,
        height: 1280,
        ..EncodeSettings::default()
    };
    let pipeline =
        EncodePipeline::new(settings).with_runner(Arc::new(RecordingRunner::default()));
    assert!(matches!(
        pipeline.run(&job(tmp.path()), &RunControl::default()),
        Err(StoryreelError::Validation(_))
    ));
}

#[test]
fn missing_clip_file_becomes_placeholder() {
    let tmp = tempfile::tempdir().unwrap();
    let mut job = job(tmp.path());
    let clips: Vec<ClipSource> = job
        .pool
        .clips()
        .iter()
        .cloned()
        .map(|mut c| {
            c.origin = ClipOrigin::File {
                path: tmp.path().join(format!("{}.mp4", c.id)),
            };
            c
        })
        .collect();
    job.pool = ClipPool::new(clips).unwrap();

    let runner = Arc::new(RecordingRunner::default());
    let pipeline = EncodePipeline::new(EncodeSettings::default()).with_runner(runner.clone());
    pipeline.run(&job, &RunControl::default()).unwrap();
    let first = runner.calls().into_iter().next().unwrap().args_lossy();
    assert!(first.contains(&"lavfi".to_string()));
    assert!(first.iter().any(|a| a.starts_with("color=c=black:")));
}
