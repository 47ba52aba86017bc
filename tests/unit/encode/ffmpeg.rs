use super::*;
use crate::test_support::{RecordingRunner, sample_plan};

fn settings() -> EncodeSettings {
    EncodeSettings::default()
}

fn position(args: &[String], flag: &str) -> usize {
    args.iter()
        .position(|a| a == flag)
        .unwrap_or_else(|| panic!("missing {flag} in {args:?}"))
}

#[test]
fn settings_validation() {
    assert!(settings().validate().is_ok());
    let odd = EncodeSettings {
        width: 1081,
        ..settings()
    };
    assert!(odd.validate().is_err());
    let no_time = EncodeSettings {
        timeout: Duration::ZERO,
        ..settings()
    };
    assert!(no_time.validate().is_err());
}

#[test]
fn normalize_covers_crops_and_strips_audio() {
    let cmd = normalize_clip_cmd(Path::new("in.mov"), Path::new("out.mp4"), &settings());
    assert_eq!(cmd.step, "normalize");
    let args = cmd.args_lossy();
    assert!(args.contains(
        &"scale=1080:1920:force_original_aspect_ratio=increase,crop=1080:1920,fps=30,setsar=1"
            .to_string()
    ));
    assert!(args.contains(&"-an".to_string()));
    assert_eq!(args.last().unwrap(), "out.mp4");
}

#[test]
fn placeholder_uses_lavfi_colour() {
    let cmd = placeholder_clip_cmd("black", 30.0, Path::new("p.mp4"), &settings());
    let args = cmd.args_lossy();
    let i = position(&args, "lavfi");
    assert_eq!(args[i + 2], "color=c=black:s=1080x1920:r=30:d=30.000");
}

#[test]
fn cut_seeks_loops_and_extends_for_crossfade() {
    let graph = FilterGraph::from_plan(sample_plan(0.0, 4)).unwrap();
    let seg = graph.segment_inputs().next().unwrap();
    let cmd = cut_segment_cmd(Path::new("n0.mp4"), Path::new("s0.mp4"), seg, &settings());
    let args = cmd.args_lossy();
    assert!(position(&args, "-stream_loop") < position(&args, "-i"));
    assert_eq!(args[position(&args, "-ss") + 1], format!("{:.3}", seg.source_start_sec));
    // 1.5s segment plus the 0.4s crossfade tail.
    assert_eq!(args[position(&args, "-t") + 1], "1.900");
    assert!(args.contains(&"setpts=(PTS-STARTPTS)/1.0000,fps=30".to_string()));
}

#[test]
fn concat_uses_xfade_chain() {
    let graph = FilterGraph::from_plan(sample_plan(0.0, 4)).unwrap();
    let inputs: Vec<PathBuf> = (0..3).map(|i| PathBuf::from(format!("s{i}.mp4"))).collect();
    let cmd = concat_cmd(&inputs, &graph, Path::new("bg.mp4"), &settings()).unwrap();
    let args = cmd.args_lossy();
    assert_eq!(args.iter().filter(|a| *a == "-i").count(), 3);
    let filter = &args[position(&args, "-filter_complex") + 1];
    assert!(filter.ends_with("[bg]"));
    assert_eq!(args[position(&args, "-map") + 1], "[bg]");
    assert!(concat_cmd(&[], &graph, Path::new("bg.mp4"), &settings()).is_err());
}

#[test]
fn mux_wires_banner_and_narration() {
    let graph = FilterGraph::from_plan(sample_plan(1000.0, 1)).unwrap();
    let narration = vec![PathBuf::from("opening.wav"), PathBuf::from("story.wav")];
    let cmd = mux_cmd(
        Path::new("bg.mp4"),
        Some(Path::new("banner.png")),
        &narration,
        None,
        &graph,
        Path::new("out/final.mp4"),
        &settings(),
    )
    .unwrap();
    let args = cmd.args_lossy();
    assert_eq!(args[position(&args, "-loop") + 3], "banner.png");
    let filter = &args[position(&args, "-filter_complex") + 1];
    assert!(filter.starts_with("[1:v]scale="));
    assert!(filter.contains("[0:v][bnr]overlay="));
    assert!(filter.ends_with("[2:a][3:a]concat=n=2:v=0:a=1[aout]"));
    assert!(args.contains(&"[aout]".to_string()));
    assert_eq!(args[position(&args, "-t") + 1], "4.560");
    assert!(args.contains(&"pipe:1".to_string()));

    let single = mux_cmd(
        Path::new("bg.mp4"),
        None,
        &narration[1..],
        None,
        &graph,
        Path::new("final.mp4"),
        &settings(),
    )
    .unwrap()
    .args_lossy();
    assert!(single.contains(&"1:a".to_string()));
    assert!(!single.iter().any(|a| a.contains("concat=")));

    assert!(
        mux_cmd(
            Path::new("bg.mp4"),
            None,
            &[],
            None,
            &graph,
            Path::new("x.mp4"),
            &settings()
        )
        .is_err()
    );
}

#[test]
fn probe_output_parsing() {
    assert_eq!(parse_probe_duration("12.480000\n").unwrap(), 12.48);
    assert_eq!(parse_probe_duration("\n  3.5 \n").unwrap(), 3.5);
    assert!(parse_probe_duration("").is_err());
    assert!(parse_probe_duration("N/A\n").is_err());
    assert!(parse_probe_duration("0.0\n").is_err());
}

#[test]
fn ffprobe_probe_reads_runner_stdout() {
    let runner = Arc::new(RecordingRunner {
        stdout: b"7.25\n".to_vec(),
        ..RecordingRunner::default()
    });
    let probe = FfprobeProbe::default().with_runner(runner.clone());
    assert_eq!(probe.duration_sec(Path::new("clip.mp4")).unwrap(), 7.25);
    let calls = runner.calls();
    assert_eq!(calls[0].program, "ffprobe");
    assert_eq!(calls[0].step, "probe");
    assert_eq!(calls[0].args_lossy().last().unwrap(), "clip.mp4");

    let failing = FfprobeProbe::default().with_runner(Arc::new(RecordingRunner::failing_at("probe")));
    assert!(failing.duration_sec(Path::new("clip.mp4")).is_err());
}
