use std::{
    path::{Path, PathBuf},
    sync::{Arc, mpsc},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use rand::SeedableRng as _;
use rand::rngs::StdRng;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "storyreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evenly spaced alignment from a script, without audio.
    EstimateAlignment(EstimateArgs),
    /// Forced alignment through `whisperx`, falling back to the estimate.
    Align(AlignArgs),
    /// Compile a render plan from an alignment and a clip library.
    Plan(PlanArgs),
    /// Print the timeline state at one frame.
    Sample(SampleArgs),
    /// Print the time-gated operations and ffmpeg filters of a plan.
    Graph(GraphArgs),
    /// Encode a planned job to MP4 (requires `ffmpeg` on PATH).
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct EstimateArgs {
    /// Narration script (plain text).
    #[arg(long)]
    script: PathBuf,

    /// Output alignment JSON; stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct AlignArgs {
    #[arg(long)]
    script: PathBuf,

    /// Narration audio the script was spoken into.
    #[arg(long)]
    audio: PathBuf,

    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    /// Story alignment JSON.
    #[arg(long)]
    alignment: PathBuf,

    /// Length of the opening narration in milliseconds.
    #[arg(long)]
    opening_ms: f64,

    /// Length of the story narration; last word end plus tail padding when omitted.
    #[arg(long)]
    story_audio_ms: Option<f64>,

    /// Clip library root (`<category>/<clip>.<ext>`), probed with ffprobe.
    #[arg(long, conflicts_with = "clip_manifest", required_unless_present = "clip_manifest")]
    clips: Option<PathBuf>,

    /// Clip library manifest JSON.
    #[arg(long)]
    clip_manifest: Option<PathBuf>,

    /// Job config JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Background planning seed (overrides the config).
    #[arg(long)]
    seed: Option<u64>,

    /// Output plan JSON.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct SampleArgs {
    #[arg(long)]
    plan: PathBuf,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Backend to evaluate.
    #[arg(long, value_enum, default_value_t = BackendChoice::Scene)]
    backend: BackendChoice,
}

#[derive(Parser, Debug)]
struct GraphArgs {
    #[arg(long)]
    plan: PathBuf,

    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Render job JSON (plan, clips, narration, banner).
    #[arg(long)]
    job: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendChoice {
    Scene,
    Graph,
}

impl From<BackendChoice> for storyreel::BackendKind {
    fn from(c: BackendChoice) -> Self {
        match c {
            BackendChoice::Scene => Self::Scene,
            BackendChoice::Graph => Self::Graph,
        }
    }
}

/// Inputs of `storyreel render`. Relative paths resolve against the job file's directory.
#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct RenderJobFile {
    plan: PathBuf,
    #[serde(default)]
    clips: Option<PathBuf>,
    #[serde(default)]
    clip_manifest: Option<PathBuf>,
    /// Opening narration first, then the story.
    narration: Vec<PathBuf>,
    #[serde(default)]
    banner_image: Option<PathBuf>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::EstimateAlignment(args) => cmd_estimate(args),
        Command::Align(args) => cmd_align(args),
        Command::Plan(args) => cmd_plan(args),
        Command::Sample(args) => cmd_sample(args),
        Command::Graph(args) => cmd_graph(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<storyreel::JobConfig> {
    Ok(match path {
        Some(p) => storyreel::JobConfig::load_json(p)?,
        None => storyreel::JobConfig::default(),
    })
}

fn read_plan(path: &Path) -> anyhow::Result<storyreel::RenderPlan> {
    let json =
        std::fs::read_to_string(path).with_context(|| format!("read plan '{}'", path.display()))?;
    Ok(storyreel::RenderPlan::from_json_str(&json)?)
}

fn write_json<T: serde::Serialize>(value: &T, out: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize JSON")?;
    match out {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create output dir '{}'", parent.display()))?;
            }
            std::fs::write(path, json).with_context(|| format!("write '{}'", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn load_library(
    clips: Option<&Path>,
    manifest: Option<&Path>,
    cfg: &storyreel::JobConfig,
) -> anyhow::Result<storyreel::ClipLibrary> {
    match (clips, manifest) {
        (Some(root), None) => {
            let probe = storyreel::FfprobeProbe::default().with_timeout(cfg.timeouts.probe());
            Ok(storyreel::ClipLibrary::scan(
                root,
                &probe,
                cfg.background.default_clip.as_deref(),
            )?)
        }
        (None, Some(manifest)) => Ok(storyreel::ClipLibrary::from_manifest(manifest)?),
        _ => anyhow::bail!("exactly one of a clip directory or a clip manifest is required"),
    }
}

fn cmd_estimate(args: EstimateArgs) -> anyhow::Result<()> {
    let script = std::fs::read_to_string(&args.script)
        .with_context(|| format!("read script '{}'", args.script.display()))?;
    let alignment = storyreel::estimate_alignment(&script);
    write_json(&alignment, args.out.as_deref())
}

fn cmd_align(args: AlignArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let script = std::fs::read_to_string(&args.script)
        .with_context(|| format!("read script '{}'", args.script.display()))?;
    let aligner = storyreel::WhisperXAligner::default().with_timeout(cfg.timeouts.align());
    let alignment = storyreel::align_or_estimate(
        &aligner,
        &script,
        &args.audio,
        &storyreel::RunControl::default(),
    );
    write_json(&alignment, args.out.as_deref())
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let mut cfg = load_config(args.config.as_deref())?;
    if args.seed.is_some() {
        cfg.seed = args.seed;
    }
    let alignment = storyreel::Alignment::load_json(&args.alignment)?;
    let library = load_library(args.clips.as_deref(), args.clip_manifest.as_deref(), &cfg)?;
    let mut rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let timing = storyreel::NarrationTiming {
        opening_ms: args.opening_ms,
        story_audio_ms: args.story_audio_ms,
    };
    let job = storyreel::plan_job(&cfg, &alignment, timing, &library, &mut rng)?;
    write_json(&job.plan, Some(&args.out))
}

fn cmd_sample(args: SampleArgs) -> anyhow::Result<()> {
    let plan = Arc::new(read_plan(&args.plan)?);
    let backend = storyreel::create_backend(args.backend.into(), plan.clone())?;
    let t_ms = plan.fps.frames_to_ms(storyreel::FrameIndex(args.frame));
    let state = backend.state_at_ms(t_ms)?;
    let fp = storyreel::fingerprint_sample(&state);

    #[derive(serde::Serialize)]
    struct SampleReport {
        frame: u64,
        t_ms: f64,
        state: storyreel::TimelineState,
        fingerprint: String,
    }
    write_json(
        &SampleReport {
            frame: args.frame,
            t_ms,
            state,
            fingerprint: format!("{:016x}{:016x}", fp.hi, fp.lo),
        },
        None,
    )
}

fn cmd_graph(args: GraphArgs) -> anyhow::Result<()> {
    let plan = Arc::new(read_plan(&args.plan)?);
    let graph = storyreel::FilterGraph::from_plan(plan)?;

    #[derive(serde::Serialize)]
    struct GraphReport<'a> {
        ops: &'a [storyreel::GraphOp],
        background_filter: Option<String>,
        overlay_filter: String,
    }
    write_json(
        &GraphReport {
            ops: graph.ops(),
            background_filter: graph.background_filter(false),
            overlay_filter: graph.overlay_filter("0:v", Some(1), None),
        },
        args.out.as_deref(),
    )
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let job_dir = args.job.parent().unwrap_or_else(|| Path::new("."));
    let json = std::fs::read_to_string(&args.job)
        .with_context(|| format!("read render job '{}'", args.job.display()))?;
    let spec: RenderJobFile = serde_json::from_str(&json).context("parse render job JSON")?;
    let resolve = |p: &Path| job_dir.join(p);

    let cfg = load_config(spec.config.as_deref().map(resolve).as_deref())?;
    let plan = Arc::new(read_plan(&resolve(&spec.plan))?);
    let library = load_library(
        spec.clips.as_deref().map(resolve).as_deref(),
        spec.clip_manifest.as_deref().map(resolve).as_deref(),
        &cfg,
    )?;
    let pool = storyreel::ClipPool::new(library.clips().to_vec())?;

    let font_file = if cfg.fonts.is_empty() {
        tracing::warn!("no caption fonts configured, ffmpeg picks its default font");
        None
    } else {
        Some(cfg.font_fallback().resolve()?.path)
    };

    let scratch = tempfile::Builder::new()
        .prefix("storyreel-banner-")
        .tempdir()
        .context("create banner scratch directory")?;
    let (bw, bh) = storyreel::banner_dimensions(plan.canvas, cfg.banner.height_fraction)?;
    let provider = spec.banner_image.as_deref().map(|p| storyreel::FileBanner {
        path: resolve(p),
    });
    let banner = storyreel::banner_or_placeholder(
        provider
            .as_ref()
            .map(|p| p as &dyn storyreel::BannerImageProvider),
        &spec.title,
        bw,
        bh,
    );
    let banner_path = scratch.path().join("banner.png");
    storyreel::assets::banner::save_png(&banner, &banner_path)?;

    let job = storyreel::EncodeJob {
        plan: plan.clone(),
        pool,
        narration: spec.narration.iter().map(|p| resolve(p)).collect(),
        banner_image: Some(banner_path),
        font_file,
        output: args.out.clone(),
    };
    let pipeline = storyreel::EncodePipeline::new(cfg.encode_settings());

    let id = args
        .out
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "job".to_string());
    let total_ms = plan.total_duration_ms;
    let (tx, rx) = mpsc::channel::<storyreel::ProgressEvent>();

    let (result, state) = std::thread::scope(|scope| {
        let watcher = scope.spawn(move || {
            let mut state = storyreel::JobState::new(id);
            for ev in rx {
                if let Err(e) = state.apply(&ev, total_ms) {
                    tracing::debug!(error = %e, "progress after terminal state ignored");
                }
                if let storyreel::ProgressEvent::Started { step } = &ev {
                    tracing::info!(job = %state.id, step = %step, "step started");
                }
            }
            state
        });
        let ctl = storyreel::RunControl {
            cancel: None,
            progress: Some(&tx),
        };
        let result = pipeline.run(&job, &ctl);
        drop(tx);
        let state = watcher.join();
        (result, state)
    });
    let mut state = state.map_err(|_| anyhow::anyhow!("progress watcher panicked"))?;

    match result {
        Ok(outcome) => {
            state.complete(&outcome.output)?;
            eprintln!("wrote {}", outcome.output.display());
            Ok(())
        }
        Err(e) => {
            state.fail(&e)?;
            tracing::error!(job = %state.id, "render failed");
            Err(e.into())
        }
    }
}
