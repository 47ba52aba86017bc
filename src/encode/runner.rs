use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::foundation::error::{StoryreelError, StoryreelResult};

/// How long a killed process's stderr may keep draining before it is reported.
const KILL_DRAIN_GRACE: Duration = Duration::from_millis(250);

/// One subprocess invocation: program, arguments and the hard timeout it runs under.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandSpec {
    /// Pipeline step name used in logs, progress events and errors.
    pub step: String,
    pub program: String,
    pub args: Vec<OsString>,
    pub timeout: Duration,
    pub current_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(step: impl Into<String>, program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            step: step.into(),
            program: program.into(),
            args: Vec::new(),
            timeout,
            current_dir: None,
        }
    }

    pub fn arg(mut self, a: impl Into<OsString>) -> Self {
        self.args.push(a.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Arguments as lossy UTF-8, for logs and tests.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// Shell-like rendering of the command line.
    pub fn display(&self) -> String {
        let mut s = self.program.clone();
        for a in self.args_lossy() {
            s.push(' ');
            if a.contains(' ') || a.is_empty() {
                s.push('\'');
                s.push_str(&a);
                s.push('\'');
            } else {
                s.push_str(&a);
            }
        }
        s
    }
}

/// Cooperative cancellation handle shared between a caller and a running job.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress reported while a job's subprocesses run.
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    /// A step's subprocess was spawned.
    Started { step: String },
    /// ffmpeg reported its output position (from `-progress pipe:1`).
    Progress { step: String, out_time_ms: f64 },
    /// A step's subprocess exited successfully.
    Finished { step: String },
}

/// Per-call control surface: optional cancellation and an optional progress channel.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunControl<'a> {
    pub cancel: Option<&'a CancelToken>,
    pub progress: Option<&'a Sender<ProgressEvent>>,
}

impl<'a> RunControl<'a> {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(CancelToken::is_cancelled)
    }

    pub(crate) fn emit(&self, ev: ProgressEvent) {
        if let Some(tx) = self.progress {
            // A dropped receiver only means nobody is listening.
            let _ = tx.send(ev);
        }
    }
}

/// Output of a successful subprocess.
#[derive(Clone, Debug, Default)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Runs subprocesses to completion under a hard timeout.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, spec: &CommandSpec, ctl: &RunControl<'_>) -> StoryreelResult<CommandOutput>;
}

/// [`ProcessRunner`] backed by `std::process`.
#[derive(Clone, Debug)]
pub struct SystemRunner {
    poll_interval: Duration,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(25),
        }
    }
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

impl ProcessRunner for SystemRunner {
    #[tracing::instrument(skip_all, fields(step = %spec.step, program = %spec.program))]
    fn run(&self, spec: &CommandSpec, ctl: &RunControl<'_>) -> StoryreelResult<CommandOutput> {
        if ctl.is_cancelled() {
            return Err(StoryreelError::Cancelled {
                program: spec.program.clone(),
            });
        }
        tracing::debug!(cmd = %spec.display(), timeout = ?spec.timeout, "spawning");

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &spec.current_dir {
            cmd.current_dir(dir);
        }
        let mut child = cmd.spawn().map_err(|e| StoryreelError::Encoding {
            step: spec.step.clone(),
            status: "not started".to_string(),
            stderr: format!("failed to spawn '{}': {e}", spec.program),
        })?;
        ctl.emit(ProgressEvent::Started {
            step: spec.step.clone(),
        });

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| StoryreelError::evaluation("failed to open subprocess stdout"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| StoryreelError::evaluation("failed to open subprocess stderr"))?;

        let progress_tx = ctl.progress.cloned();
        let step = spec.step.clone();
        let stdout_drain = std::thread::spawn(move || drain_stdout(stdout, &step, progress_tx));
        let stderr_buf = Arc::new(Mutex::new(Vec::new()));
        let stderr_drain: JoinHandle<std::io::Result<()>> = {
            let buf = Arc::clone(&stderr_buf);
            std::thread::spawn(move || drain_into(&mut stderr, &buf))
        };

        let started = Instant::now();
        let status = loop {
            let polled = child.try_wait().map_err(|e| {
                StoryreelError::evaluation(format!("failed to poll '{}': {e}", spec.program))
            })?;
            if let Some(status) = polled {
                break status;
            }
            if ctl.is_cancelled() {
                kill_and_reap(&mut child);
                let stderr = stderr_after_kill(&stderr_buf, &stderr_drain);
                tracing::warn!(step = %spec.step, %stderr, "subprocess cancelled");
                return Err(StoryreelError::Cancelled {
                    program: spec.program.clone(),
                });
            }
            if started.elapsed() >= spec.timeout {
                kill_and_reap(&mut child);
                let stderr = stderr_after_kill(&stderr_buf, &stderr_drain);
                tracing::warn!(step = %spec.step, timeout = ?spec.timeout, "subprocess timed out");
                return Err(StoryreelError::Timeout {
                    program: spec.program.clone(),
                    after: spec.timeout,
                    stderr,
                });
            }
            std::thread::sleep(self.poll_interval);
        };

        let stdout = stdout_drain
            .join()
            .map_err(|_| StoryreelError::evaluation("stdout drain thread panicked"))?
            .map_err(|e| StoryreelError::evaluation(format!("stdout read failed: {e}")))?;
        stderr_drain
            .join()
            .map_err(|_| StoryreelError::evaluation("stderr drain thread panicked"))?
            .map_err(|e| StoryreelError::evaluation(format!("stderr read failed: {e}")))?;
        let stderr = captured_text(&stderr_buf);

        if !status.success() {
            return Err(StoryreelError::Encoding {
                step: spec.step.clone(),
                status: status.to_string(),
                stderr,
            });
        }

        tracing::debug!(step = %spec.step, elapsed = ?started.elapsed(), "subprocess finished");
        ctl.emit(ProgressEvent::Finished {
            step: spec.step.clone(),
        });
        Ok(CommandOutput { stdout, stderr })
    }
}

fn kill_and_reap(child: &mut Child) {
    // The process may already have exited between the poll and the kill.
    let _ = child.kill();
    let _ = child.wait();
}

fn drain_into(src: &mut impl Read, buf: &Mutex<Vec<u8>>) -> std::io::Result<()> {
    let mut chunk = [0u8; 4096];
    loop {
        let n = match src.read(&mut chunk) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        buf.lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend_from_slice(&chunk[..n]);
    }
}

fn captured_text(buf: &Mutex<Vec<u8>>) -> String {
    let bytes = buf.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    String::from_utf8_lossy(&bytes).trim().to_string()
}

/// Stderr captured from a killed process.
///
/// Grandchildren may still hold the pipe open, so the drain is given a short grace period and
/// whatever arrived by then is returned.
fn stderr_after_kill(buf: &Mutex<Vec<u8>>, drain: &JoinHandle<std::io::Result<()>>) -> String {
    let deadline = Instant::now() + KILL_DRAIN_GRACE;
    while !drain.is_finished() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    captured_text(buf)
}

fn drain_stdout(
    stdout: impl Read,
    step: &str,
    progress: Option<Sender<ProgressEvent>>,
) -> std::io::Result<Vec<u8>> {
    let mut reader = BufReader::new(stdout);
    let mut all = Vec::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        let n = reader.read_until(b'\n', &mut line)?;
        if n == 0 {
            break;
        }
        all.extend_from_slice(&line);
        if let Some(tx) = progress.as_ref()
            && let Some(out_time_ms) = parse_progress_line(&String::from_utf8_lossy(&line))
        {
            let _ = tx.send(ProgressEvent::Progress {
                step: step.to_string(),
                out_time_ms,
            });
        }
    }
    Ok(all)
}

/// Parse one `key=value` line of ffmpeg's `-progress` output into an output position in ms.
///
/// ffmpeg reports `out_time_us` and (confusingly, also in microseconds) `out_time_ms`.
pub fn parse_progress_line(line: &str) -> Option<f64> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        "out_time_us" | "out_time_ms" => {
            let us = value.trim().parse::<i64>().ok()?;
            (us >= 0).then(|| us as f64 / 1000.0)
        }
        _ => None,
    }
}

/// Return `true` when `program` can be invoked from `PATH`.
pub fn is_program_on_path(program: &str) -> bool {
    Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    is_program_on_path("ffmpeg")
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> StoryreelResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/runner.rs"]
mod tests;
