//! Encode runner: executes one rendered command pipeline, streams the
//! encoder's diagnostic output, extracts progress, and returns the exit
//! outcome.
//!
//! The pipeline may chain several external commands with and-then
//! semantics; the runner is indifferent to this and treats the whole
//! rendered string as a single unit whose exit code is the last command's
//! exit code.  It never touches job state itself: the process id and
//! progress percentages are reported through [`RunnerHooks`], and failures
//! are signalled to the caller purely via the exit code.

use std::path::Path;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::probe;
use crate::tools::ToolRegistry;

/// Bound on the retained diagnostic tail.
const TAIL_MAX_BYTES: usize = 2000;

/// Minimum delay between two progress reports.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(2);

/// Callbacks through which the runner reports into the owning job.
pub struct RunnerHooks {
    on_pid: Box<dyn Fn(u32) + Send + Sync>,
    on_progress: Box<dyn Fn(u8) + Send + Sync>,
}

impl RunnerHooks {
    pub fn new(
        on_pid: impl Fn(u32) + Send + Sync + 'static,
        on_progress: impl Fn(u8) + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_pid: Box::new(on_pid),
            on_progress: Box::new(on_progress),
        }
    }

    /// Hooks that discard every report.
    pub fn noop() -> Self {
        Self::new(|_| {}, |_| {})
    }
}

/// Result of one pipeline execution.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Exit code of the last command in the pipeline; non-zero is failure.
    pub exit_code: i32,
    /// Bounded tail of the diagnostic stream, for failure reporting.
    pub stderr_tail: String,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes rendered command pipelines with progress tracking.
pub struct EncodeRunner<'a> {
    tools: &'a ToolRegistry,
    progress_interval: Duration,
}

impl<'a> EncodeRunner<'a> {
    pub fn new(tools: &'a ToolRegistry) -> Self {
        Self {
            tools,
            progress_interval: PROGRESS_INTERVAL,
        }
    }

    /// Override the progress throttle interval (tests).
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Run a pipeline against `input`, probing the source duration first so
    /// the `time=` tokens in the diagnostic stream can be turned into a
    /// percentage.  A failed probe disables progress reporting but the
    /// encode still runs.
    pub async fn run(
        &self,
        command: &str,
        input: &Path,
        hooks: &RunnerHooks,
    ) -> rf_core::Result<RunOutcome> {
        let total_duration = probe::duration_or_zero(self.tools, input).await;
        self.run_with_duration(command, total_duration, hooks).await
    }

    /// Run a pipeline with a known source duration in seconds.
    pub async fn run_with_duration(
        &self,
        command: &str,
        total_duration: f64,
        hooks: &RunnerHooks,
    ) -> rf_core::Result<RunOutcome> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| rf_core::Error::tool("sh", format!("failed to spawn pipeline: {e}")))?;

        // Report the pid before streaming so an out-of-band cancellation
        // can find the process while the encode is still running.
        if let Some(pid) = child.id() {
            (hooks.on_pid)(pid);
            tracing::debug!(pid, "encoder pipeline started");
        }

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| rf_core::Error::Internal("child stderr not captured".into()))?;

        let mut lines = BufReader::new(stderr).lines();
        let mut tail = String::new();
        let mut last_reported: u8 = 0;
        let mut last_update: Option<Instant> = None;

        while let Ok(Some(line)) = lines.next_line().await {
            push_tail(&mut tail, &line);

            let Some(elapsed) = parse_time_token(&line) else {
                continue;
            };
            if total_duration <= 0.0 {
                continue;
            }

            // 100 is reserved for confirmed completion.
            let pct = ((elapsed / total_duration) * 100.0).clamp(0.0, 99.0) as u8;
            let due = last_update.map_or(true, |t| t.elapsed() >= self.progress_interval);
            if pct > last_reported && due {
                (hooks.on_progress)(pct);
                last_reported = pct;
                last_update = Some(Instant::now());
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| rf_core::Error::tool("sh", format!("failed to wait for pipeline: {e}")))?;

        let exit_code = status.code().unwrap_or(-1);
        if exit_code != 0 {
            tracing::error!(exit_code, "encoder pipeline failed; tail:\n{}", tail.trim_end());
        }

        Ok(RunOutcome {
            exit_code,
            stderr_tail: tail,
        })
    }
}

/// Extract the elapsed seconds from a recurring `time=HH:MM:SS.cc`
/// diagnostic token.
fn parse_time_token(line: &str) -> Option<f64> {
    static TIME_RE: OnceLock<Regex> = OnceLock::new();
    let re = TIME_RE
        .get_or_init(|| Regex::new(r"time=(\d{2,}):(\d{2}):(\d{2}(?:\.\d+)?)").expect("valid regex"));

    let caps = re.captures(line)?;
    let hours: f64 = caps[1].parse().ok()?;
    let minutes: f64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Append a line to the tail buffer, keeping only the last
/// [`TAIL_MAX_BYTES`] of it.
fn push_tail(tail: &mut String, line: &str) {
    tail.push_str(line);
    tail.push('\n');

    if tail.len() > TAIL_MAX_BYTES {
        let mut cut = tail.len() - TAIL_MAX_BYTES;
        while !tail.is_char_boundary(cut) {
            cut += 1;
        }
        tail.drain(..cut);
    }
}
