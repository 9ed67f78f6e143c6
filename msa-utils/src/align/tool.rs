use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::error::{MsaError, Result};

/// 外部多序列比对程序：`<program> <align_flag> <in> <output_flag> <out> [extra...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignTool {
    pub program: PathBuf,
    pub align_flag: String,
    pub output_flag: String,
    pub extra_args: Vec<String>,
}

impl Default for AlignTool {
    fn default() -> Self {
        Self::muscle("muscle")
    }
}

impl AlignTool {
    /// MUSCLE 5 style command line.
    pub fn muscle<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
            align_flag: "-align".to_string(),
            output_flag: "-output".to_string(),
            extra_args: Vec::new(),
        }
    }

    pub fn args(&self, input: &Path, output: &Path) -> Vec<String> {
        let mut args = vec![
            self.align_flag.clone(),
            input.display().to_string(),
            self.output_flag.clone(),
            output.display().to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// Full command line, program first.
    pub fn command_line(&self, input: &Path, output: &Path) -> Vec<String> {
        let mut v = vec![self.program.display().to_string()];
        v.extend(self.args(input, output));
        v
    }
}

/// Cloneable cancellation flag shared between the caller and a running wait.
#[derive(Debug, Clone, Default)]
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

/// Bounded wait with exponential back-off between polls.
#[derive(Debug, Clone, Copy)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub max_poll_interval: Duration,
}

/// Polls never spin: every interval is at least this long.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

impl WaitPolicy {
    /// Sleep intervals between polls: `poll_interval` doubling up to
    /// `max_poll_interval`, both clamped to `MIN_POLL_INTERVAL`.
    pub fn intervals(&self) -> impl Iterator<Item = Duration> {
        let max = self.max_poll_interval.max(MIN_POLL_INTERVAL);
        let first = self.poll_interval.clamp(MIN_POLL_INTERVAL, max);
        std::iter::successors(Some(first), move |&d| Some((d * 2).min(max)))
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            poll_interval: Duration::from_millis(100),
            max_poll_interval: Duration::from_secs(5),
        }
    }
}

/// 启动比对程序，stdout/stderr 重定向到 `log_path`
pub fn spawn(tool: &AlignTool, input: &Path, output: &Path, log_path: &Path) -> Result<Child> {
    let log = File::create(log_path)?;
    let log_err = log.try_clone()?;
    info!("running {}", tool.command_line(input, output).join(" "));
    let child = Command::new(&tool.program)
        .args(tool.args(input, output))
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_err))
        .spawn()?;
    Ok(child)
}

/// 等待子进程退出。超时或取消时杀掉子进程并删除不完整的输出文件。
pub fn wait(
    child: &mut Child,
    output: &Path,
    policy: WaitPolicy,
    cancel: Option<&CancelToken>,
) -> Result<ExitStatus> {
    let start = Instant::now();
    let mut intervals = policy.intervals();
    loop {
        if let Some(status) = child.try_wait()? {
            debug!("alignment tool exited after {:?}: {}", start.elapsed(), status);
            return Ok(status);
        }
        if cancel.map_or(false, CancelToken::is_cancelled) {
            abort(child, output);
            return Err(MsaError::Cancelled);
        }
        let waited = start.elapsed();
        if waited >= policy.timeout {
            abort(child, output);
            return Err(MsaError::MissingOutputTimeout { path: output.to_path_buf(), waited });
        }
        debug!("waiting for {} ({:?} elapsed)", output.display(), waited);
        let interval = intervals.next().unwrap_or(MIN_POLL_INTERVAL);
        std::thread::sleep(interval.min(policy.timeout - waited));
    }
}

fn abort(child: &mut Child, output: &Path) {
    if let Err(e) = child.kill() {
        warn!("failed to kill alignment tool (pid {}): {}", child.id(), e);
    }
    let _ = child.wait();
    if output.exists() {
        if let Err(e) = std::fs::remove_file(output) {
            warn!("cannot remove partial output '{}': {}", output.display(), e);
        }
    }
}
