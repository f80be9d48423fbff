//! Read-only invocation of optional external enumeration tools
//! (`tar`, `7z`, `git`) with hard timeouts and no stdin (§5, §6, §9).
//!
//! Absence or failure of a tool is always a first-class `Unavailable`
//! result, never a panic or process-level failure.

use std::io::Read;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Outcome of a single bounded external-tool invocation.
#[derive(Clone, Debug)]
pub enum ToolOutcome {
    /// The tool ran to completion within the timeout. `stdout` is
    /// captured as raw bytes; the caller decides how to interpret it.
    Ran { success: bool, stdout: Vec<u8> },
    /// The tool could not be found (`ENOENT`) or otherwise failed to
    /// spawn.
    NotFound,
    /// The tool was spawned but did not finish within the timeout and
    /// was killed.
    TimedOut,
}

impl ToolOutcome {
    pub fn is_available(&self) -> bool {
        !matches!(self, ToolOutcome::NotFound)
    }

    pub fn succeeded(&self) -> bool {
        matches!(self, ToolOutcome::Ran { success: true, .. })
    }

    pub fn stdout_text(&self) -> String {
        match self {
            ToolOutcome::Ran { stdout, .. } => String::from_utf8_lossy(stdout).into_owned(),
            _ => String::new(),
        }
    }
}

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Run `cmd` with `args`, closing stdin, capturing stdout, and
/// enforcing `timeout` by polling `try_wait` (no extra crate needed
/// for process timeouts — §5 "suspension points").
pub fn run_bounded(cmd: &str, args: &[&str], timeout: Duration) -> ToolOutcome {
    let mut child = match Command::new(cmd)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return ToolOutcome::NotFound,
        Err(_) => return ToolOutcome::NotFound,
    };

    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let mut stdout = Vec::new();
                if let Some(mut out) = child.stdout.take() {
                    let _ = out.read_to_end(&mut stdout);
                }
                return ToolOutcome::Ran {
                    success: status.success(),
                    stdout,
                };
            }
            Ok(None) => {
                if start.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return ToolOutcome::TimedOut;
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(_) => return ToolOutcome::NotFound,
        }
    }
}

/// Timeout used for full enumeration calls (`tar -tf`, `7z l`,
/// `git rev-parse` et al.) — 10s per §3.3.
pub const ENUMERATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout used for availability probes (`tar --help`, `git --version`)
/// — 3s per §6.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Probe whether `cmd` is available by running it with `probe_args`
/// and a 3s timeout, treating not-found/timeout/unknown exit as
/// unavailable (§6).
pub fn probe_available(cmd: &str, probe_args: &[&str]) -> bool {
    matches!(
        run_bounded(cmd, probe_args, PROBE_TIMEOUT),
        ToolOutcome::Ran { .. }
    )
}
