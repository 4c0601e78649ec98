//! Bounded solver execution
//!
//! Runs one solver invocation as a child process, captures its output and
//! enforces a wall-clock deadline. Nothing in here returns an error: every
//! failure mode (spawn failure, watchdog expiry, crash) becomes a result.

use crate::descriptor::BenchmarkDescriptor;
use crate::solver::SolverCommand;
use parking_lot::Mutex;
use solverbench_storage::RawStatus;
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long output pipes may stay open once the solver is gone
const PIPE_GRACE: Duration = Duration::from_millis(500);

/// Outcome of one bounded solver run
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub descriptor: Arc<BenchmarkDescriptor>,
    pub raw_status: RawStatus,
    pub stdout: String,
    pub stderr_text: String,
    pub elapsed_seconds: f64,

    /// Harness-side explanation (spawn failure, watchdog kill, odd output)
    pub diagnostic: Option<String>,
}

impl ExecutionResult {
    /// Comment persisted with the scored result
    pub fn comment(&self) -> String {
        let stderr = self.stderr_text.trim();
        match (&self.diagnostic, stderr.is_empty()) {
            (Some(diagnostic), true) => diagnostic.clone(),
            (Some(diagnostic), false) => format!("{}\n{}", diagnostic, stderr),
            (None, _) => stderr.to_string(),
        }
    }
}

struct Captured {
    stdout: String,
    stderr: String,
    elapsed: Duration,
    timed_out: bool,
}

/// Run `command` for `descriptor` and classify what it printed
pub fn execute(descriptor: Arc<BenchmarkDescriptor>, command: &SolverCommand) -> ExecutionResult {
    match &descriptor.logic {
        Some(logic) => debug!("{} ({}): {}", descriptor.display_name, logic, command.display()),
        None => debug!("{}: {}", descriptor.display_name, command.display()),
    }

    let captured = match run_bounded(command) {
        Ok(captured) => captured,
        Err(e) => {
            warn!("failed to run '{}': {}", command.program, e);
            return ExecutionResult {
                descriptor,
                raw_status: RawStatus::Error,
                stdout: String::new(),
                stderr_text: String::new(),
                elapsed_seconds: 0.0,
                diagnostic: Some(format!("failed to run '{}': {}", command.program, e)),
            };
        }
    };

    let (raw_status, diagnostic) = if captured.timed_out {
        (
            RawStatus::Timeout,
            Some(format!(
                "killed by watchdog after {:.1}s",
                command.deadline.as_secs_f64()
            )),
        )
    } else {
        let classification = command.classifier.classify(&captured.stdout);
        (classification.status, classification.diagnostic)
    };

    ExecutionResult {
        descriptor,
        raw_status,
        stdout: captured.stdout,
        stderr_text: captured.stderr,
        elapsed_seconds: captured.elapsed.as_secs_f64(),
        diagnostic,
    }
}

fn run_bounded(command: &SolverCommand) -> std::io::Result<Captured> {
    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let started_at = Instant::now();
    let mut child = cmd.spawn()?;
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let (elapsed, timed_out) = loop {
        match child.try_wait() {
            Ok(Some(_)) => {
                let elapsed = started_at.elapsed();
                // descendants left behind still hold the pipes open
                kill_group(&child);
                break (elapsed, false);
            }
            Ok(None) => {
                let elapsed = started_at.elapsed();
                if elapsed >= command.deadline {
                    terminate(&mut child);
                    break (elapsed, true);
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                terminate(&mut child);
                return Err(e);
            }
        }
    };

    let drained_by = Instant::now() + PIPE_GRACE;
    Ok(Captured {
        stdout: collect(stdout, drained_by),
        stderr: collect(stderr, drained_by),
        elapsed,
        timed_out,
    })
}

/// Kill the child (and its process group) and reap it
fn terminate(child: &mut Child) {
    kill_group(child);
    let _ = child.kill();
    if let Err(e) = child.wait() {
        warn!("failed to reap solver process {}: {}", child.id(), e);
    }
}

/// SIGKILL everything in the child's process group
///
/// A group id cannot be handed out again while any member of the group lives.
fn kill_group(child: &Child) {
    #[cfg(unix)]
    {
        let _ = Command::new("sh")
            .args(["-c", &format!("kill -KILL -- -{} 2>/dev/null", child.id())])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
    }
    #[cfg(not(unix))]
    let _ = child;
}

/// Output read so far by a pipe reader thread
struct Drain {
    buf: Arc<Mutex<Vec<u8>>>,
    handle: JoinHandle<()>,
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Drain> {
    pipe.map(|mut pipe| {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let handle = thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => sink.lock().extend_from_slice(&chunk[..n]),
                }
            }
        });
        Drain { buf, handle }
    })
}

/// Wait for a reader until `until`, then take whatever it has read
///
/// A process that escaped the group kill may keep the pipe open forever;
/// its reader thread is left behind rather than blocking the run.
fn collect(drain: Option<Drain>, until: Instant) -> String {
    let Some(drain) = drain else {
        return String::new();
    };
    while !drain.handle.is_finished() && Instant::now() < until {
        thread::sleep(POLL_INTERVAL);
    }
    if drain.handle.is_finished() {
        let _ = drain.handle.join();
    } else {
        warn!("solver output pipe still open after exit, keeping partial output");
    }
    let bytes = drain.buf.lock();
    String::from_utf8_lossy(&bytes).into_owned()
}
