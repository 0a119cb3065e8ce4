//! Supervised child processes: a timeout watchdog plus line-by-line output draining.
//!
//! Each invocation runs on two threads. The calling thread spawns the child and
//! drains its stdout into the [`LogSink`] as lines arrive. A scoped watchdog
//! thread borrows the child, waits for it to exit and for its output to close,
//! and kills the child's whole process tree once the timeout elapses. The scope
//! guarantees the watchdog never outlives [`ProcessSupervisor::run`] and that
//! the child is reaped before it returns.
//!
//! On Unix every child leads its own process group so that helpers it starts
//! (a shell stub, `npx`, ...) die with it on timeout.

use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{Span, debug, error, info, instrument, warn};
use wait_timeout::ChildExt;

use crate::core::command::Platform;
use crate::core::types::{CommandSpec, GenerationJobId};
use crate::error::{GeneratorError, Result};
use crate::io::log_sink::LogSink;

/// Upper bound on how long a watchdog waits before re-checking its flags.
pub const WATCHDOG_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Process-wide request to stop waiting on children.
///
/// Triggering it interrupts every watchdog that is currently waiting. The
/// children themselves are left running and reaped once their output closes.
/// Once triggered, no new child is started.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    triggered: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

/// One command to run for a job.
#[derive(Debug, Clone, Copy)]
pub struct InvocationRequest<'a> {
    pub job: &'a GenerationJobId,
    /// Must already exist; never created here.
    pub workdir: &'a Path,
    pub command: &'a CommandSpec,
    pub timeout: Duration,
}

/// How an invocation ended.
///
/// Informational only: a non-zero exit or a timeout kill is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvocationOutcome {
    pub pid: u32,
    /// `None` when the child was terminated by a signal.
    pub exit_code: Option<i32>,
    /// The watchdog killed the child after the timeout elapsed.
    pub timed_out: bool,
    /// Number of stdout lines forwarded to the sink.
    pub lines: usize,
}

impl InvocationOutcome {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

#[derive(Debug)]
enum WatchdogVerdict {
    Exited(ExitStatus),
    TimedOut(ExitStatus),
    Aborted,
    Interrupted,
}

/// Runs commands with a hard timeout and streams their stdout to a sink.
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    platform: Platform,
    shutdown: ShutdownSignal,
}

impl ProcessSupervisor {
    pub fn new(platform: Platform, shutdown: ShutdownSignal) -> Self {
        Self { platform, shutdown }
    }

    /// Run `request.command` in `request.workdir`, forwarding each stdout line to `sink`.
    ///
    /// Returns once stdout is closed and the child has been reaped. Stderr is
    /// discarded. A timeout kill is reported through the outcome, not as an error.
    #[instrument(skip_all, fields(job = %request.job, timeout_secs = request.timeout.as_secs()))]
    pub fn run(
        &self,
        request: &InvocationRequest<'_>,
        sink: &dyn LogSink,
    ) -> Result<InvocationOutcome> {
        let invocation = self.platform.invocation(request.command);
        info!(
            command = %invocation,
            workdir = %request.workdir.display(),
            "running command"
        );

        if self.shutdown.is_triggered() {
            warn!("shutdown requested, not starting command");
            return Err(GeneratorError::WatchdogInterrupted {
                job: request.job.clone(),
            });
        }

        let mut cmd = Command::new(invocation.program());
        cmd.args(invocation.args())
            .current_dir(request.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        debug!("spawning child process");
        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                error!(err = %e, program = invocation.program(), "failed to spawn command");
                return Err(GeneratorError::Spawn {
                    program: invocation.program().to_string(),
                    source: e,
                });
            }
        };
        let pid = child.id();
        debug!(pid, "child process started");

        let Some(stdout) = child.stdout.take() else {
            kill_and_reap(&mut child);
            return Err(io::Error::other("stdout was not piped").into());
        };

        let abort = AtomicBool::new(false);
        let output_closed = AtomicBool::new(false);
        let shutdown = &self.shutdown;
        let timeout = request.timeout;
        let span = Span::current();

        let scoped = thread::scope(|scope| {
            let watchdog = thread::Builder::new()
                .name(format!("watchdog-{}", request.job))
                .spawn_scoped(scope, || {
                    let _entered = span.enter();
                    watch(&mut child, timeout, &output_closed, &abort, shutdown)
                })?;

            let drained = drain_lines(stdout, request.job, sink);
            if drained.is_err() {
                abort.store(true, Ordering::SeqCst);
            }
            output_closed.store(true, Ordering::SeqCst);
            Ok::<_, io::Error>((drained, watchdog.join()))
        });

        let (drained, joined) = match scoped {
            Ok(parts) => parts,
            Err(e) => {
                error!(err = %e, "failed to start watchdog thread");
                kill_and_reap(&mut child);
                return Err(e.into());
            }
        };

        let verdict = match joined {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(e)) => {
                error!(err = %e, "watchdog failed while waiting for process");
                kill_and_reap(&mut child);
                return Err(e.into());
            }
            Err(_) => {
                error!("watchdog thread panicked");
                kill_and_reap(&mut child);
                return Err(GeneratorError::WatchdogPanicked);
            }
        };

        let (status, timed_out) = match verdict {
            WatchdogVerdict::Exited(status) => (status, false),
            WatchdogVerdict::TimedOut(status) => (status, true),
            WatchdogVerdict::Aborted => {
                let err = drained
                    .err()
                    .unwrap_or_else(|| io::Error::other("output drain aborted"));
                error!(err = %err, "failed to read process output");
                return Err(err.into());
            }
            WatchdogVerdict::Interrupted => {
                // Interruption never kills; wait for the child to finish on its own.
                if let Err(e) = child.wait() {
                    warn!(err = %e, "failed to reap interrupted child");
                }
                return Err(GeneratorError::WatchdogInterrupted {
                    job: request.job.clone(),
                });
            }
        };

        let lines = drained?;
        debug!(exit_code = ?status.code(), timed_out, lines, "command finished");
        Ok(InvocationOutcome {
            pid,
            exit_code: status.code(),
            timed_out,
            lines,
        })
    }
}

/// Wait until `child` has exited and its output is closed, the timeout
/// elapses, the drain loop aborts, or a shutdown is requested.
///
/// Output can outlive the child when a descendant inherited stdout, so the
/// deadline keeps running until both are done. A timeout that saturates
/// `Instant` means no deadline.
fn watch(
    child: &mut Child,
    timeout: Duration,
    output_closed: &AtomicBool,
    abort: &AtomicBool,
    shutdown: &ShutdownSignal,
) -> io::Result<WatchdogVerdict> {
    let deadline = Instant::now().checked_add(timeout);
    let mut exited: Option<ExitStatus> = None;
    loop {
        if abort.load(Ordering::SeqCst) {
            debug!("drain aborted, killing child");
            kill_and_reap(child);
            return Ok(WatchdogVerdict::Aborted);
        }
        if let Some(status) = exited {
            if output_closed.load(Ordering::SeqCst) {
                return Ok(WatchdogVerdict::Exited(status));
            }
        } else if shutdown.is_triggered() {
            error!("unable to execute process successfully: watchdog interrupted");
            return Ok(WatchdogVerdict::Interrupted);
        }

        let now = Instant::now();
        let slice = match deadline {
            Some(deadline) if now >= deadline => {
                warn!(timeout_secs = timeout.as_secs(), "command timed out, killing");
                kill_tree(child)?;
                let status = match exited {
                    Some(status) => status,
                    None => child.wait()?,
                };
                return Ok(WatchdogVerdict::TimedOut(status));
            }
            Some(deadline) => (deadline - now).min(WATCHDOG_POLL_INTERVAL),
            None => WATCHDOG_POLL_INTERVAL,
        };

        if exited.is_some() {
            thread::sleep(slice);
        } else if let Some(status) = child.wait_timeout(slice)? {
            debug!(exit_code = ?status.code(), "child exited, waiting for output to close");
            exited = Some(status);
        }
    }
}

/// Forward each line of `reader` to `sink` until end of input.
///
/// Line terminators are stripped and invalid UTF-8 is replaced.
fn drain_lines<R: Read>(reader: R, job: &GenerationJobId, sink: &dyn LogSink) -> io::Result<usize> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut count = 0usize;
    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            break;
        }
        let line = String::from_utf8_lossy(strip_line_ending(&buf));
        debug!("{line}");
        sink.add_log(job, &line);
        count += 1;
    }
    Ok(count)
}

fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Kill `child` together with every process in its group.
#[cfg(unix)]
fn kill_tree(child: &mut Child) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let pgid = i32::try_from(child.id()).map_err(io::Error::other)?;
    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        Ok(()) => Ok(()),
        // Group already empty; only an unreaped child can remain.
        Err(Errno::ESRCH) => child.kill(),
        Err(e) => Err(e.into()),
    }
}

/// Kill `child` together with its descendants.
#[cfg(windows)]
fn kill_tree(child: &mut Child) -> io::Result<()> {
    let pid = child.id().to_string();
    let killed = Command::new("taskkill")
        .args(["/T", "/F", "/PID", pid.as_str()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match killed {
        Ok(status) if status.success() => Ok(()),
        _ => child.kill(),
    }
}

#[cfg(not(any(unix, windows)))]
fn kill_tree(child: &mut Child) -> io::Result<()> {
    child.kill()
}

fn kill_and_reap(child: &mut Child) {
    if let Err(e) = kill_tree(child) {
        warn!(err = %e, "failed to kill child process");
    }
    if let Err(e) = child.wait() {
        warn!(err = %e, "failed to reap child process");
    }
}
