//! Helpers for running child processes with a deadline, cancellation and
//! bounded output.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

/// Why the child stopped running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessEnd {
    /// The child exited on its own.
    Exited,
    /// The deadline elapsed and the child was killed.
    TimedOut,
    /// The caller cancelled and the child was killed.
    Cancelled,
}

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub end: ProcessEnd,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.end == ProcessEnd::Exited && self.status.success()
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Stderr followed by stdout, the material inspected for quota failures.
    pub fn combined_text(&self) -> String {
        let mut combined = self.stderr_text();
        combined.push_str(&String::from_utf8_lossy(&self.stdout));
        combined
    }

    pub fn stdout_truncated_notice(&self, label: &str) -> String {
        if self.stdout_truncated > 0 {
            format!(
                "\n[{label} stdout truncated {} bytes]\n",
                self.stdout_truncated
            )
        } else {
            String::new()
        }
    }

    /// Exit code as text, or `signal` when the child was terminated by one.
    pub fn status_label(&self) -> String {
        self.status
            .code()
            .map(|code| code.to_string())
            .unwrap_or_else(|| "signal".to_string())
    }
}

/// How long the output readers may keep draining after the child was killed.
///
/// Descendants that escaped the process group can hold the pipes open
/// indefinitely; once this elapses the readers stop with what they captured.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Run a command until it exits, `timeout` elapses, or `cancel` fires.
///
/// Stdout and stderr are drained concurrently while the child runs.
/// `output_limit_bytes` bounds what is kept of each stream; bytes beyond it are
/// read and discarded so the child never blocks on a full pipe.
///
/// On unix the child leads its own process group, and a timeout or
/// cancellation kills the whole group so subprocesses spawned by the tool do
/// not outlive the attempt.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
pub async fn run_command(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
    cancel: &CancellationToken,
) -> io::Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            error!(err = %err, "failed to spawn command");
            return Err(err);
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("stderr was not piped"))?;

    let stop_reading = CancellationToken::new();
    let stdout_handle = tokio::spawn(read_stream_limited(
        stdout,
        output_limit_bytes,
        stop_reading.clone(),
    ));
    let stderr_handle = tokio::spawn(read_stream_limited(
        stderr,
        output_limit_bytes,
        stop_reading.clone(),
    ));

    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    let (status, end) = tokio::select! {
        status = child.wait() => (status?, ProcessEnd::Exited),
        () = &mut deadline => {
            warn!(timeout_secs = timeout.as_secs(), "command timed out, killing");
            (kill_process_tree(&mut child).await?, ProcessEnd::TimedOut)
        }
        () = cancel.cancelled() => {
            warn!("command cancelled, killing");
            (kill_process_tree(&mut child).await?, ProcessEnd::Cancelled)
        }
    };

    let drained = async {
        let stdout = join_output(stdout_handle).await?;
        let stderr = join_output(stderr_handle).await?;
        Ok::<_, io::Error>((stdout, stderr))
    };
    tokio::pin!(drained);

    // A child that exited may still have left descendants holding the pipes.
    let ((stdout, stdout_truncated), (stderr, stderr_truncated)) = if end == ProcessEnd::Exited {
        tokio::select! {
            output = &mut drained => output?,
            () = &mut deadline => {
                warn!("output still open at the deadline, keeping what was read");
                stop_reading.cancel();
                drained.await?
            }
            () = cancel.cancelled() => {
                stop_reading.cancel();
                drained.await?
            }
        }
    } else {
        tokio::select! {
            output = &mut drained => output?,
            () = tokio::time::sleep(DRAIN_GRACE) => {
                warn!("output still open after kill, keeping what was read");
                stop_reading.cancel();
                drained.await?
            }
        }
    };

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), ?end, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        end,
    })
}

/// Kill the child and, on unix, every process in its group, then reap it.
async fn kill_process_tree(child: &mut Child) -> io::Result<ExitStatus> {
    // The child is not reaped yet, so its pid still names our group.
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        kill_process_group(pid);
    }
    child.kill().await?;
    child.wait().await
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Ok(pgid) = i32::try_from(pid) else {
        return;
    };
    if let Err(err) = killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        debug!(err = %err, pgid, "failed to kill process group");
    }
}

async fn join_output(handle: JoinHandle<io::Result<(Vec<u8>, usize)>>) -> io::Result<(Vec<u8>, usize)> {
    match handle.await {
        Ok(result) => result,
        Err(_) => Err(io::Error::other("output reader task panicked")),
    }
}

async fn read_stream_limited<R: AsyncRead + Unpin>(
    mut reader: R,
    limit: usize,
    stop: CancellationToken,
) -> io::Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = tokio::select! {
            read = reader.read(&mut chunk) => read?,
            () = stop.cancelled() => break,
        };
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}
