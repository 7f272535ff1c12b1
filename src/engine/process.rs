//! Supervised child processes
//!
//! Every check process runs in its own process group so that a timeout or a
//! cancelled run takes down anything the tool spawned, not just the direct
//! child. Output is collected on helper threads so whatever was written
//! before a kill is still available.

use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// How long readers get to drain the pipes after a kill.
const DRAIN_GRACE: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub enum ProcessOutcome {
    Exited {
        status: ExitStatus,
        output: CapturedOutput,
    },
    TimedOut {
        elapsed: Duration,
        output: CapturedOutput,
    },
    Cancelled {
        output: CapturedOutput,
    },
}

#[derive(Debug, Default, Clone)]
pub struct CapturedOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CapturedOutput {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// stdout followed by stderr
    pub fn combined(&self) -> String {
        let mut text = self.stdout_text();
        let stderr = self.stderr_text();
        if !stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&stderr);
        }
        text
    }
}

struct Capture {
    buffer: Arc<Mutex<Vec<u8>>>,
    reader: Option<JoinHandle<()>>,
}

impl Capture {
    fn spawn<R: Read + Send + 'static>(pipe: Option<R>) -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let reader = pipe.map(|mut pipe| {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                let mut chunk = [0u8; 8192];
                loop {
                    match pipe.read(&mut chunk) {
                        Ok(0) => break,
                        Ok(n) => {
                            if let Ok(mut buf) = buffer.lock() {
                                buf.extend_from_slice(&chunk[..n]);
                            }
                        }
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(_) => break,
                    }
                }
            })
        });
        Self { buffer, reader }
    }

    fn is_drained(&self) -> bool {
        self.reader.as_ref().is_none_or(|r| r.is_finished())
    }

    fn snapshot(&self) -> Vec<u8> {
        self.buffer.lock().map(|b| b.clone()).unwrap_or_default()
    }

    /// Join the reader if it already finished, then take the buffer.
    fn finish(mut self) -> Vec<u8> {
        if let Some(reader) = self.reader.take()
            && reader.is_finished()
        {
            let _ = reader.join();
        }
        self.snapshot()
    }
}

/// Run `command` until it exits, `timeout` elapses or `cancel` fires.
///
/// `stdin` is written from a helper thread and the pipe closed afterwards;
/// without a payload the child gets a null stdin. Spawn errors are returned
/// as-is so callers can tell a missing executable apart.
pub fn run_supervised(
    mut command: Command,
    stdin: Option<Vec<u8>>,
    timeout: Duration,
    cancel: &CancellationToken,
) -> io::Result<ProcessOutcome> {
    command
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let started = Instant::now();
    let mut child = command.spawn()?;
    tracing::trace!("Spawned pid {} with timeout {:?}", child.id(), timeout);

    if let (Some(mut pipe), Some(payload)) = (child.stdin.take(), stdin) {
        // Dropping the pipe at the end of the thread closes the child's stdin
        thread::spawn(move || {
            let _ = pipe.write_all(&payload);
        });
    }

    let stdout = Capture::spawn(child.stdout.take());
    let stderr = Capture::spawn(child.stderr.take());

    let mut exited: Option<(ExitStatus, Instant)> = None;
    loop {
        if exited.is_none() {
            exited = child.try_wait()?.map(|status| (status, Instant::now()));
        }

        // Wait for the pipes to close too, so no trailing output is lost
        if let Some((status, at)) = exited {
            if stdout.is_drained() && stderr.is_drained() {
                return Ok(ProcessOutcome::Exited {
                    status,
                    output: CapturedOutput {
                        stdout: stdout.finish(),
                        stderr: stderr.finish(),
                    },
                });
            }
            // A background descendant still holds the pipes open
            if at.elapsed() >= DRAIN_GRACE {
                tracing::debug!("pid {} exited with its pipes still open, killing its group", child.id());
                kill_group(child.id());
                return Ok(ProcessOutcome::Exited {
                    status,
                    output: drain(stdout, stderr),
                });
            }
        }

        if cancel.is_cancelled() {
            tracing::debug!("Run cancelled, killing pid {}", child.id());
            terminate(&mut child);
            return Ok(ProcessOutcome::Cancelled {
                output: drain(stdout, stderr),
            });
        }

        let elapsed = started.elapsed();
        if exited.is_none() && elapsed >= timeout {
            tracing::debug!("Deadline of {:?} reached, killing pid {}", timeout, child.id());
            terminate(&mut child);
            return Ok(ProcessOutcome::TimedOut {
                elapsed,
                output: drain(stdout, stderr),
            });
        }

        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill the child's whole process group, then reap the child.
fn terminate(child: &mut Child) {
    kill_group(child.id());
    let _ = child.kill();
    let _ = child.wait();
}

/// SIGKILL every process in the group led by `pid`.
fn kill_group(pid: u32) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if let Ok(pgid) = i32::try_from(pid)
            && let Err(e) = killpg(Pid::from_raw(pgid), Signal::SIGKILL)
        {
            tracing::trace!("killpg({}) failed: {}", pgid, e);
        }
    }
    #[cfg(not(unix))]
    let _ = pid;
}

fn drain(stdout: Capture, stderr: Capture) -> CapturedOutput {
    let deadline = Instant::now() + DRAIN_GRACE;
    while !(stdout.is_drained() && stderr.is_drained()) && Instant::now() < deadline {
        thread::sleep(POLL_INTERVAL);
    }
    CapturedOutput {
        stdout: stdout.finish(),
        stderr: stderr.finish(),
    }
}

/// True when `pid` no longer exists or is only a zombie.
#[cfg(all(test, target_os = "linux"))]
pub(crate) fn is_gone(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Err(_) => true,
        Ok(stat) => {
            stat.rsplit_once(')')
                .and_then(|(_, rest)| rest.split_whitespace().next())
                == Some("Z")
        }
    }
}
