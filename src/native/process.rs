use std::io::ErrorKind;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Child;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::constants::CAPTURE_GRACE;

/// What a supervised child left behind.
#[derive(Debug)]
pub struct Finished {
    /// `None` when the deadline fired and the process group was killed.
    pub status: Option<ExitStatus>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl Finished {
    pub fn timed_out(&self) -> bool {
        self.status.is_none()
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.status.and_then(|status| status.code())
    }

    pub fn signal(&self) -> Option<i32> {
        self.status.and_then(|status| status.signal())
    }
}

#[derive(Default)]
struct Sink {
    bytes: Vec<u8>,
    truncated: bool,
}

/// Drains a pipe into a shared buffer so that whatever arrived before a kill
/// is still readable.
struct Capture {
    sink: Arc<Mutex<Sink>>,
    limit: usize,
    task: JoinHandle<()>,
}

impl Capture {
    fn spawn<R>(mut reader: R, limit: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let sink = Arc::new(Mutex::new(Sink::default()));
        let shared = sink.clone();

        let task = tokio::spawn(async move {
            let mut chunk = [0u8; 8192];
            loop {
                match reader.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => {
                        // Past the limit the pipe is still drained so the writer never blocks.
                        let mut sink = shared.lock().unwrap_or_else(PoisonError::into_inner);
                        let room = limit.saturating_sub(sink.bytes.len());
                        if n > room {
                            sink.truncated = true;
                        }
                        sink.bytes.extend_from_slice(&chunk[..n.min(room)]);
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "Pipe read failed");
                        break;
                    }
                }
            }
        });

        Capture { sink, limit, task }
    }

    async fn finish(mut self) -> String {
        if tokio::time::timeout(CAPTURE_GRACE, &mut self.task)
            .await
            .is_err()
        {
            tracing::warn!("Pipe still open after process exit, keeping partial output");
            self.task.abort();
        }

        let sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        if !sink.truncated {
            return String::from_utf8_lossy(&sink.bytes).into_owned();
        }

        tracing::warn!(limit = self.limit, "Output cap reached, the rest was discarded");
        let kept = complete_prefix_len(&sink.bytes);
        String::from_utf8_lossy(&sink.bytes[..kept]).into_owned()
    }
}

/// Length of `bytes` without a trailing UTF-8 sequence that the cap cut short.
fn complete_prefix_len(bytes: &[u8]) -> usize {
    let tail = bytes.len().saturating_sub(3);
    let Some(lead) = (tail..bytes.len()).rev().find(|&i| bytes[i] & 0xC0 != 0x80) else {
        return bytes.len();
    };

    match std::str::from_utf8(&bytes[lead..]) {
        Err(e) if e.error_len().is_none() => lead,
        _ => bytes.len(),
    }
}

async fn collect(capture: Option<Capture>) -> String {
    match capture {
        Some(capture) => capture.finish().await,
        None => String::new(),
    }
}

/// Kills every process in the group led by `pid`.
pub fn kill_process_group(pid: u32) {
    match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!(pid, error = %e, "Failed to kill process group"),
    }
}

/// Feeds `stdin`, collects both output streams and waits for exit.
///
/// Stdin is written from a separate task and closed right after, so a child
/// that reads less, or waits for more, cannot stall this call. When `deadline`
/// passes, the whole process group is killed and the output read so far is
/// returned. The group is also killed after a normal exit.
pub async fn supervise(
    mut child: Child,
    stdin: &str,
    deadline: Option<Duration>,
    output_limit: usize,
) -> std::io::Result<Finished> {
    let start = Instant::now();
    let pid = child.id();

    let feeder = child.stdin.take().map(|mut pipe| {
        let input = stdin.to_string();
        tokio::spawn(async move {
            if let Err(e) = pipe.write_all(input.as_bytes()).await {
                if e.kind() != ErrorKind::BrokenPipe {
                    tracing::debug!(error = %e, "Failed to write stdin");
                }
            }
        })
    });
    let stdout = child.stdout.take().map(|pipe| Capture::spawn(pipe, output_limit));
    let stderr = child.stderr.take().map(|pipe| Capture::spawn(pipe, output_limit));

    let waited = match deadline {
        Some(deadline) => tokio::time::timeout(deadline, child.wait()).await.ok(),
        None => Some(child.wait().await),
    };

    // The group goes down on every path, so background children of a program
    // that exited on its own do not outlive the run.
    if let Some(pid) = pid {
        kill_process_group(pid);
    }

    let status = match waited {
        Some(status) => Some(status?),
        None => {
            tracing::debug!(?pid, "Deadline exceeded, process group killed");
            if let Err(e) = child.kill().await {
                tracing::debug!(error = %e, "Child already gone");
            }
            None
        }
    };
    let elapsed = start.elapsed();

    if let Some(feeder) = feeder {
        feeder.abort();
    }

    let (stdout, stderr) = futures::join!(collect(stdout), collect(stderr));

    Ok(Finished {
        status,
        stdout,
        stderr,
        elapsed,
    })
}
