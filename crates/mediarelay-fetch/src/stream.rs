//! Pull-based byte stream over a child process's stdout.
//!
//! Bytes are read from the pipe only when the consumer polls, so a slow
//! consumer fills the pipe and the child blocks on its next write. stderr is
//! drained on a separate task into the log and never mixed into the stream.

use std::collections::VecDeque;
use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use futures::StreamExt;
use mediarelay_core::{Error, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout};
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

use crate::source::ByteStream;

/// Read size for stdout chunks.
const CHUNK_SIZE: usize = 64 * 1024;

/// Number of trailing stderr lines kept for the failure report.
const STDERR_TAIL_LINES: usize = 20;

/// How long to wait for the stderr drain once the child has exited. A
/// grandchild may still hold the pipe open.
const STDERR_GRACE: Duration = Duration::from_secs(2);

/// A spawned child whose stdout is about to become a [`ByteStream`].
#[derive(Debug)]
pub struct ProcessStream {
    tool: String,
    child: Child,
    stdout: ChildStdout,
    stderr_task: Option<JoinHandle<String>>,
    timeout: Option<Duration>,
    shutdown: CancellationToken,
}

enum Step {
    Chunk(Option<io::Result<bytes::Bytes>>),
    Interrupted(Interrupt),
}

#[derive(Clone, Copy)]
enum Interrupt {
    TimedOut,
    Cancelled,
}

impl ProcessStream {
    /// Wrap a child spawned with piped stdout (and usually piped stderr).
    pub fn new(
        tool: String,
        mut child: Child,
        timeout: Option<Duration>,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Internal(format!("{tool} spawned without piped stdout")))?;

        let stderr_task = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(drain_stderr(tool.clone(), stderr)));

        Ok(Self {
            tool,
            child,
            stdout,
            stderr_task,
            timeout,
            shutdown,
        })
    }

    /// OS process id of the child, if it is still running.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Turn the process into a stream of stdout chunks.
    ///
    /// The stream ends cleanly only if the child exits with status zero.
    /// A non-zero exit, the timeout, or shutdown yields one final `Err`.
    /// Dropping the stream early kills the child.
    pub fn into_byte_stream(self) -> ByteStream {
        let ProcessStream {
            tool,
            mut child,
            stdout,
            stderr_task,
            timeout,
            shutdown,
        } = self;

        let stream = async_stream::try_stream! {
            let mut guard = DropGuard { tool: tool.clone(), finished: false };
            let mut chunks = ReaderStream::with_capacity(stdout, CHUNK_SIZE);

            let deadline = async move {
                match timeout {
                    Some(d) => tokio::time::sleep(d).await,
                    None => std::future::pending::<()>().await,
                }
            };
            tokio::pin!(deadline);

            loop {
                let step = tokio::select! {
                    chunk = chunks.next() => Step::Chunk(chunk),
                    _ = &mut deadline => Step::Interrupted(Interrupt::TimedOut),
                    _ = shutdown.cancelled() => Step::Interrupted(Interrupt::Cancelled),
                };

                match step {
                    Step::Chunk(Some(chunk)) => yield chunk?,
                    Step::Chunk(None) => break,
                    Step::Interrupted(why) => {
                        guard.finished = true;
                        let err = interrupt(&tool, &mut child, why, timeout).await;
                        Err::<(), io::Error>(err)?;
                    }
                }
            }

            // stdout is closed but the child may keep running; the deadline
            // and shutdown still apply while we wait for it.
            let waited: std::result::Result<io::Result<ExitStatus>, Interrupt> = tokio::select! {
                status = child.wait() => Ok(status),
                _ = &mut deadline => Err(Interrupt::TimedOut),
                _ = shutdown.cancelled() => Err(Interrupt::Cancelled),
            };
            guard.finished = true;

            let exited = match waited {
                Ok(status) => status,
                Err(why) => Err(interrupt(&tool, &mut child, why, timeout).await),
            };
            let status = exited?;

            let stderr_tail = match stderr_task {
                Some(mut task) => match tokio::time::timeout(STDERR_GRACE, &mut task).await {
                    Ok(joined) => joined.unwrap_or_default(),
                    Err(_) => {
                        tracing::debug!("{tool} stderr still open after exit; not waiting for it");
                        String::new()
                    }
                },
                None => String::new(),
            };

            if !status.success() {
                let err = Error::tool_failed(tool.clone(), Some(status), stderr_tail);
                tracing::error!("Relay failed after streaming started: {err}");
                Err::<(), io::Error>(io::Error::other(err))?;
            }

            tracing::debug!("{tool} relay finished");
        };

        Box::pin(stream)
    }
}

/// Logs when a relay is abandoned by its consumer.
struct DropGuard {
    tool: String,
    finished: bool,
}

impl Drop for DropGuard {
    fn drop(&mut self) {
        if !self.finished {
            tracing::info!(
                "{} relay dropped before completion (client went away); killing subprocess",
                self.tool
            );
        }
    }
}

/// Kill the child and build the error that ends the stream.
async fn interrupt(
    tool: &str,
    child: &mut Child,
    why: Interrupt,
    timeout: Option<Duration>,
) -> io::Error {
    if let Err(e) = child.kill().await {
        tracing::warn!("Failed to kill {tool}: {e}");
    }

    let err = match why {
        Interrupt::TimedOut => {
            let after = timeout.unwrap_or_default();
            tracing::error!("{tool} relay timed out after {after:?}; subprocess killed");
            Error::Timeout {
                tool: tool.to_string(),
                after,
            }
        }
        Interrupt::Cancelled => {
            tracing::info!("{tool} relay interrupted by shutdown; subprocess killed");
            Error::Internal(format!("{tool} relay interrupted by shutdown"))
        }
    };
    io::Error::other(err)
}

/// Log every stderr line and return the last few for error reports.
///
/// Lines are decoded lossily. The pipe is read to the end even after a read
/// error, since closing it early would kill the child on its next write.
async fn drain_stderr(tool: String, stderr: ChildStderr) -> String {
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end();
                if line.is_empty() {
                    continue;
                }
                if line.starts_with("ERROR") || line.starts_with("WARNING") {
                    tracing::warn!(tool = %tool, "{line}");
                } else {
                    tracing::debug!(tool = %tool, "{line}");
                }
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line.to_string());
            }
            Err(e) => {
                tracing::debug!("Failed to read {tool} stderr: {e}; discarding the rest");
                if let Err(e) = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await {
                    tracing::debug!("Gave up on {tool} stderr: {e}");
                }
                break;
            }
        }
    }

    tail.into_iter().collect::<Vec<_>>().join("\n")
}
