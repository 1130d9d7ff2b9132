//! Builder for executing external tool commands with timeout support.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use mediarelay_core::{Error, Result};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::stream::ProcessStream;

/// Default command timeout: 2 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output, untouched.
    pub stdout: Vec<u8>,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use mediarelay_fetch::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> mediarelay_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("yt-dlp"))
///     .arg("-j")
///     .arg("--")
///     .arg("https://example.com/watch?v=1")
///     .execute()
///     .await?;
/// println!("{} bytes of JSON", output.stdout.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Short name of the program for logs and errors.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, e: std::io::Error) -> Error {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::tool_not_found(self.program.to_string_lossy())
        } else {
            Error::Io { source: e }
        }
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - [`Error::ToolNotFound`] if the executable does not exist.
    /// - [`Error::Timeout`] if the process outlives the timeout; the child is
    ///   killed.
    /// - [`Error::ToolFailed`] if the process exits with a non-zero status
    ///   (carries stderr).
    /// - [`Error::Io`] if spawning or waiting fails otherwise.
    pub async fn execute(&self) -> Result<ToolOutput> {
        let program_name = self.program_name();

        tracing::debug!("Running {} {}", program_name, self.args.join(" "));

        let child = self.command().spawn().map_err(|e| self.spawn_error(e))?;

        // Dropping the wait future on timeout drops the child, and
        // `kill_on_drop` takes it down with it.
        let result = tokio::time::timeout(self.timeout, child.wait_with_output()).await;

        match result {
            Ok(Ok(output)) => {
                let tool_output = ToolOutput {
                    status: output.status,
                    stdout: output.stdout,
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                };

                if !tool_output.status.success() {
                    return Err(Error::tool_failed(
                        program_name,
                        Some(tool_output.status),
                        tool_output.stderr.trim(),
                    ));
                }

                Ok(tool_output)
            }
            Ok(Err(e)) => Err(Error::Io { source: e }),
            Err(_elapsed) => Err(Error::Timeout {
                tool: program_name,
                after: self.timeout,
            }),
        }
    }

    /// Spawn the command with its stdout exposed as a [`ProcessStream`].
    ///
    /// The timeout applies to the whole lifetime of the stream. Cancelling
    /// `shutdown` kills the child and ends the stream with an error.
    pub fn spawn_stream(
        &self,
        timeout: Option<Duration>,
        shutdown: CancellationToken,
    ) -> Result<ProcessStream> {
        let program_name = self.program_name();

        tracing::debug!("Streaming {} {}", program_name, self.args.join(" "));

        let child = self.command().spawn().map_err(|e| self.spawn_error(e))?;

        ProcessStream::new(program_name, child, timeout, shutdown)
    }
}
