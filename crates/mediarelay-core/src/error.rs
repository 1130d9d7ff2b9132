//! Unified error type for mediarelay.
//!
//! Every failure surfaced by the downloader abstraction or the HTTP handlers
//! is an [`Error`]. Handlers derive the status code via [`Error::http_status`]
//! and the client-facing text via [`Error::public_message`]; the `Display`
//! output carries the full detail and is meant for logs only.

use std::process::ExitStatus;
use std::time::Duration;

/// Unified error type covering all failure modes in mediarelay.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The client request is unusable (missing or blank URL, bad body).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The external downloader executable could not be located.
    #[error("Tool not found: {tool}; is it installed and in PATH?")]
    ToolNotFound {
        /// Name or path of the missing tool.
        tool: String,
    },

    /// The external downloader exited with a non-zero status.
    #[error("Tool error [{tool}]: exited with {}: {stderr}", describe_status(.status))]
    ToolFailed {
        /// Name of the tool that failed.
        tool: String,
        /// Exit status, if the process ran to completion.
        status: Option<ExitStatus>,
        /// Captured diagnostic output (trimmed).
        stderr: String,
    },

    /// The external downloader did not finish within its deadline.
    #[error("Tool error [{tool}]: timed out after {after:?}")]
    Timeout {
        /// Name of the tool that was killed.
        tool: String,
        /// The deadline that expired.
        after: Duration,
    },

    /// Tool output could not be parsed.
    #[error("Failed to parse {tool} output: {message}")]
    Parse {
        /// Name of the tool whose output was malformed.
        tool: String,
        /// Parser error description.
        message: String,
    },

    /// The tool output parsed but lacks a usable media locator.
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// Spawning the tool or reading its pipes failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn describe_status(status: &Option<ExitStatus>) -> String {
    match status {
        Some(s) => match s.code() {
            Some(code) => format!("code {code}"),
            None => s.to_string(),
        },
        None => "unknown status".to_string(),
    }
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidRequest(_) => 400,
            Error::ToolNotFound { .. } => 500,
            Error::ToolFailed { .. } => 500,
            Error::Timeout { .. } => 500,
            Error::Parse { .. } => 500,
            Error::Resolution(_) => 500,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// The message shown to API clients.
    ///
    /// Never contains subprocess output; the detail goes to the log.
    pub fn public_message(&self) -> String {
        match self {
            Error::InvalidRequest(msg) => msg.clone(),
            Error::ToolNotFound { .. }
            | Error::ToolFailed { .. }
            | Error::Timeout { .. }
            | Error::Io { .. } => "Error fetching video".to_string(),
            Error::Parse { .. } => "Error parsing video info".to_string(),
            Error::Resolution(_) => "Video not found".to_string(),
            Error::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// Convenience constructor for [`Error::ToolNotFound`].
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Error::ToolNotFound { tool: tool.into() }
    }

    /// Convenience constructor for [`Error::ToolFailed`].
    pub fn tool_failed(
        tool: impl Into<String>,
        status: Option<ExitStatus>,
        stderr: impl Into<String>,
    ) -> Self {
        Error::ToolFailed {
            tool: tool.into(),
            status,
            stderr: stderr.into(),
        }
    }

    /// Recover an [`Error`] that travelled through a byte stream as the
    /// payload of an `io::Error`; other I/O errors become [`Error::Io`].
    pub fn from_stream_error(e: std::io::Error) -> Self {
        if !e.get_ref().is_some_and(|inner| inner.is::<Error>()) {
            return Error::Io { source: e };
        }
        e.into_inner()
            .and_then(|inner| inner.downcast::<Error>().ok())
            .map(|boxed| *boxed)
            .unwrap_or_else(|| Error::Internal("stream error without payload".into()))
    }

    /// Convenience constructor for [`Error::Parse`].
    pub fn parse(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Parse {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
