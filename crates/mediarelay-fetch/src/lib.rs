//! # mediarelay-fetch
//!
//! The external downloader, seen from Rust.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`tools::locate`], [`tools::check_tool`]) -- find the
//!   downloader executable and report its version.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   support for running the downloader to completion, or spawning it with
//!   its stdout exposed as a stream.
//! - **Process streams** ([`ProcessStream`]) -- pull-based byte stream over a
//!   child's stdout that reports the exit status, kills the child on drop,
//!   and logs its stderr.
//! - **The [`MediaSource`] seam** -- `resolve_metadata` / `open_stream`,
//!   implemented for yt-dlp by [`YtDlp`] and mocked in tests.

pub mod command;
pub mod source;
pub mod stream;
pub mod tools;
pub mod ytdlp;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use source::{ByteStream, MediaSource};
pub use stream::ProcessStream;
pub use tools::{check_tool, locate, ToolInfo};
pub use ytdlp::YtDlp;
