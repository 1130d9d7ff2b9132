//! [`MediaSource`] backed by the `yt-dlp` command-line tool.

use async_trait::async_trait;
use mediarelay_core::config::DownloaderConfig;
use mediarelay_core::{MediaInfo, Result, SourceUrl};
use tokio_util::sync::CancellationToken;

use crate::source::{ByteStream, MediaSource};
use crate::tools::{self, ToolInfo};
use crate::ToolCommand;

/// Runs yt-dlp (or a compatible fork) once per request.
///
/// The executable is resolved on every call, so a missing tool fails loudly
/// at the first request and installing it later needs no restart.
#[derive(Debug, Clone)]
pub struct YtDlp {
    config: DownloaderConfig,
    shutdown: CancellationToken,
}

impl YtDlp {
    pub fn new(config: DownloaderConfig) -> Self {
        Self {
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Kill running relays when `token` is cancelled.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Availability and version of the configured executable.
    pub fn check(&self) -> ToolInfo {
        tools::check_tool(&self.config.program, self.config.path.as_deref())
    }

    fn command(&self, mode_args: &[String], url: &SourceUrl) -> Result<ToolCommand> {
        let program = tools::locate(&self.config.program, self.config.path.as_deref())?;
        let mut cmd = ToolCommand::new(program);
        // `--` keeps a URL starting with '-' from being read as an option.
        cmd.args(mode_args.iter().cloned())
            .arg("--")
            .arg(url.as_str());
        Ok(cmd)
    }
}

#[async_trait]
impl MediaSource for YtDlp {
    fn name(&self) -> &str {
        &self.config.program
    }

    async fn resolve_metadata(&self, url: &SourceUrl) -> Result<MediaInfo> {
        let mut cmd = self.command(&self.config.metadata_args, url)?;
        cmd.timeout(self.config.metadata_timeout());

        let output = cmd.execute().await?;
        if !output.stderr.trim().is_empty() {
            tracing::debug!(tool = %cmd.program_name(), "{}", output.stderr.trim());
        }

        MediaInfo::from_json(&cmd.program_name(), &output.stdout)
    }

    async fn open_stream(&self, url: &SourceUrl) -> Result<ByteStream> {
        let cmd = self.command(&self.config.stream_args, url)?;
        let process = cmd.spawn_stream(self.config.stream_timeout(), self.shutdown.clone())?;

        tracing::info!(
            pid = process.id(),
            "Started {} relay for {url}",
            cmd.program_name()
        );

        Ok(process.into_byte_stream())
    }
}
