//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! server, downloader and relay sections. Every section defaults sensibly so
//! a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::Error;

/// Environment variable selecting the listening port.
pub const PORT_ENV: &str = "PORT";

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub downloader: DownloaderConfig,
    pub relay: RelayConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::InvalidRequest(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Load configuration strictly: a missing or malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Apply overrides from the process environment (`PORT`).
    pub fn apply_env(&mut self) {
        self.apply_port_override(std::env::var(PORT_ENV).ok().as_deref());
    }

    fn apply_port_override(&mut self, value: Option<&str>) {
        let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return;
        };
        match raw.parse::<u16>() {
            Ok(port) => self.server.port = port,
            Err(e) => {
                tracing::warn!("Ignoring {PORT_ENV}={raw:?}: {e}");
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.downloader.program.trim().is_empty() && self.downloader.path.is_none() {
            warnings.push("downloader.program is empty and no downloader.path is set".into());
        }

        if let Some(ref p) = self.downloader.path {
            if !p.exists() {
                warnings.push(format!(
                    "downloader.path {} does not exist; falling back to PATH lookup",
                    p.display()
                ));
            }
        }

        if self.downloader.metadata_timeout_secs == 0 {
            warnings.push("downloader.metadata_timeout_secs is 0; every lookup will time out".into());
        }

        if self.relay.content_type.trim().is_empty() {
            warnings.push("relay.content_type is empty".into());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
        }
    }
}

/// External downloader settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    /// Executable name looked up on `PATH`.
    pub program: String,
    /// Explicit executable path; used when it exists.
    pub path: Option<PathBuf>,
    /// Arguments selecting JSON metadata mode.
    pub metadata_args: Vec<String>,
    /// Arguments selecting raw output to stdout.
    pub stream_args: Vec<String>,
    pub metadata_timeout_secs: u64,
    /// Maximum wall-clock duration of a relay; 0 disables the limit.
    pub stream_timeout_secs: u64,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            program: "yt-dlp".into(),
            path: None,
            metadata_args: vec!["-j".into(), "--no-playlist".into()],
            stream_args: vec!["-o".into(), "-".into(), "--no-playlist".into()],
            metadata_timeout_secs: 120,
            stream_timeout_secs: 4 * 60 * 60,
        }
    }
}

impl DownloaderConfig {
    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    pub fn stream_timeout(&self) -> Option<Duration> {
        (self.stream_timeout_secs > 0).then(|| Duration::from_secs(self.stream_timeout_secs))
    }
}

/// How the metadata response points clients at the media bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayMode {
    /// Return a `streamUrl` back into this gateway's `/stream` endpoint.
    #[default]
    Proxy,
    /// Return the upstream media URL reported by the downloader.
    Direct,
}

/// Response shaping for the relay endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub mode: RelayMode,
    /// `Content-Type` sent with relayed streams.
    pub content_type: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            mode: RelayMode::Proxy,
            content_type: "video/mp4".into(),
        }
    }
}
