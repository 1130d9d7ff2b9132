//! External tool detection.

use std::path::{Path, PathBuf};

use mediarelay_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Availability information for a tool, returned by [`check_tool`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of `--version` output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Resolve the executable for `program`, preferring a configured path.
///
/// A configured path that does not exist falls back to a `PATH` lookup.
///
/// # Errors
///
/// Returns [`Error::ToolNotFound`] if neither yields an executable.
pub fn locate(program: &str, custom_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = custom_path {
        if p.exists() {
            return Ok(p.to_path_buf());
        }
        tracing::debug!(
            "Configured path {} for {program} does not exist; searching PATH",
            p.display()
        );
    }

    which::which(program).map_err(|_| Error::tool_not_found(program))
}

/// Check whether a tool is available and get its version.
pub fn check_tool(program: &str, custom_path: Option<&Path>) -> ToolInfo {
    match locate(program, custom_path) {
        Ok(path) => ToolInfo {
            name: program.to_string(),
            available: true,
            version: detect_version(&path),
            path: Some(path),
        },
        Err(_) => ToolInfo {
            name: program.to_string(),
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Run `<tool> --version` and return the first line of stdout.
fn detect_version(path: &Path) -> Option<String> {
    let output = std::process::Command::new(path)
        .arg("--version")
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
