//! Media-domain types shared between the downloader and the HTTP layer.
//!
//! [`SourceUrl`] is the only client input; [`MediaInfo`] is what the
//! gateway reads from the downloader's JSON document; [`Metadata`] is the
//! normalized projection returned to clients.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Message used whenever a request arrives without a usable URL.
pub const NO_URL_MESSAGE: &str = "No URL provided";

/// Path of the stream relay endpoint, used to build `streamUrl`.
pub const STREAM_PATH: &str = "/stream";

// ---------------------------------------------------------------------------
// SourceUrl
// ---------------------------------------------------------------------------

/// A client-supplied media URL.
///
/// Only emptiness is checked; the downloader decides what it can handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceUrl(String);

impl SourceUrl {
    /// Build a `SourceUrl` from raw client input.
    ///
    /// Missing, empty, or whitespace-only input is an
    /// [`Error::InvalidRequest`].
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw.map(str::trim) {
            Some(s) if !s.is_empty() => Ok(Self(s.to_string())),
            _ => Err(Error::InvalidRequest(NO_URL_MESSAGE.into())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path + query pointing back at the stream relay for this URL.
    pub fn stream_path(&self) -> String {
        format!("{STREAM_PATH}?url={}", urlencoding::encode(&self.0))
    }
}

impl fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SourceUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// MediaInfo
// ---------------------------------------------------------------------------

/// One entry of `requested_formats` (present when video and audio are
/// fetched separately and merged).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RequestedFormat {
    #[serde(default)]
    pub format_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// The subset of the downloader's JSON document the gateway reads.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MediaInfo {
    pub id: Option<String>,
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    pub url: Option<String>,
    pub requested_formats: Vec<RequestedFormat>,
    pub duration: Option<f64>,
    pub extractor: Option<String>,
    pub webpage_url: Option<String>,
}

impl MediaInfo {
    /// Parse the JSON document printed by `tool`.
    ///
    /// Anything other than a single JSON object is a parse failure.
    pub fn from_json(tool: &str, output: &[u8]) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_slice(output).map_err(|e| Error::parse(tool, e.to_string()))?;

        if !value.is_object() {
            return Err(Error::parse(tool, "expected a JSON object"));
        }

        serde_json::from_value(value).map_err(|e| Error::parse(tool, e.to_string()))
    }

    /// The direct media URL, falling back to the first requested format.
    pub fn media_url(&self) -> Option<&str> {
        non_empty(self.url.as_deref()).or_else(|| {
            self.requested_formats
                .iter()
                .find_map(|f| non_empty(f.url.as_deref()))
        })
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Normalized metadata returned by `POST /download`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extractor: Option<String>,
}

impl Metadata {
    /// Project `info` with a `streamUrl` pointing back at this gateway.
    ///
    /// The document must still name a media locator; one without is a
    /// [`Error::Resolution`].
    pub fn proxied(info: MediaInfo, source: &SourceUrl) -> Result<Self> {
        require_locator(&info)?;
        Ok(Self {
            stream_url: Some(source.stream_path()),
            video_url: None,
            ..Self::base(info)
        })
    }

    /// Project `info` with the upstream media URL.
    pub fn direct(info: MediaInfo) -> Result<Self> {
        let url = require_locator(&info)?.to_string();
        Ok(Self {
            stream_url: None,
            video_url: Some(url),
            ..Self::base(info)
        })
    }

    fn base(info: MediaInfo) -> Self {
        Self {
            title: info.title,
            thumbnail: info.thumbnail,
            stream_url: None,
            video_url: None,
            duration: info.duration,
            extractor: info.extractor,
        }
    }
}

fn require_locator(info: &MediaInfo) -> Result<&str> {
    info.media_url().ok_or_else(|| {
        Error::Resolution(format!(
            "no media url in metadata for {}",
            info.webpage_url
                .as_deref()
                .or(info.id.as_deref())
                .unwrap_or("unknown media")
        ))
    })
}
