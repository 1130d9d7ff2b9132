//! The [`MediaSource`] trait: the narrow seam between HTTP handlers and the
//! external downloader.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use mediarelay_core::{MediaInfo, Result, SourceUrl};

/// Pull-based stream of media bytes.
///
/// A final `Err` item means the producer failed after bytes may already have
/// been delivered.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Something that can turn a media URL into metadata or raw bytes.
///
/// Implementations must be safe to share across threads (`Send + Sync`).
/// Each call is independent: no caching, no retries.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Human-readable name identifying this source implementation.
    fn name(&self) -> &str;

    /// Resolve `url` to the downloader's metadata document.
    async fn resolve_metadata(&self, url: &SourceUrl) -> Result<MediaInfo>;

    /// Start producing the raw media bytes for `url`.
    ///
    /// Returns once the producer is running; failures after this point
    /// surface as the stream's final `Err` item.
    async fn open_stream(&self, url: &SourceUrl) -> Result<ByteStream>;
}
