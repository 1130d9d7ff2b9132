//! In-memory [`MediaSource`] for handler tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use mediarelay_core::{Error, MediaInfo, Result, SourceUrl};
use mediarelay_fetch::{ByteStream, MediaSource};

type MetadataFn = Box<dyn Fn() -> Result<MediaInfo> + Send + Sync>;
type StreamFn = Box<dyn Fn() -> Result<Vec<std::io::Result<Bytes>>> + Send + Sync>;

/// Counts calls and answers with canned results.
pub struct MockSource {
    metadata: Option<MetadataFn>,
    stream: Option<StreamFn>,
    calls: AtomicUsize,
    last_url: Mutex<Option<String>>,
}

impl MockSource {
    pub fn metadata(f: impl Fn() -> Result<MediaInfo> + Send + Sync + 'static) -> Self {
        Self {
            metadata: Some(Box::new(f)),
            stream: None,
            calls: AtomicUsize::new(0),
            last_url: Mutex::new(None),
        }
    }

    pub fn stream(
        f: impl Fn() -> Result<Vec<std::io::Result<Bytes>>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            metadata: None,
            stream: Some(Box::new(f)),
            calls: AtomicUsize::new(0),
            last_url: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_url(&self) -> Option<String> {
        self.last_url.lock().unwrap().clone()
    }

    fn record(&self, url: &SourceUrl) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_url.lock().unwrap() = Some(url.to_string());
    }
}

#[async_trait]
impl MediaSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn resolve_metadata(&self, url: &SourceUrl) -> Result<MediaInfo> {
        self.record(url);
        match &self.metadata {
            Some(f) => f(),
            None => Err(Error::Internal("no metadata configured".into())),
        }
    }

    async fn open_stream(&self, url: &SourceUrl) -> Result<ByteStream> {
        self.record(url);
        match &self.stream {
            Some(f) => Ok(Box::pin(futures::stream::iter(f()?))),
            None => Err(Error::Internal("no stream configured".into())),
        }
    }
}

/// The document from the `{"title":"T",...}` scenario.
pub fn sample_info() -> MediaInfo {
    MediaInfo {
        title: Some("T".into()),
        thumbnail: Some("http://x/thumb.jpg".into()),
        url: Some("http://x/media.mp4".into()),
        ..Default::default()
    }
}
