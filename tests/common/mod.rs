//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which writes a stub downloader script into a
//! temporary directory, points a real [`YtDlp`] source at it, and serves the
//! full router on a random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use mediarelay_core::config::Config;
use mediarelay_fetch::YtDlp;
use mediarelay_server::context::AppContext;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Metadata printed by the default stub.
pub const SAMPLE_JSON: &str =
    r#"{"title":"T","thumbnail":"http://x/thumb.jpg","url":"http://x/media.mp4"}"#;

/// Test harness wrapping a running server backed by a stub downloader.
pub struct TestHarness {
    pub addr: SocketAddr,
    pub dir: TempDir,
    pub cancel: CancellationToken,
    pub server: JoinHandle<mediarelay_core::Result<()>>,
}

impl TestHarness {
    /// Start a server whose downloader runs `script` (a `/bin/sh` body).
    ///
    /// `{dir}` in the script is replaced with the harness temp directory.
    pub async fn with_stub(script: &str) -> Self {
        Self::with_stub_config(script, Config::default()).await
    }

    /// Like [`TestHarness::with_stub`] with a custom base configuration.
    pub async fn with_stub_config(script: &str, mut config: Config) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let stub = write_stub(dir.path(), script);

        config.downloader.program = "stub-dl".into();
        config.downloader.path = Some(stub);

        Self::start(dir, config).await
    }

    /// Start a server whose downloader does not exist.
    pub async fn without_tool() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let mut config = Config::default();
        config.downloader.program = "nonexistent_downloader_12345".into();
        Self::start(dir, config).await
    }

    async fn start(dir: TempDir, config: Config) -> Self {
        let cancel = CancellationToken::new();
        let source = Arc::new(YtDlp::new(config.downloader.clone()).with_shutdown(cancel.clone()));
        let ctx = AppContext::new(config, source);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        let server = tokio::spawn(mediarelay_server::serve(listener, ctx, cancel.clone()));

        Self {
            addr,
            dir,
            cancel,
            server,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// File the stub scripts touch to prove they ran.
    pub fn marker(&self) -> PathBuf {
        self.dir.path().join("spawned")
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Wait until `pred` holds, polling for up to five seconds.
    pub async fn eventually(&self, mut pred: impl FnMut() -> bool) -> bool {
        for _ in 0..100 {
            if pred() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        pred()
    }
}

/// Write an executable `/bin/sh` stub into `dir`.
pub fn write_stub(dir: &Path, script: &str) -> PathBuf {
    let path = dir.join("stub-dl");
    let body = script.replace("{dir}", &dir.display().to_string());
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("failed to write stub");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("failed to chmod stub");
    path
}
