//! Application context shared across all route handlers via Axum state.

use std::sync::Arc;

use mediarelay_core::config::Config;
use mediarelay_fetch::MediaSource;

/// Immutable per-process state. Requests share nothing mutable.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    /// The downloader behind both endpoints.
    pub source: Arc<dyn MediaSource>,
}

impl AppContext {
    pub fn new(config: Config, source: Arc<dyn MediaSource>) -> Self {
        Self {
            config: Arc::new(config),
            source,
        }
    }
}
