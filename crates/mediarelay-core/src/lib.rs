//! mediarelay-core: shared types, errors, and configuration.
//!
//! This crate is the foundational dependency for the other mediarelay
//! crates. It defines the unified error type, the JSON configuration, and
//! the media-domain types that flow between the downloader and the HTTP
//! handlers.

pub mod config;
pub mod error;
pub mod media;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use media::*;
