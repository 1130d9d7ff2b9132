//! Route handlers for the HTTP API.

pub mod download;
pub mod health;
pub mod stream;
