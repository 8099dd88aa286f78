//! Core utilities for the call stream server
//!
//! This crate provides fundamental types and utilities used across the server

/// Git version string, set at compile time
pub const GIT_VERSION: &str = git_version::git_version!(fallback = "unknown");
/// Server version followed by git version string, e.g., "0.3.2-aabbccdd"
pub const SERVER_VERSION: &str = const_format::formatcp!("{}-{}", env!("CARGO_PKG_VERSION"), GIT_VERSION);

pub mod common;
pub mod debug;

// Re-export commonly used items
pub use common::*;

/// Call identifier assigned by the log server (24-bit in practice)
pub type CallId = u32;

/// Index of a feeder in the static feeder arena
pub type FeederId = usize;
