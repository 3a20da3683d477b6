//! Request orchestration: per-request scratch files, options, and the render service.

/// Pipeline options.
pub mod config;
/// Per-request intermediate and output paths.
pub mod scratch;
/// The render service, its handles, and exactly-once delivery.
pub mod service;
