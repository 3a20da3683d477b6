//! Audio muxing: asset probing, track composition, and the asynchronous export job.

/// Video and audio track ranges and the trim policy.
pub mod composition;
/// Export job state machine and backends.
pub mod export;
/// Composition assembly and job submission.
pub mod muxer;
/// Media metadata probing.
pub mod probe;
