//! Frame encoding: pooled pixel buffers, sink abstraction, and the backpressure-aware encoder.

/// Streaming encoder state machine with readiness signalling.
pub mod encoder;
/// Sink backed by the system `ffmpeg` binary.
pub mod ffmpeg;
/// Bounded pixel buffer pool.
pub mod pool;
/// Sink traits and the in-memory sink.
pub mod sink;
