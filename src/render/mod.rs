//! CPU rasterization of title frames.

/// Frame rasterization (background fill + centered text).
pub mod frame;
/// Font discovery and Parley text layout.
pub mod text;
