//! textreel renders a text title card to video and muxes a fixed audio track onto it.
//!
//! The pipeline runs off the caller's thread:
//!
//! - A [`FrameClock`] yields `(index, presentation time)` pairs for the requested duration
//! - A [`FrameRenderer`] rasterizes centered bold text into pooled [`PixelBuffer`]s
//! - A [`VideoEncoder`] streams frames to a [`FrameSink`] under backpressure
//! - A [`Muxer`] composes the video with the audio asset and runs an [`ExportJob`]
//! - A [`Pipeline`] ties the stages together and delivers one [`PipelineResult`] per request
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub mod clock;
/// Encoding sinks and the streaming encoder.
pub mod encode;
/// Audio muxing and export.
pub mod mux;
/// Request orchestration.
pub mod pipeline;
/// Title frame rasterization.
pub mod render;
/// Render requests and resolutions.
pub mod request;

pub use crate::foundation::cancel::CancelToken;
pub use crate::foundation::core::{Canvas, Fps, FrameIndex, PixelFormat, Rgba8};
pub use crate::foundation::error::{ErrorKind, PipelineResult, ReelError, ReelResult};

pub use crate::clock::FrameClock;
pub use crate::encode::encoder::{EncoderConfig, EncoderState, VideoEncoder};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkFactory, FfmpegSinkOpts};
pub use crate::encode::pool::{PixelBuffer, PixelBufferPool, PoolStats};
pub use crate::encode::sink::{
    CapturedFrame, FrameSink, InMemorySink, SinkConfig, SinkFactory, VideoCodec,
};
pub use crate::mux::composition::{Composition, TrackRange, TrimPolicy};
pub use crate::mux::export::{ExportBackend, ExportJob, ExportPreset, ExportStatus, FfmpegExporter};
pub use crate::mux::muxer::Muxer;
pub use crate::mux::probe::{AssetProbe, FfprobeProbe, MediaInfo, MediaKind, StreamInfo};
pub use crate::pipeline::config::PipelineOpts;
pub use crate::pipeline::scratch::ScratchPaths;
pub use crate::pipeline::service::{
    Pipeline, PipelineBackends, RenderHandle, RenderStats, RenderTicket, render_video,
};
pub use crate::render::frame::{FrameRenderer, RendererOpts};
pub use crate::request::{RenderRequest, Resolution};
