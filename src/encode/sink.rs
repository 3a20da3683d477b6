use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use parking_lot::Mutex;

use crate::encode::pool::PixelBuffer;
use crate::foundation::core::{Canvas, Fps, FrameIndex, PixelFormat};
use crate::foundation::error::ReelResult;

/// Configuration provided to a [`FrameSink`] before any frame is pushed.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SinkConfig {
    /// Frame dimensions.
    pub canvas: Canvas,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Layout of pushed buffers.
    pub format: PixelFormat,
    /// Video codec the container should carry.
    pub codec: VideoCodec,
}

/// Output video codec.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    /// H.264 / AVC in yuv420p.
    #[default]
    H264,
}

/// Downstream consumer of rendered frames.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order, only
/// between `begin` and `end`. Calls come from the encoder's writer thread.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: &SinkConfig) -> ReelResult<()>;
    /// Consume one frame presented at `pts_secs`.
    fn push_frame(&mut self, idx: FrameIndex, pts_secs: f64, frame: &PixelBuffer)
    -> ReelResult<()>;
    /// Called once after the last frame; finalizes the container.
    fn end(&mut self) -> ReelResult<()>;
}

/// Creates one sink per request, bound to that request's output path.
pub trait SinkFactory: Send + Sync {
    /// Open a sink that will write to `out_path`.
    fn open(&self, out_path: &Path) -> ReelResult<Box<dyn FrameSink>>;
}

/// Frame captured by [`InMemorySink`].
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct CapturedFrame {
    /// Frame index as pushed.
    pub idx: FrameIndex,
    /// Presentation time as pushed.
    pub pts_secs: f64,
    /// [`PixelBuffer::fingerprint`] of the pushed pixels.
    pub fingerprint: u64,
}

#[derive(Debug, Default, serde::Serialize)]
struct InMemoryState {
    cfg: Option<SinkConfig>,
    frames: Vec<CapturedFrame>,
    ended: bool,
}

/// Sink that records frames in memory; clones share the same record.
///
/// When bound to an output path, `end` writes a JSON summary there so file-based stages see a
/// real artifact.
#[derive(Clone, Debug, Default)]
pub struct InMemorySink {
    state: Arc<Mutex<InMemoryState>>,
    out_path: Option<PathBuf>,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the sink configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.state.lock().cfg.clone()
    }

    /// Frames captured so far, in push order.
    pub fn frames(&self) -> Vec<CapturedFrame> {
        self.state.lock().frames.clone()
    }

    /// Whether `end` has been called.
    pub fn ended(&self) -> bool {
        self.state.lock().ended
    }

    fn bound_to(&self, out_path: &Path) -> Self {
        Self {
            state: Arc::clone(&self.state),
            out_path: Some(out_path.to_path_buf()),
        }
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: &SinkConfig) -> ReelResult<()> {
        let mut st = self.state.lock();
        st.cfg = Some(cfg.clone());
        st.frames.clear();
        st.ended = false;
        Ok(())
    }

    fn push_frame(
        &mut self,
        idx: FrameIndex,
        pts_secs: f64,
        frame: &PixelBuffer,
    ) -> ReelResult<()> {
        self.state.lock().frames.push(CapturedFrame {
            idx,
            pts_secs,
            fingerprint: frame.fingerprint(),
        });
        Ok(())
    }

    fn end(&mut self) -> ReelResult<()> {
        let mut st = self.state.lock();
        st.ended = true;
        if let Some(path) = &self.out_path {
            let summary = serde_json::to_vec_pretty(&*st)
                .context("failed to serialize in-memory sink summary")?;
            std::fs::write(path, summary)
                .with_context(|| format!("failed to write '{}'", path.display()))?;
        }
        Ok(())
    }
}

impl SinkFactory for InMemorySink {
    fn open(&self, out_path: &Path) -> ReelResult<Box<dyn FrameSink>> {
        Ok(Box::new(self.bound_to(out_path)))
    }
}
