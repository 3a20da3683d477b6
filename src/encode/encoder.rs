use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::{Condvar, Mutex};

use crate::encode::pool::{PixelBuffer, PixelBufferPool};
use crate::encode::sink::{FrameSink, SinkConfig, SinkFactory, VideoCodec};
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::{Canvas, Fps, FrameIndex, PixelFormat};
use crate::foundation::error::{ReelError, ReelResult};

/// Upper bound on a single condvar sleep so cancellation and deadlines are observed promptly.
const WAIT_SLICE: Duration = Duration::from_millis(25);

/// Lifecycle of a [`VideoEncoder`]. Transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub enum EncoderState {
    /// Created, sink not opened.
    Idle,
    /// Sink open; accepting frames.
    Writing,
    /// `finish` in progress; no more frames accepted.
    Finalizing,
    /// Container finalized successfully.
    Finished,
    /// Sink reported an error; no further operations permitted.
    Failed,
}

impl EncoderState {
    /// Return `true` for `Finished` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }
}

/// Settings for one encode.
#[derive(Clone, Debug)]
pub struct EncoderConfig {
    /// Video-only container path.
    pub out_path: PathBuf,
    /// Frame dimensions.
    pub canvas: Canvas,
    /// Output frame rate.
    pub fps: Fps,
    /// Output codec.
    pub codec: VideoCodec,
    /// Sink queue depth; also the pixel buffer pool size.
    pub capacity: usize,
}

impl EncoderConfig {
    /// Check dimensions and capacity.
    pub fn validate(&self) -> ReelResult<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(ReelError::validation(
                "encode width/height must be non-zero",
            ));
        }
        if !self.canvas.width.is_multiple_of(2) || !self.canvas.height.is_multiple_of(2) {
            // yuv420p output needs even dimensions.
            return Err(ReelError::validation(
                "encode width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        if self.fps.num == 0 || self.fps.den == 0 {
            return Err(ReelError::validation("encode fps must be non-zero"));
        }
        if self.capacity == 0 {
            return Err(ReelError::validation("encoder capacity must be >= 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct WriterState {
    in_flight: usize,
    failure: Option<String>,
    frames_written: u64,
}

#[derive(Debug, Default)]
struct Shared {
    st: Mutex<WriterState>,
    cv: Condvar,
}

struct QueuedFrame {
    idx: FrameIndex,
    pts_secs: f64,
    buf: PixelBuffer,
}

/// Streaming video encoder with a bounded buffer pool and a backpressure signal.
///
/// Frames are handed to a writer thread that feeds the [`FrameSink`]. The encoder is ready for
/// another frame while fewer than `capacity` frames are in flight.
pub struct VideoEncoder {
    cfg: EncoderConfig,
    state: EncoderState,
    pool: PixelBufferPool,
    shared: Arc<Shared>,
    tx: Option<Sender<QueuedFrame>>,
    writer: Option<JoinHandle<Box<dyn FrameSink>>>,
    last_pts: Option<f64>,
    frames_appended: u64,
}

impl VideoEncoder {
    /// Create an encoder in [`EncoderState::Idle`].
    pub fn new(cfg: EncoderConfig) -> ReelResult<Self> {
        cfg.validate()?;
        let pool = PixelBufferPool::new(cfg.canvas, PixelFormat::Rgba8Premul, cfg.capacity)?;
        Ok(Self {
            cfg,
            state: EncoderState::Idle,
            pool,
            shared: Arc::new(Shared::default()),
            tx: None,
            writer: None,
            last_pts: None,
            frames_appended: 0,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EncoderState {
        self.state
    }

    /// Encoder settings.
    pub fn config(&self) -> &EncoderConfig {
        &self.cfg
    }

    /// Frames accepted by [`VideoEncoder::append`].
    pub fn frames_appended(&self) -> u64 {
        self.frames_appended
    }

    /// Frames the sink has consumed so far.
    pub fn frames_written(&self) -> u64 {
        self.shared.st.lock().frames_written
    }

    /// Open a sink for `cfg.out_path` through `sinks` and start writing.
    pub fn start(&mut self, sinks: &dyn SinkFactory) -> ReelResult<()> {
        if self.state != EncoderState::Idle {
            return Err(ReelError::invalid_state(format!(
                "start requires Idle, encoder is {:?}",
                self.state
            )));
        }
        let sink = sinks.open(&self.cfg.out_path).map_err(|e| {
            self.state = EncoderState::Failed;
            as_cannot_open(e)
        })?;
        self.start_with_sink(sink)
    }

    /// Start writing into an already constructed sink. `Idle -> Writing`.
    #[tracing::instrument(skip(self, sink), fields(out = %self.cfg.out_path.display(), canvas = %self.cfg.canvas))]
    pub fn start_with_sink(&mut self, mut sink: Box<dyn FrameSink>) -> ReelResult<()> {
        if self.state != EncoderState::Idle {
            return Err(ReelError::invalid_state(format!(
                "start requires Idle, encoder is {:?}",
                self.state
            )));
        }

        let sink_cfg = SinkConfig {
            canvas: self.cfg.canvas,
            fps: self.cfg.fps,
            format: PixelFormat::Rgba8Premul,
            codec: self.cfg.codec,
        };
        if let Err(e) = sink.begin(&sink_cfg) {
            self.state = EncoderState::Failed;
            return Err(as_cannot_open(e));
        }

        let (tx, rx) = crossbeam_channel::bounded(self.cfg.capacity);
        let shared = Arc::clone(&self.shared);
        let writer = std::thread::Builder::new()
            .name("textreel-encoder-writer".to_string())
            .spawn(move || writer_loop(sink, rx, shared))
            .map_err(|e| {
                self.state = EncoderState::Failed;
                ReelError::cannot_open_sink(format!("failed to spawn encoder writer thread: {e}"))
            })?;

        self.tx = Some(tx);
        self.writer = Some(writer);
        self.state = EncoderState::Writing;
        tracing::debug!("encoder Idle -> Writing");
        Ok(())
    }

    /// Readiness signal: `true` while writing, healthy, and below the in-flight limit.
    pub fn is_ready(&self) -> bool {
        if self.state != EncoderState::Writing {
            return false;
        }
        let st = self.shared.st.lock();
        st.failure.is_none() && st.in_flight < self.cfg.capacity
    }

    /// Block until [`VideoEncoder::is_ready`] would return `true`.
    ///
    /// Sleeps on a condition variable signalled by the writer thread after every frame.
    pub fn wait_ready(&self, cancel: &CancelToken, timeout: Option<Duration>) -> ReelResult<()> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut st = self.shared.st.lock();
        loop {
            if let Some(f) = &st.failure {
                return Err(ReelError::sink_failed(f.clone()));
            }
            if self.state != EncoderState::Writing {
                return Err(ReelError::invalid_state(format!(
                    "wait_ready while encoder is {:?}",
                    self.state
                )));
            }
            if st.in_flight < self.cfg.capacity {
                return Ok(());
            }
            if cancel.is_cancelled() {
                return Err(ReelError::cancelled("cancelled while waiting for the sink"));
            }
            let slice = match deadline {
                Some(d) => {
                    let now = Instant::now();
                    if now >= d {
                        return Err(ReelError::timeout(
                            "sink did not become ready within the stage timeout",
                        ));
                    }
                    (d - now).min(WAIT_SLICE)
                }
                None => WAIT_SLICE,
            };
            let _ = self.shared.cv.wait_for(&mut st, slice);
        }
    }

    /// Check out a frame buffer from the encoder's pool.
    pub fn checkout_buffer(&self) -> ReelResult<PixelBuffer> {
        self.pool.checkout()
    }

    /// Pool backing [`VideoEncoder::checkout_buffer`].
    pub fn pool(&self) -> &PixelBufferPool {
        &self.pool
    }

    /// Queue `buf` for presentation at `pts_secs`.
    ///
    /// On success the buffer belongs to the sink. On any error it is released back to the pool.
    pub fn append(&mut self, buf: PixelBuffer, pts_secs: f64) -> ReelResult<()> {
        if self.state != EncoderState::Writing {
            return Err(ReelError::invalid_state(format!(
                "append while encoder is {:?}",
                self.state
            )));
        }
        if buf.canvas() != self.cfg.canvas {
            return Err(ReelError::validation(format!(
                "frame size mismatch: got {}, expected {}",
                buf.canvas(),
                self.cfg.canvas
            )));
        }
        if !pts_secs.is_finite() || pts_secs < 0.0 {
            return Err(ReelError::validation("presentation time must be finite and >= 0"));
        }
        if let Some(last) = self.last_pts
            && pts_secs <= last
        {
            return Err(ReelError::validation(format!(
                "presentation time {pts_secs} does not follow {last}"
            )));
        }

        {
            let mut st = self.shared.st.lock();
            if let Some(f) = st.failure.clone() {
                drop(st);
                self.fail();
                return Err(ReelError::sink_failed(f));
            }
            if st.in_flight >= self.cfg.capacity {
                return Err(ReelError::sink_not_ready(format!(
                    "{} frames in flight",
                    st.in_flight
                )));
            }
            st.in_flight += 1;
        }

        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| ReelError::internal("encoder is writing without a queue"))?;
        let frame = QueuedFrame {
            idx: FrameIndex(self.frames_appended),
            pts_secs,
            buf,
        };
        match tx.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.release_slot();
                return Err(ReelError::sink_not_ready("sink queue is full"));
            }
            Err(TrySendError::Disconnected(_)) => {
                self.release_slot();
                self.fail();
                return Err(ReelError::sink_failed("encoder writer thread exited"));
            }
        }

        self.last_pts = Some(pts_secs);
        self.frames_appended += 1;
        Ok(())
    }

    /// Finalize the container. `Writing -> Finalizing -> {Finished, Failed}`.
    ///
    /// A push failure not yet reported by [`Self::append`] is returned as `SinkFailed`.
    #[tracing::instrument(skip(self), fields(out = %self.cfg.out_path.display()))]
    pub fn finish(&mut self) -> ReelResult<PathBuf> {
        if self.state != EncoderState::Writing {
            return Err(ReelError::invalid_state(format!(
                "finish while encoder is {:?}",
                self.state
            )));
        }
        self.state = EncoderState::Finalizing;
        tracing::debug!(frames = self.frames_appended, "encoder Writing -> Finalizing");

        drop(self.tx.take());
        let writer = self
            .writer
            .take()
            .ok_or_else(|| ReelError::internal("encoder is writing without a writer thread"))?;
        let mut sink = match writer.join() {
            Ok(sink) => sink,
            Err(_) => {
                self.state = EncoderState::Failed;
                return Err(ReelError::finalize_failed("encoder writer thread panicked"));
            }
        };

        if let Some(f) = self.shared.st.lock().failure.clone() {
            self.state = EncoderState::Failed;
            return Err(ReelError::sink_failed(f));
        }

        match sink.end() {
            Ok(()) => {
                self.state = EncoderState::Finished;
                tracing::debug!("encoder Finalizing -> Finished");
                Ok(self.cfg.out_path.clone())
            }
            Err(e) => {
                self.state = EncoderState::Failed;
                tracing::debug!(error = %e, "encoder Finalizing -> Failed");
                Err(match e {
                    ReelError::FinalizeFailed(_) => e,
                    other => ReelError::finalize_failed(other.to_string()),
                })
            }
        }
    }

    /// Abandon the encode: skip queued frames, join the writer, and release the sink.
    ///
    /// Leaves the encoder `Failed`. A no-op once the encoder is terminal.
    pub fn abort(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        {
            let mut st = self.shared.st.lock();
            if st.failure.is_none() {
                st.failure = Some("encode aborted".to_string());
            }
        }
        self.fail();
        if let Some(writer) = self.writer.take() {
            // Dropping the returned sink releases its resources (an ffmpeg child is killed).
            drop(writer.join());
        }
    }

    fn release_slot(&self) {
        let mut st = self.shared.st.lock();
        st.in_flight = st.in_flight.saturating_sub(1);
    }

    fn fail(&mut self) {
        if self.state != EncoderState::Failed {
            tracing::debug!(from = ?self.state, "encoder -> Failed");
        }
        self.state = EncoderState::Failed;
        drop(self.tx.take());
    }
}

impl Drop for VideoEncoder {
    fn drop(&mut self) {
        if self.tx.is_some() {
            // Abandoned mid-stream: tell the writer to skip whatever is still queued.
            let mut st = self.shared.st.lock();
            if st.failure.is_none() {
                st.failure = Some("encoder dropped before finish".to_string());
            }
        }
        drop(self.tx.take());
    }
}

fn writer_loop(
    mut sink: Box<dyn FrameSink>,
    rx: Receiver<QueuedFrame>,
    shared: Arc<Shared>,
) -> Box<dyn FrameSink> {
    for q in rx.iter() {
        let already_failed = shared.st.lock().failure.is_some();
        let res = if already_failed {
            Ok(())
        } else {
            sink.push_frame(q.idx, q.pts_secs, &q.buf)
        };
        drop(q.buf);

        let mut st = shared.st.lock();
        st.in_flight = st.in_flight.saturating_sub(1);
        match res {
            Ok(()) if !already_failed => st.frames_written += 1,
            Ok(()) => {}
            Err(e) => {
                tracing::debug!(frame = q.idx.0, error = %e, "sink rejected frame");
                st.failure = Some(e.to_string());
            }
        }
        drop(st);
        shared.cv.notify_all();
    }
    sink
}

fn as_cannot_open(e: ReelError) -> ReelError {
    match e {
        ReelError::CannotOpenSink(_) => e,
        other => ReelError::cannot_open_sink(other.to_string()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/encoder.rs"]
mod tests;
