use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use uuid::Uuid;

use crate::clock::FrameClock;
use crate::encode::encoder::{EncoderConfig, VideoEncoder};
use crate::encode::ffmpeg::FfmpegSinkFactory;
use crate::encode::sink::{SinkFactory, VideoCodec};
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::Canvas;
use crate::foundation::error::{PipelineResult, ReelError, ReelResult};
use crate::mux::export::{ExportBackend, FfmpegExporter};
use crate::mux::muxer::Muxer;
use crate::mux::probe::{AssetProbe, FfprobeProbe};
use crate::pipeline::config::PipelineOpts;
use crate::pipeline::scratch::ScratchPaths;
use crate::render::frame::FrameRenderer;
use crate::request::{RenderRequest, Resolution};

type Deliver = Box<dyn FnOnce(PipelineResult) + Send + 'static>;

/// External collaborators of a [`Pipeline`].
#[derive(Clone)]
pub struct PipelineBackends {
    /// Opens the encoder sink for each request.
    pub sinks: Arc<dyn SinkFactory>,
    /// Inspects the intermediate video and the audio asset.
    pub probe: Arc<dyn AssetProbe>,
    /// Writes the final container.
    pub exporter: Arc<dyn ExportBackend>,
}

impl PipelineBackends {
    /// Backends that shell out to `ffmpeg` and `ffprobe`.
    pub fn ffmpeg(opts: &PipelineOpts) -> Self {
        Self {
            sinks: Arc::new(FfmpegSinkFactory {
                bg_rgba: opts.bg_rgba.to_array(),
            }),
            probe: Arc::new(FfprobeProbe),
            exporter: Arc::new(FfmpegExporter),
        }
    }
}

/// Counters reported when a request finishes.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize)]
pub struct RenderStats {
    /// Frames accepted by the encoder.
    pub frames_rendered: u64,
    /// `SinkNotReady` rejections that were retried.
    pub not_ready_retries: u64,
    /// Output frame size.
    pub canvas: Option<Canvas>,
}

/// Identity and control of an in-flight request.
#[derive(Clone, Debug)]
pub struct RenderTicket {
    id: Uuid,
    cancel: CancelToken,
    finished: Arc<AtomicBool>,
}

impl RenderTicket {
    /// Request id; also keys the scratch file names.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Ask the worker to stop. The result is still delivered, as `Cancelled`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the result has been delivered.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

/// Handle to a request started with [`Pipeline::render`].
///
/// The result can be taken once.
#[derive(Debug)]
pub struct RenderHandle {
    ticket: RenderTicket,
    rx: Receiver<PipelineResult>,
    taken: AtomicBool,
}

impl RenderHandle {
    /// Request id.
    pub fn id(&self) -> Uuid {
        self.ticket.id
    }

    /// Ask the worker to stop.
    pub fn cancel(&self) {
        self.ticket.cancel();
    }

    /// Whether the result is available (or was already taken).
    pub fn is_finished(&self) -> bool {
        self.ticket.is_finished()
    }

    /// Control handle that can be shared with other threads.
    pub fn ticket(&self) -> RenderTicket {
        self.ticket.clone()
    }

    /// Block until the result is delivered.
    pub fn wait(self) -> PipelineResult {
        if self.taken.swap(true, Ordering::SeqCst) {
            return Err(ReelError::invalid_state("render result was already taken"));
        }
        self.rx
            .recv()
            .unwrap_or_else(|_| Err(ReelError::internal("render worker exited without a result")))
    }

    /// Wait up to `timeout`. Returns `None` if the result is not ready yet or was already taken.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<PipelineResult> {
        if self.taken.load(Ordering::SeqCst) {
            return None;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(r) => {
                self.taken.store(true, Ordering::SeqCst);
                Some(r)
            }
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                self.taken.store(true, Ordering::SeqCst);
                Some(Err(ReelError::internal(
                    "render worker exited without a result",
                )))
            }
        }
    }
}

/// Delivers a request's result exactly once.
///
/// Dropped without delivering (worker panic, failed thread spawn) it reports `Internal`.
struct DeliveryGuard {
    id: Uuid,
    deliver: Option<Deliver>,
    finished: Arc<AtomicBool>,
}

impl DeliveryGuard {
    fn deliver(&mut self, result: PipelineResult) {
        let Some(deliver) = self.deliver.take() else {
            tracing::error!(id = %self.id, "render result delivered twice; dropping the second");
            return;
        };
        self.finished.store(true, Ordering::SeqCst);
        deliver(result);
    }
}

impl Drop for DeliveryGuard {
    fn drop(&mut self) {
        if self.deliver.is_some() {
            tracing::error!(id = %self.id, "render worker ended without delivering a result");
            self.deliver(Err(ReelError::internal(
                "render worker ended without delivering a result",
            )));
        }
    }
}

struct Inner {
    opts: PipelineOpts,
    sinks: Arc<dyn SinkFactory>,
    muxer: Muxer,
}

/// Non-blocking text-to-video service.
///
/// Each request runs on its own worker thread: render frames, encode them, mux the audio asset,
/// then deliver one result. Cloning shares the same configuration and backends.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<Inner>,
}

impl Pipeline {
    /// Pipeline with the `ffmpeg`/`ffprobe` backends.
    pub fn new(opts: PipelineOpts) -> ReelResult<Self> {
        let backends = PipelineBackends::ffmpeg(&opts);
        Self::with_backends(opts, backends)
    }

    /// Pipeline with explicit backends.
    pub fn with_backends(opts: PipelineOpts, backends: PipelineBackends) -> ReelResult<Self> {
        opts.validate()?;
        let muxer = Muxer::new(
            backends.probe,
            backends.exporter,
            opts.export_preset,
            opts.trim_policy,
        );
        Ok(Self {
            inner: Arc::new(Inner {
                opts,
                sinks: backends.sinks,
                muxer,
            }),
        })
    }

    /// Options in effect.
    pub fn opts(&self) -> &PipelineOpts {
        &self.inner.opts
    }

    /// Start a request and return immediately.
    pub fn render(&self, request: RenderRequest) -> RenderHandle {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let ticket = self.spawn(
            request,
            Box::new(move |result: PipelineResult| {
                let _ = tx.send(result);
            }),
        );
        RenderHandle {
            ticket,
            rx,
            taken: AtomicBool::new(false),
        }
    }

    /// Start a request; `callback` receives the result exactly once, on the worker thread.
    pub fn render_with<F>(&self, request: RenderRequest, callback: F) -> RenderTicket
    where
        F: FnOnce(PipelineResult) + Send + 'static,
    {
        self.spawn(request, Box::new(callback))
    }

    /// Run a request and block until its result.
    pub fn render_blocking(&self, request: RenderRequest) -> PipelineResult {
        self.render(request).wait()
    }

    fn spawn(&self, request: RenderRequest, deliver: Deliver) -> RenderTicket {
        let ticket = RenderTicket {
            id: Uuid::new_v4(),
            cancel: CancelToken::new(),
            finished: Arc::new(AtomicBool::new(false)),
        };
        let mut guard = DeliveryGuard {
            id: ticket.id,
            deliver: Some(deliver),
            finished: Arc::clone(&ticket.finished),
        };
        let inner = Arc::clone(&self.inner);
        let cancel = ticket.cancel.clone();
        let id = ticket.id;

        let spawned = std::thread::Builder::new()
            .name(format!("textreel-render-{id}"))
            .spawn(move || {
                let result = inner.run(id, &request, &cancel);
                guard.deliver(result);
            });
        if let Err(e) = spawned {
            // The closure (and the guard inside it) was dropped, which delivered `Internal`.
            tracing::error!(%id, error = %e, "failed to spawn render worker");
        }
        ticket
    }
}

impl Inner {
    #[tracing::instrument(skip(self, request, cancel), fields(
        resolution = ?request.resolution(),
        duration_secs = request.duration_secs(),
    ))]
    fn run(&self, id: Uuid, request: &RenderRequest, cancel: &CancelToken) -> PipelineResult {
        let started = Instant::now();
        tracing::info!(text_len = request.text().len(), "render request started");

        let paths = ScratchPaths::for_request(&self.opts.scratch_dir(), id);
        let mut stats = RenderStats::default();
        let result = self.run_stages(request, &paths, cancel, &mut stats);

        match &result {
            Ok(out) => {
                if !self.opts.keep_intermediate {
                    paths.discard_intermediate();
                }
                tracing::info!(
                    out = %out.display(),
                    frames = stats.frames_rendered,
                    not_ready_retries = stats.not_ready_retries,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "render request completed"
                );
            }
            Err(e) => {
                paths.discard_all();
                tracing::error!(
                    kind = ?e.kind(),
                    error = %e,
                    frames = stats.frames_rendered,
                    "render request failed"
                );
            }
        }
        result
    }

    fn run_stages(
        &self,
        request: &RenderRequest,
        paths: &ScratchPaths,
        cancel: &CancelToken,
        stats: &mut RenderStats,
    ) -> PipelineResult {
        let canvas = request.resolution().canvas();
        stats.canvas = Some(canvas);
        let fps = request.fps()?;
        let clock = FrameClock::new(fps, request.duration_secs())?;
        check_cancel(cancel)?;

        paths.prepare()?;
        let mut renderer = FrameRenderer::new(self.opts.renderer.clone())?;

        let mut encoder = VideoEncoder::new(EncoderConfig {
            out_path: paths.video.clone(),
            canvas,
            fps,
            codec: VideoCodec::H264,
            capacity: self.opts.pool_capacity,
        })?;
        encoder.start(self.sinks.as_ref())?;

        let video = match self.encode_frames(&mut encoder, &mut renderer, request, clock, cancel, stats)
        {
            Ok(()) => encoder.finish(),
            Err(e) => {
                encoder.abort();
                Err(e)
            }
        }?;
        check_cancel(cancel)?;

        let job = self.muxer.mux_with_cancel(
            &video,
            &self.opts.audio_asset,
            &paths.final_out,
            cancel.clone(),
        )?;
        match job.wait(self.opts.stage_timeout()) {
            Ok(out) => Ok(out),
            Err(e @ ReelError::Timeout(_)) => Err(e),
            Err(_) if cancel.is_cancelled() => {
                Err(ReelError::cancelled("request cancelled during export"))
            }
            Err(e) => Err(e),
        }
    }

    fn encode_frames(
        &self,
        encoder: &mut VideoEncoder,
        renderer: &mut FrameRenderer,
        request: &RenderRequest,
        clock: FrameClock,
        cancel: &CancelToken,
        stats: &mut RenderStats,
    ) -> ReelResult<()> {
        let deadline = self.opts.stage_timeout().map(|t| Instant::now() + t);
        tracing::debug!(frames = clock.total_frames(), "encoding frames");

        for (idx, pts) in clock {
            let mut retries = 0u32;
            loop {
                check_cancel(cancel)?;
                encoder.wait_ready(cancel, remaining(deadline)?)?;
                let mut buf = encoder.checkout_buffer()?;
                renderer.render_into(request.text(), &mut buf)?;
                match encoder.append(buf, pts) {
                    Ok(()) => break,
                    Err(e) if e.is_transient() => {
                        retries += 1;
                        stats.not_ready_retries += 1;
                        if retries > self.opts.max_not_ready_retries {
                            return Err(ReelError::sink_failed(format!(
                                "frame {} still not accepted after {retries} retries: {e}",
                                idx.0
                            )));
                        }
                        tracing::warn!(frame = idx.0, retries, "sink not ready; retrying frame");
                    }
                    Err(e) => return Err(e),
                }
            }
            stats.frames_rendered += 1;
        }
        Ok(())
    }
}

fn check_cancel(cancel: &CancelToken) -> ReelResult<()> {
    if cancel.is_cancelled() {
        return Err(ReelError::cancelled("render request cancelled"));
    }
    Ok(())
}

fn remaining(deadline: Option<Instant>) -> ReelResult<Option<Duration>> {
    match deadline {
        None => Ok(None),
        Some(d) => {
            let now = Instant::now();
            if now >= d {
                return Err(ReelError::timeout("encode stage exceeded its timeout"));
            }
            Ok(Some(d - now))
        }
    }
}

/// Render `text` for `duration_secs` at `resolution` with default options.
///
/// Returns as soon as the request is started; see [`RenderHandle::wait`].
pub fn render_video(
    text: &str,
    duration_secs: f64,
    resolution: Resolution,
) -> ReelResult<RenderHandle> {
    let opts = PipelineOpts::default();
    let request = RenderRequest::with_frame_rate(text, duration_secs, resolution, opts.frame_rate)?;
    let pipeline = Pipeline::new(opts)?;
    Ok(pipeline.render(request))
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/service.rs"]
mod tests;
