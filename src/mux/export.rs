use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::encode::ffmpeg::ensure_parent_dir;
use crate::foundation::cancel::CancelToken;
use crate::foundation::error::{ReelError, ReelResult};
use crate::mux::composition::Composition;

const CHILD_POLL: Duration = Duration::from_millis(20);

/// Export job lifecycle. Transitions are monotone; the last three are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    /// Submitted, worker not yet running.
    Waiting,
    /// Backend is writing the output.
    Exporting,
    /// Output written.
    Completed,
    /// Backend reported an error.
    Failed,
    /// Cancelled before completion.
    Cancelled,
}

impl ExportStatus {
    /// `Completed`, `Failed`, or `Cancelled`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    fn rank(self) -> u8 {
        match self {
            Self::Waiting => 0,
            Self::Exporting => 1,
            Self::Completed | Self::Failed | Self::Cancelled => 2,
        }
    }
}

/// Encoding preset for the final container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportPreset {
    /// x264 `medium`, CRF 23, AAC 128 kbps, MP4.
    #[default]
    Medium,
}

impl ExportPreset {
    /// x264 speed preset.
    pub fn x264_preset(self) -> &'static str {
        match self {
            Self::Medium => "medium",
        }
    }

    /// x264 constant rate factor.
    pub fn crf(self) -> u8 {
        match self {
            Self::Medium => 23,
        }
    }

    /// AAC bitrate as passed to `-b:a`.
    pub fn audio_bitrate(self) -> &'static str {
        match self {
            Self::Medium => "128k",
        }
    }
}

/// Writes a [`Composition`] into one output file.
///
/// Implementations must poll `cancel` and return `ExportCancelled` promptly once it fires.
pub trait ExportBackend: Send + Sync {
    /// Export `composition` to `out_path`. Blocks until done.
    fn export(
        &self,
        composition: &Composition,
        out_path: &Path,
        preset: ExportPreset,
        cancel: &CancelToken,
    ) -> ReelResult<()>;
}

/// [`ExportBackend`] backed by the system `ffmpeg` binary.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegExporter;

impl FfmpegExporter {
    fn command(composition: &Composition, out_path: &Path, preset: ExportPreset) -> Command {
        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.args(["-y", "-loglevel", "error"]);
        cmd.arg("-i").arg(&composition.video().source);
        cmd.arg("-i").arg(&composition.audio().source);
        cmd.args(["-map", "0:v:0", "-map", "1:a:0"]);
        cmd.args([
            "-c:v",
            "libx264",
            "-preset",
            preset.x264_preset(),
            "-crf",
            &preset.crf().to_string(),
            "-pix_fmt",
            "yuv420p",
            "-c:a",
            "aac",
            "-b:a",
            preset.audio_bitrate(),
        ]);
        if let Some(t) = composition.trim_secs() {
            cmd.args(["-t", &format!("{t:.6}")]);
        }
        cmd.args(["-movflags", "+faststart"]);
        cmd.arg(out_path);
        cmd
    }
}

impl ExportBackend for FfmpegExporter {
    #[tracing::instrument(skip(self, composition, cancel), fields(out = %out_path.display()))]
    fn export(
        &self,
        composition: &Composition,
        out_path: &Path,
        preset: ExportPreset,
        cancel: &CancelToken,
    ) -> ReelResult<()> {
        ensure_parent_dir(out_path)?;

        let mut cmd = Self::command(composition, out_path, preset);
        tracing::debug!(?cmd, "spawning ffmpeg export");
        let mut child = cmd
            .spawn()
            .map_err(|e| ReelError::export_failed(format!("failed to spawn ffmpeg: {e}")))?;

        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ReelError::export_failed("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            let _ = stderr.read_to_end(&mut bytes);
            bytes
        });

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if cancel.wait_timeout(CHILD_POLL) {
                        let _ = child.kill();
                        let _ = child.wait();
                        let _ = stderr_drain.join();
                        let _ = std::fs::remove_file(out_path);
                        return Err(ReelError::export_cancelled(
                            "export cancelled while ffmpeg was running",
                        ));
                    }
                }
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ReelError::export_failed(format!(
                        "failed to wait for ffmpeg: {e}"
                    )));
                }
            }
        };

        let stderr_bytes = stderr_drain.join().unwrap_or_default();
        if !status.success() {
            return Err(ReelError::export_failed(format!(
                "ffmpeg exited with status {}: {}",
                status,
                String::from_utf8_lossy(&stderr_bytes).trim()
            )));
        }
        if !out_path.is_file() {
            return Err(ReelError::export_failed(format!(
                "ffmpeg reported success but '{}' was not written",
                out_path.display()
            )));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct JobState {
    status: ExportStatus,
    error: Option<ReelError>,
}

impl JobState {
    /// Apply a forward transition; stale or backward transitions are ignored.
    fn advance(&mut self, next: ExportStatus) -> bool {
        if self.status.is_terminal() || next.rank() <= self.status.rank() {
            return false;
        }
        self.status = next;
        true
    }
}

/// Settles the job exactly once, even if the backend panics.
struct Settle {
    state: Arc<Mutex<JobState>>,
    done: Option<Sender<ExportStatus>>,
}

impl Settle {
    fn settle(&mut self, status: ExportStatus, error: Option<ReelError>) {
        let Some(done) = self.done.take() else {
            return;
        };
        let observed = {
            let mut st = self.state.lock();
            if st.advance(status) {
                st.error = error;
            }
            st.status
        };
        let _ = done.send(observed);
    }
}

impl Drop for Settle {
    fn drop(&mut self) {
        if self.done.is_some() {
            self.settle(
                ExportStatus::Failed,
                Some(ReelError::internal("export worker exited without settling")),
            );
        }
    }
}

/// Asynchronous export of one composition.
///
/// The worker thread settles exactly one terminal status and sends one completion notification.
pub struct ExportJob {
    out_path: PathBuf,
    state: Arc<Mutex<JobState>>,
    cancel: CancelToken,
    done: Receiver<ExportStatus>,
}

impl std::fmt::Debug for ExportJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportJob")
            .field("out_path", &self.out_path)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl ExportJob {
    /// Start exporting `composition` on a worker thread. The job starts in `Waiting`.
    ///
    /// `cancel` is shared with the backend; cancelling it (or calling [`ExportJob::cancel`])
    /// stops the export.
    pub fn submit(
        backend: Arc<dyn ExportBackend>,
        composition: Composition,
        out_path: PathBuf,
        preset: ExportPreset,
        cancel: CancelToken,
    ) -> ReelResult<Self> {
        let state = Arc::new(Mutex::new(JobState {
            status: ExportStatus::Waiting,
            error: None,
        }));
        let (tx, rx) = crossbeam_channel::bounded(1);

        let mut settle = Settle {
            state: Arc::clone(&state),
            done: Some(tx),
        };
        let worker_cancel = cancel.clone();
        let worker_out = out_path.clone();
        std::thread::Builder::new()
            .name("textreel-export".to_string())
            .spawn(move || {
                if worker_cancel.is_cancelled() {
                    settle.settle(ExportStatus::Cancelled, None);
                    return;
                }
                settle.state.lock().advance(ExportStatus::Exporting);
                tracing::debug!(out = %worker_out.display(), "export Waiting -> Exporting");

                match backend.export(&composition, &worker_out, preset, &worker_cancel) {
                    Ok(()) => settle.settle(ExportStatus::Completed, None),
                    Err(e @ (ReelError::ExportCancelled(_) | ReelError::Cancelled(_))) => {
                        settle.settle(ExportStatus::Cancelled, Some(e))
                    }
                    Err(e) => settle.settle(ExportStatus::Failed, Some(e)),
                }
            })
            .map_err(|e| ReelError::export_failed(format!("failed to spawn export worker: {e}")))?;

        Ok(Self {
            out_path,
            state,
            cancel,
            done: rx,
        })
    }

    /// Target file.
    pub fn out_path(&self) -> &Path {
        &self.out_path
    }

    /// Current status.
    pub fn status(&self) -> ExportStatus {
        self.state.lock().status
    }

    /// Request cancellation. Has no effect once the job is terminal.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Block until the job settles, then map its terminal status to a result.
    ///
    /// When `timeout` elapses first the job is cancelled, allowed to settle, and `Timeout` is
    /// returned.
    pub fn wait(self, timeout: Option<Duration>) -> ReelResult<PathBuf> {
        let notified = match timeout {
            None => self.done.recv().ok(),
            Some(t) => match self.done.recv_timeout(t) {
                Ok(s) => Some(s),
                Err(RecvTimeoutError::Timeout) => {
                    self.cancel();
                    let _ = self.done.recv();
                    return Err(ReelError::timeout(format!(
                        "export did not finish within {:.3}s",
                        t.as_secs_f64()
                    )));
                }
                Err(RecvTimeoutError::Disconnected) => None,
            },
        };

        let (status, error) = {
            let mut st = self.state.lock();
            (st.status, st.error.take())
        };
        if let Some(n) = notified
            && n != status
        {
            return Err(ReelError::internal(format!(
                "export notified {n:?} but settled as {status:?}"
            )));
        }
        export_outcome(status, error, &self.out_path)
    }
}

/// Map the status observed at completion to the job's result.
pub fn export_outcome(
    status: ExportStatus,
    error: Option<ReelError>,
    out_path: &Path,
) -> ReelResult<PathBuf> {
    match status {
        ExportStatus::Completed => Ok(out_path.to_path_buf()),
        ExportStatus::Failed => Err(error.unwrap_or_else(|| {
            ReelError::export_failed("export failed without an attached error")
        })),
        ExportStatus::Cancelled => {
            Err(error.unwrap_or_else(|| ReelError::export_cancelled("export was cancelled")))
        }
        ExportStatus::Waiting | ExportStatus::Exporting => Err(
            ReelError::unexpected_export_state(format!("completion observed in {status:?}")),
        ),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/mux/export.rs"]
mod tests;
