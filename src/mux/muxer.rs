use std::path::Path;
use std::sync::Arc;

use crate::foundation::cancel::CancelToken;
use crate::foundation::error::ReelResult;
use crate::mux::composition::{Composition, TrimPolicy};
use crate::mux::export::{ExportBackend, ExportJob, ExportPreset, FfmpegExporter};
use crate::mux::probe::{AssetProbe, FfprobeProbe};

/// Combines a video-only file with an audio asset into one container.
#[derive(Clone)]
pub struct Muxer {
    probe: Arc<dyn AssetProbe>,
    exporter: Arc<dyn ExportBackend>,
    preset: ExportPreset,
    policy: TrimPolicy,
}

impl Default for Muxer {
    fn default() -> Self {
        Self::new(
            Arc::new(FfprobeProbe),
            Arc::new(FfmpegExporter),
            ExportPreset::default(),
            TrimPolicy::default(),
        )
    }
}

impl Muxer {
    /// Muxer using the given probe and export backend.
    pub fn new(
        probe: Arc<dyn AssetProbe>,
        exporter: Arc<dyn ExportBackend>,
        preset: ExportPreset,
        policy: TrimPolicy,
    ) -> Self {
        Self {
            probe,
            exporter,
            preset,
            policy,
        }
    }

    /// Trim policy applied to every composition.
    pub fn policy(&self) -> TrimPolicy {
        self.policy
    }

    /// Probe both assets, build the composition, and submit the export job.
    pub fn mux(&self, video_path: &Path, audio_path: &Path, out_path: &Path) -> ReelResult<ExportJob> {
        self.mux_with_cancel(video_path, audio_path, out_path, CancelToken::new())
    }

    /// Like [`Muxer::mux`], with the export bound to an existing cancellation token.
    ///
    /// Probe failures and missing tracks are returned before any job is submitted.
    #[tracing::instrument(skip(self, cancel), fields(video = %video_path.display(), audio = %audio_path.display()))]
    pub fn mux_with_cancel(
        &self,
        video_path: &Path,
        audio_path: &Path,
        out_path: &Path,
        cancel: CancelToken,
    ) -> ReelResult<ExportJob> {
        let video_info = self.probe.probe(video_path)?;
        let audio_info = self.probe.probe(audio_path)?;
        let composition = Composition::from_probes(
            video_path,
            &video_info,
            audio_path,
            &audio_info,
            self.policy,
        )?;

        tracing::info!(
            video_secs = composition.video().duration_secs,
            audio_secs = composition.audio().duration_secs,
            output_secs = composition.output_duration(),
            policy = ?self.policy,
            out = %out_path.display(),
            "submitting export"
        );
        ExportJob::submit(
            Arc::clone(&self.exporter),
            composition,
            out_path.to_path_buf(),
            self.preset,
            cancel,
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/mux/muxer.rs"]
mod tests;
