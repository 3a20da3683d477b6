use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;

use crate::foundation::core::Rgba8;
use crate::foundation::error::{ReelError, ReelResult};
use crate::mux::composition::TrimPolicy;
use crate::mux::export::ExportPreset;
use crate::render::frame::RendererOpts;
use crate::request::DEFAULT_FRAME_RATE;

/// Bundled audio asset: 10 s of a 440 Hz tone, 22.05 kHz mono PCM.
///
/// Resolved from the crate root, so it does not depend on the working directory.
pub const DEFAULT_AUDIO_ASSET: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/audio.wav");

/// Pipeline settings shared by every request of one [`crate::Pipeline`].
///
/// Every field has a default, so a JSON file only needs the keys it overrides.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineOpts {
    /// Frame rate for convenience constructors such as [`crate::render_video`].
    pub frame_rate: u32,
    /// Encoder queue depth and pixel buffer pool size.
    pub pool_capacity: usize,
    /// Frame styling.
    pub renderer: RendererOpts,
    /// Audio asset muxed onto every video. Read-only.
    pub audio_asset: PathBuf,
    /// Directory for intermediate and final files. `None` uses the system temp dir.
    pub scratch_dir: Option<PathBuf>,
    /// Final encoding preset.
    pub export_preset: ExportPreset,
    /// Video/audio length reconciliation.
    pub trim_policy: TrimPolicy,
    /// Per-stage wall-clock budget in seconds.
    pub stage_timeout_secs: Option<f64>,
    /// `SinkNotReady` retries tolerated per frame before giving up.
    pub max_not_ready_retries: u32,
    /// Keep the video-only intermediate after a successful mux.
    pub keep_intermediate: bool,
    /// Background used when flattening frames for the encoder.
    pub bg_rgba: Rgba8,
}

impl Default for PipelineOpts {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
            pool_capacity: 8,
            renderer: RendererOpts::default(),
            audio_asset: PathBuf::from(DEFAULT_AUDIO_ASSET),
            scratch_dir: None,
            export_preset: ExportPreset::default(),
            trim_policy: TrimPolicy::default(),
            stage_timeout_secs: None,
            max_not_ready_retries: 1000,
            keep_intermediate: false,
            bg_rgba: Rgba8::WHITE,
        }
    }
}

impl PipelineOpts {
    /// Load options from a JSON file and validate them.
    pub fn from_json_file(path: &Path) -> ReelResult<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        let opts: Self = serde_json::from_slice(&bytes).map_err(|e| {
            ReelError::validation(format!("invalid config '{}': {e}", path.display()))
        })?;
        opts.validate()?;
        Ok(opts)
    }

    /// Check value ranges.
    pub fn validate(&self) -> ReelResult<()> {
        if self.frame_rate == 0 {
            return Err(ReelError::validation("frame_rate must be > 0"));
        }
        if self.pool_capacity == 0 {
            return Err(ReelError::validation("pool_capacity must be >= 1"));
        }
        if let Some(t) = self.stage_timeout_secs
            && (!t.is_finite() || t <= 0.0)
        {
            return Err(ReelError::validation(
                "stage_timeout_secs must be finite and > 0",
            ));
        }
        if self.audio_asset.as_os_str().is_empty() {
            return Err(ReelError::validation("audio_asset must not be empty"));
        }
        self.renderer.validate()
    }

    /// Resolved scratch directory.
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Stage timeout as a [`Duration`].
    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout_secs
            .and_then(|s| Duration::try_from_secs_f64(s).ok())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/config.rs"]
mod tests;
