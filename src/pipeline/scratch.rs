use std::path::{Path, PathBuf};

use anyhow::Context as _;
use uuid::Uuid;

use crate::foundation::error::ReelResult;

/// Intermediate and final output paths for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScratchPaths {
    /// Video-only encoder output.
    pub video: PathBuf,
    /// Muxed audio+video output.
    pub final_out: PathBuf,
}

impl ScratchPaths {
    /// Paths `<dir>/textreel-<id>-video.mp4` and `<dir>/textreel-<id>-final.mp4`.
    pub fn for_request(dir: &Path, id: Uuid) -> Self {
        Self {
            video: dir.join(format!("textreel-{id}-video.mp4")),
            final_out: dir.join(format!("textreel-{id}-final.mp4")),
        }
    }

    /// Create the directory and delete any stale files at both paths.
    pub fn prepare(&self) -> ReelResult<()> {
        for p in [&self.video, &self.final_out] {
            if let Some(parent) = p.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create scratch directory '{}'", parent.display())
                })?;
            }
            remove_if_exists(p)?;
        }
        Ok(())
    }

    /// Best-effort removal of the video-only intermediate.
    pub fn discard_intermediate(&self) {
        discard(&self.video);
    }

    /// Best-effort removal of both files after a failed request.
    pub fn discard_all(&self) {
        discard(&self.video);
        discard(&self.final_out);
    }
}

fn remove_if_exists(path: &Path) -> ReelResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed stale scratch file");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(anyhow::Error::new(e)
            .context(format!("failed to remove stale file '{}'", path.display()))
            .into()),
    }
}

fn discard(path: &Path) {
    if let Err(e) = remove_if_exists(path) {
        tracing::warn!(path = %path.display(), error = %e, "scratch cleanup failed");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/scratch.rs"]
mod tests;
