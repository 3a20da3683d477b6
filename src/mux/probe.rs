use std::path::Path;

use crate::foundation::error::{ReelError, ReelResult};

/// Kind of an elementary stream inside a media container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Picture track.
    Video,
    /// Sound track.
    Audio,
    /// Subtitles, data, attachments.
    Other,
}

/// One stream reported by a probe.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct StreamInfo {
    /// Stream kind.
    pub kind: MediaKind,
    /// Stream duration, when the container reports one.
    pub duration_secs: Option<f64>,
}

/// Probe result for one media file.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct MediaInfo {
    /// Container duration.
    pub duration_secs: f64,
    /// Streams in container order.
    pub streams: Vec<StreamInfo>,
}

impl MediaInfo {
    /// First stream of `kind`, if present.
    pub fn first(&self, kind: MediaKind) -> Option<&StreamInfo> {
        self.streams.iter().find(|s| s.kind == kind)
    }

    /// Whether at least one stream of `kind` exists.
    pub fn has(&self, kind: MediaKind) -> bool {
        self.first(kind).is_some()
    }

    /// Duration of the first stream of `kind`, falling back to the container duration.
    pub fn track_duration(&self, kind: MediaKind) -> Option<f64> {
        self.first(kind)
            .map(|s| s.duration_secs.unwrap_or(self.duration_secs))
    }
}

/// Loads media metadata for the muxer.
pub trait AssetProbe: Send + Sync {
    /// Inspect `path`. Unreadable or unparseable assets yield `AssetLoadFailed`.
    fn probe(&self, path: &Path) -> ReelResult<MediaInfo>;
}

/// [`AssetProbe`] backed by the system `ffprobe` binary.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfprobeProbe;

impl AssetProbe for FfprobeProbe {
    #[tracing::instrument(skip(self, path), fields(path = %path.display()))]
    fn probe(&self, path: &Path) -> ReelResult<MediaInfo> {
        if !path.is_file() {
            return Err(ReelError::asset_load_failed(format!(
                "'{}' does not exist or is not a file",
                path.display()
            )));
        }

        let out = std::process::Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(path)
            .output()
            .map_err(|e| ReelError::asset_load_failed(format!("failed to run ffprobe: {e}")))?;
        if !out.status.success() {
            return Err(ReelError::asset_load_failed(format!(
                "ffprobe failed for '{}': {}",
                path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        parse_ffprobe_json(&out.stdout)
    }
}

/// Parse `ffprobe -print_format json -show_streams -show_format` output.
pub fn parse_ffprobe_json(bytes: &[u8]) -> ReelResult<MediaInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        #[serde(default)]
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let parsed: ProbeOut = serde_json::from_slice(bytes)
        .map_err(|e| ReelError::asset_load_failed(format!("ffprobe json parse failed: {e}")))?;

    let streams: Vec<StreamInfo> = parsed
        .streams
        .iter()
        .map(|s| StreamInfo {
            kind: match s.codec_type.as_deref() {
                Some("video") => MediaKind::Video,
                Some("audio") => MediaKind::Audio,
                _ => MediaKind::Other,
            },
            duration_secs: s.duration.as_deref().and_then(parse_secs),
        })
        .collect();

    let duration_secs = parsed
        .format
        .and_then(|f| f.duration)
        .as_deref()
        .and_then(parse_secs)
        .or_else(|| {
            streams
                .iter()
                .filter_map(|s| s.duration_secs)
                .reduce(f64::max)
        })
        .ok_or_else(|| ReelError::asset_load_failed("ffprobe reported no duration"))?;

    Ok(MediaInfo {
        duration_secs,
        streams,
    })
}

fn parse_secs(s: &str) -> Option<f64> {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

#[cfg(test)]
#[path = "../../tests/unit/mux/probe.rs"]
mod tests;
