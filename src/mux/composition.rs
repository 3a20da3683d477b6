use std::path::{Path, PathBuf};

use crate::foundation::error::{ReelError, ReelResult};
use crate::mux::probe::{MediaInfo, MediaKind};

/// How the composition reconciles a video and an audio track of different lengths.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrimPolicy {
    /// Truncate the output to the shorter of the two tracks.
    #[default]
    Shortest,
    /// Keep the full video; audio is cut or runs out early.
    Video,
    /// Insert both tracks at their native lengths and let the container decide.
    Independent,
}

/// Range `[start_secs, start_secs + duration_secs)` of one track from one source file.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct TrackRange {
    /// Source file.
    pub source: PathBuf,
    /// Track kind taken from the source.
    pub kind: MediaKind,
    /// Offset into the source.
    pub start_secs: f64,
    /// Length taken from the source.
    pub duration_secs: f64,
}

/// One video range and one audio range, both inserted at composition time zero.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Composition {
    video: TrackRange,
    audio: TrackRange,
    policy: TrimPolicy,
}

impl Composition {
    /// Pair a video range with an audio range.
    pub fn new(video: TrackRange, audio: TrackRange, policy: TrimPolicy) -> ReelResult<Self> {
        if video.kind != MediaKind::Video {
            return Err(ReelError::validation("first composition track must be video"));
        }
        if audio.kind != MediaKind::Audio {
            return Err(ReelError::validation("second composition track must be audio"));
        }
        for r in [&video, &audio] {
            if !r.duration_secs.is_finite() || r.duration_secs <= 0.0 {
                return Err(ReelError::validation(format!(
                    "track from '{}' has no usable duration ({})",
                    r.source.display(),
                    r.duration_secs
                )));
            }
        }
        Ok(Self {
            video,
            audio,
            policy,
        })
    }

    /// Build from probe results, taking the full first video and first audio track.
    ///
    /// A source lacking its track yields `MissingTrack`.
    pub fn from_probes(
        video_path: &Path,
        video_info: &MediaInfo,
        audio_path: &Path,
        audio_info: &MediaInfo,
        policy: TrimPolicy,
    ) -> ReelResult<Self> {
        let video_secs = video_info
            .track_duration(MediaKind::Video)
            .ok_or_else(|| {
                ReelError::missing_track(format!(
                    "'{}' has no video track",
                    video_path.display()
                ))
            })?;
        let audio_secs = audio_info
            .track_duration(MediaKind::Audio)
            .ok_or_else(|| {
                ReelError::missing_track(format!(
                    "'{}' has no audio track",
                    audio_path.display()
                ))
            })?;

        Self::new(
            TrackRange {
                source: video_path.to_path_buf(),
                kind: MediaKind::Video,
                start_secs: 0.0,
                duration_secs: video_secs,
            },
            TrackRange {
                source: audio_path.to_path_buf(),
                kind: MediaKind::Audio,
                start_secs: 0.0,
                duration_secs: audio_secs,
            },
            policy,
        )
    }

    /// Video range.
    pub fn video(&self) -> &TrackRange {
        &self.video
    }

    /// Audio range.
    pub fn audio(&self) -> &TrackRange {
        &self.audio
    }

    /// Trim policy in effect.
    pub fn policy(&self) -> TrimPolicy {
        self.policy
    }

    /// Explicit output length, or `None` when both tracks keep their native lengths.
    pub fn trim_secs(&self) -> Option<f64> {
        match self.policy {
            TrimPolicy::Shortest => Some(self.video.duration_secs.min(self.audio.duration_secs)),
            TrimPolicy::Video => Some(self.video.duration_secs),
            TrimPolicy::Independent => None,
        }
    }

    /// Expected length of the exported file.
    pub fn output_duration(&self) -> f64 {
        self.trim_secs()
            .unwrap_or_else(|| self.video.duration_secs.max(self.audio.duration_secs))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/mux/composition.rs"]
mod tests;
