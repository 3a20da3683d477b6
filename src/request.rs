use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{ReelError, ReelResult};

/// Frame rate used when a request does not specify one.
pub const DEFAULT_FRAME_RATE: u32 = 30;

/// Nominal output resolution.
///
/// Height is the nominal value; width is `trunc(height * aspect)`.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    /// 480 lines, 4:3.
    Sd,
    /// 720 lines, 16:9.
    #[default]
    Hd,
    /// 1080 lines, 16:9.
    FullHd,
}

impl Resolution {
    /// Nominal height in pixels.
    pub fn height(self) -> u32 {
        match self {
            Self::Sd => 480,
            Self::Hd => 720,
            Self::FullHd => 1080,
        }
    }

    /// Aspect ratio as `(w, h)`.
    pub fn aspect(self) -> (u32, u32) {
        match self {
            Self::Sd => (4, 3),
            Self::Hd | Self::FullHd => (16, 9),
        }
    }

    /// Width derived from the aspect ratio, truncated toward zero.
    pub fn width(self) -> u32 {
        let (aw, ah) = self.aspect();
        let w = f64::from(self.height()) * f64::from(aw) / f64::from(ah);
        w as u32
    }

    /// Pixel dimensions.
    pub fn canvas(self) -> Canvas {
        Canvas {
            width: self.width(),
            height: self.height(),
        }
    }
}

/// One immutable render request.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "RenderRequestRaw", into = "RenderRequestRaw")]
pub struct RenderRequest {
    text: String,
    duration_secs: f64,
    resolution: Resolution,
    frame_rate: u32,
}

impl RenderRequest {
    /// Build a request at the default frame rate.
    ///
    /// Rejects non-finite or non-positive durations.
    pub fn new(
        text: impl Into<String>,
        duration_secs: f64,
        resolution: Resolution,
    ) -> ReelResult<Self> {
        Self::with_frame_rate(text, duration_secs, resolution, DEFAULT_FRAME_RATE)
    }

    /// Build a request with an explicit integer frame rate.
    pub fn with_frame_rate(
        text: impl Into<String>,
        duration_secs: f64,
        resolution: Resolution,
        frame_rate: u32,
    ) -> ReelResult<Self> {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(ReelError::validation(format!(
                "duration must be finite and > 0 (got {duration_secs})"
            )));
        }
        if frame_rate == 0 {
            return Err(ReelError::validation("frame rate must be > 0"));
        }
        Ok(Self {
            text: text.into(),
            duration_secs,
            resolution,
            frame_rate,
        })
    }

    /// Text drawn on every frame.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Requested duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Requested resolution.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Requested integer frame rate.
    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    /// Frame rate as an [`Fps`] value.
    pub fn fps(&self) -> ReelResult<Fps> {
        Fps::integer(self.frame_rate)
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct RenderRequestRaw {
    text: String,
    duration_secs: f64,
    #[serde(default)]
    resolution: Resolution,
    #[serde(default = "default_frame_rate")]
    frame_rate: u32,
}

fn default_frame_rate() -> u32 {
    DEFAULT_FRAME_RATE
}

impl TryFrom<RenderRequestRaw> for RenderRequest {
    type Error = ReelError;

    fn try_from(raw: RenderRequestRaw) -> ReelResult<Self> {
        Self::with_frame_rate(raw.text, raw.duration_secs, raw.resolution, raw.frame_rate)
    }
}

impl From<RenderRequest> for RenderRequestRaw {
    fn from(r: RenderRequest) -> Self {
        Self {
            text: r.text,
            duration_secs: r.duration_secs,
            resolution: r.resolution,
            frame_rate: r.frame_rate,
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/request.rs"]
mod tests;
