//! Frame clock: maps frame indices to presentation timestamps and decides when the requested
//! duration has elapsed.

use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{ReelError, ReelResult};

/// Lazy, finite, non-restartable sequence of `(FrameIndex, pts_secs)` pairs.
///
/// Yields `t_i = i / fps` for `i = 0, 1, 2, ...` and ends at the first `t_i >= duration`. That
/// sentinel timestamp is never yielded.
#[derive(Clone, Debug)]
pub struct FrameClock {
    fps: Fps,
    duration_secs: f64,
    next: u64,
    finished: bool,
}

impl FrameClock {
    /// Create a clock for `duration_secs` at `fps`.
    pub fn new(fps: Fps, duration_secs: f64) -> ReelResult<Self> {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(ReelError::validation(
                "frame clock duration must be finite and > 0",
            ));
        }
        Ok(Self {
            fps,
            duration_secs,
            next: 0,
            finished: false,
        })
    }

    /// Frame rate driving this clock.
    pub fn fps(&self) -> Fps {
        self.fps
    }

    /// Requested duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Presentation timestamp of `idx` in seconds.
    pub fn presentation_time(fps: Fps, idx: FrameIndex) -> f64 {
        fps.frames_to_secs(idx.0)
    }

    /// Number of frames the full sequence yields, i.e. `ceil(duration * fps)`.
    ///
    /// Uses the same comparison as iteration so the two can never disagree.
    pub fn total_frames(&self) -> u64 {
        let pts = |i: u64| self.fps.frames_to_secs(i);
        let mut n = (self.duration_secs * self.fps.as_f64()).ceil().max(0.0) as u64;
        while n > 0 && pts(n - 1) >= self.duration_secs {
            n -= 1;
        }
        while pts(n) < self.duration_secs {
            n += 1;
        }
        n
    }
}

impl Iterator for FrameClock {
    type Item = (FrameIndex, f64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let idx = FrameIndex(self.next);
        let pts = Self::presentation_time(self.fps, idx);
        if pts >= self.duration_secs {
            self.finished = true;
            return None;
        }
        self.next += 1;
        Some((idx, pts))
    }
}

impl std::iter::FusedIterator for FrameClock {}

#[cfg(test)]
#[path = "../tests/unit/clock.rs"]
mod tests;
