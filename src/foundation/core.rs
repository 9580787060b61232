use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::foundation::math::mul_div255_u16;

/// 0-based frame position in the output video.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Frames `[start, end)` during which one slide is on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    /// First frame showing the slide.
    pub start: FrameIndex,
    /// First frame after the slide.
    pub end: FrameIndex,
}

impl FrameRange {
    /// Number of frames in the span.
    pub fn len_frames(self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    /// Return `true` when `f` falls inside the span.
    pub fn contains(self, f: FrameIndex) -> bool {
        self.start.0 <= f.0 && f.0 < self.end.0
    }
}

/// Output frame rate as the rational `num/den` (e.g. `30000/1001`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Frames.
    pub num: u32,
    /// Per this many seconds.
    pub den: u32,
}

impl Fps {
    /// Both parts must be non-zero.
    pub fn new(num: u32, den: u32) -> SlidecastResult<Self> {
        if num == 0 || den == 0 {
            return Err(SlidecastError::validation(format!(
                "fps {num}/{den} must have a non-zero numerator and denominator"
            )));
        }
        Ok(Self { num, den })
    }

    /// Frame boundary nearest to `secs`; negative times clamp to frame 0.
    pub fn secs_to_frames_round(self, secs: f64) -> u64 {
        (secs * f64::from(self.num) / f64::from(self.den))
            .round()
            .max(0.0) as u64
    }

    /// Audio sample at which frame `frames` starts, rounded to nearest.
    ///
    /// Integer arithmetic, so NTSC rates stay exact over long decks.
    pub fn frames_to_samples(self, frames: u64, sample_rate: u32) -> u64 {
        let num = u128::from(frames) * u128::from(sample_rate) * u128::from(self.den);
        let den = u128::from(self.num);
        ((num + den / 2) / den) as u64
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self { num: 24, den: 1 }
    }
}

/// Output video size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// yuv420p subsamples chroma 2x2, so H.264 output needs even non-zero dimensions.
    pub fn check_encodable(self) -> SlidecastResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SlidecastError::validation(format!(
                "resolution {}x{} must be non-zero",
                self.width, self.height
            )));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(SlidecastError::validation(format!(
                "resolution {}x{} must be even (required for yuv420p output)",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Premultiplied RGBA8 colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    /// Red, premultiplied.
    pub r: u8,
    /// Green, premultiplied.
    pub g: u8,
    /// Blue, premultiplied.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Rgba8Premul {
    /// Premultiply a straight-alpha colour as it appears in config files.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        let a16 = u16::from(a);
        let scale = |c: u8| mul_div255_u16(u16::from(c), a16) as u8;
        Self {
            r: scale(r),
            g: scale(g),
            b: scale(b),
            a,
        }
    }

    /// `[r, g, b, a]`.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
