use crate::foundation::core::{Fps, FrameIndex, FrameRange, Resolution};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::render::backend::FrameRGBA;
use std::path::PathBuf;

/// Configuration provided to a [`FrameSink`] before the first still.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Output size in pixels.
    pub resolution: Resolution,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Narration bed, when the timeline has any narration.
    pub audio: Option<AudioInputConfig>,
}

/// Raw PCM narration bed handed to sinks that encode audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioInputConfig {
    /// Path to interleaved `f32le` PCM data.
    pub path: PathBuf,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
}

/// Consumer of a slideshow: one still image per segment, each held for a span of frames.
///
/// Spans arrive in order, start at frame 0 and leave no gaps.
pub trait FrameSink: Send {
    /// Called once before any still is pushed.
    fn begin(&mut self, cfg: SinkConfig) -> SlidecastResult<()>;
    /// Show `frame` for every frame of `span`.
    fn push_still(&mut self, span: FrameRange, frame: &FrameRGBA) -> SlidecastResult<()>;
    /// Called once after the last still.
    fn end(&mut self) -> SlidecastResult<()>;

    /// Whether `SinkConfig.audio` is consumed. When `false`, no narration bed is built.
    fn supports_audio(&self) -> bool {
        true
    }
}

/// Tracks the frame cursor shared by every sink: spans must be non-empty, contiguous from 0,
/// and sized like the configured output.
#[derive(Debug, Default)]
pub(crate) struct StillCursor {
    next: u64,
}

impl StillCursor {
    pub(crate) fn reset(&mut self) {
        self.next = 0;
    }

    pub(crate) fn advance(
        &mut self,
        cfg: &SinkConfig,
        span: FrameRange,
        frame: &FrameRGBA,
    ) -> SlidecastResult<()> {
        if span.start.0 != self.next || span.end.0 <= span.start.0 {
            return Err(SlidecastError::encoding(format!(
                "still span {}..{} does not continue at frame {}",
                span.start.0, span.end.0, self.next
            )));
        }
        let Resolution { width, height } = cfg.resolution;
        if frame.width != width || frame.height != height {
            return Err(SlidecastError::validation(format!(
                "still is {}x{}, sink expects {width}x{height}",
                frame.width, frame.height
            )));
        }
        self.next = span.end.0;
        Ok(())
    }
}

/// In-memory sink for tests and debugging. Keeps each still once, with its span.
///
/// Audio is declined unless the sink was created with [`InMemorySink::with_audio`].
#[derive(Debug, Default)]
pub struct InMemorySink {
    accepts_audio: bool,
    cfg: Option<SinkConfig>,
    cursor: StillCursor,
    stills: Vec<(FrameRange, FrameRGBA)>,
    ended: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink that asks for the narration bed.
    pub fn with_audio() -> Self {
        Self {
            accepts_audio: true,
            ..Self::default()
        }
    }

    /// Return the sink configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg.clone()
    }

    /// Total frames covered by the pushed stills.
    pub fn frame_count(&self) -> u64 {
        self.stills.iter().map(|(span, _)| span.len_frames()).sum()
    }

    /// Image shown at frame `idx`.
    pub fn frame(&self, idx: FrameIndex) -> Option<&FrameRGBA> {
        self.stills
            .iter()
            .find(|(span, _)| span.contains(idx))
            .map(|(_, img)| img)
    }

    /// Stills in push order.
    pub fn stills(&self) -> &[(FrameRange, FrameRGBA)] {
        &self.stills
    }

    /// Whether `end` has been called.
    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> SlidecastResult<()> {
        self.cfg = Some(cfg);
        self.cursor.reset();
        self.stills.clear();
        self.ended = false;
        Ok(())
    }

    fn push_still(&mut self, span: FrameRange, frame: &FrameRGBA) -> SlidecastResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| SlidecastError::encoding("in-memory sink not started"))?;
        self.cursor.advance(cfg, span, frame)?;
        self.stills.push((span, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> SlidecastResult<()> {
        self.ended = true;
        Ok(())
    }

    fn supports_audio(&self) -> bool {
        self.accepts_audio
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
