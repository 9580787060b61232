use crate::encode::sink::{AudioInputConfig, FrameSink, SinkConfig};
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::{Fps, FrameIndex, FrameRange, Resolution};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::render::backend::FrameRGBA;
use crate::timeline::segment::Segment;

/// Segments ordered by slide index and laid end to end.
#[derive(Clone, Debug, PartialEq)]
pub struct Timeline {
    segments: Vec<Segment>,
}

/// Counters reported by [`Timeline::materialize`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MaterializeStats {
    /// Segments streamed into the sink.
    pub segments: usize,
    /// Frames pushed into the sink.
    pub frames_total: u64,
}

impl Timeline {
    /// Order `segments` by slide index.
    ///
    /// Segments may arrive in any completion order. Indices must be exactly `0..n`.
    pub fn assemble(mut segments: Vec<Segment>) -> SlidecastResult<Self> {
        if segments.is_empty() {
            return Err(SlidecastError::validation("timeline has no segments"));
        }
        segments.sort_by_key(|s| s.index);
        for (expected, seg) in segments.iter().enumerate() {
            if seg.index != expected {
                return Err(SlidecastError::validation(format!(
                    "timeline segment indices must be contiguous from 0: expected {expected}, got {}",
                    seg.index
                )));
            }
            if !seg.duration_secs.is_finite() || seg.duration_secs <= 0.0 {
                return Err(SlidecastError::validation(format!(
                    "segment {} has invalid duration {}",
                    seg.index, seg.duration_secs
                )));
            }
        }
        Ok(Self { segments })
    }

    /// Segments in playback order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always `false` for an assembled timeline.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Sum of segment durations.
    pub fn total_duration_secs(&self) -> f64 {
        self.segments.iter().map(|s| s.duration_secs).sum()
    }

    /// Start time of each segment; segment `i` starts where `i - 1` ends.
    pub fn segment_starts_secs(&self) -> Vec<f64> {
        let mut t = 0.0;
        self.segments
            .iter()
            .map(|s| {
                let start = t;
                t += s.duration_secs;
                start
            })
            .collect()
    }

    /// Frame span of each segment at `fps`.
    ///
    /// Boundaries are rounded from cumulative time, so rounding error never accumulates. Each
    /// segment keeps at least one frame; spans are contiguous and start at frame 0.
    pub fn frame_spans(&self, fps: Fps) -> Vec<FrameRange> {
        let mut spans = Vec::with_capacity(self.segments.len());
        let mut cumulative = 0.0;
        let mut start = 0u64;
        for seg in &self.segments {
            cumulative += seg.duration_secs;
            let end = fps.secs_to_frames_round(cumulative).max(start + 1);
            spans.push(FrameRange {
                start: FrameIndex(start),
                end: FrameIndex(end),
            });
            start = end;
        }
        spans
    }

    /// Total frame count at `fps`.
    pub fn total_frames(&self, fps: Fps) -> u64 {
        self.frame_spans(fps).last().map_or(0, |r| r.end.0)
    }

    /// Stream the timeline into `sink`: each segment's image is held over its frame span.
    ///
    /// Any sink failure is reported as an encoding error.
    #[tracing::instrument(skip_all, fields(segments = self.segments.len()))]
    pub fn materialize(
        &self,
        sink: &mut dyn FrameSink,
        resolution: Resolution,
        fps: Fps,
        audio: Option<AudioInputConfig>,
        cancel: &CancelToken,
    ) -> SlidecastResult<MaterializeStats> {
        let spans = self.frame_spans(fps);
        let mut stats = MaterializeStats::default();

        sink.begin(SinkConfig {
            resolution,
            fps,
            audio,
        })
        .map_err(into_encoding)?;

        for (seg, span) in self.segments.iter().zip(spans) {
            cancel.check()?;
            let frame = FrameRGBA::load_png(&seg.image)?;
            if frame.width != resolution.width || frame.height != resolution.height {
                return Err(SlidecastError::validation(format!(
                    "slide {} image is {}x{}, expected {}x{}",
                    seg.index, frame.width, frame.height, resolution.width, resolution.height
                )));
            }
            sink.push_still(span, &frame).map_err(into_encoding)?;
            stats.segments += 1;
            stats.frames_total += span.len_frames();
        }

        sink.end().map_err(into_encoding)?;
        tracing::debug!(frames = stats.frames_total, "timeline materialized");
        Ok(stats)
    }
}

fn into_encoding(e: SlidecastError) -> SlidecastError {
    match e {
        SlidecastError::Encoding(_) | SlidecastError::Cancelled => e,
        other => SlidecastError::encoding(other.to_string()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/assemble.rs"]
mod tests;
