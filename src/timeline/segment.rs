use std::path::{Path, PathBuf};

use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::narration::tts::{NarrationTrack, SpeechSynthesizer};
use crate::workarea::WorkArea;

/// One slide's worth of video: a still image shown for `duration_secs`, optionally narrated.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    /// Slide index; segment order follows it.
    pub index: usize,
    /// Rasterized slide image (PNG in the work area).
    pub image: PathBuf,
    /// Synthesized narration, absent for silent slides.
    pub narration: Option<NarrationTrack>,
    /// Display duration in seconds. Equals the narration duration when narrated.
    pub duration_secs: f64,
}

impl Segment {
    /// Whether this segment carries narration audio.
    pub fn is_narrated(&self) -> bool {
        self.narration.is_some()
    }
}

/// Build the segment for slide `index`.
///
/// With narration text the synthesizer is invoked exactly once and its reported duration becomes
/// the segment duration. Without it the segment is silent and lasts `default_silent_secs`.
#[tracing::instrument(skip(image, narration, synth, work_area), fields(narrated = narration.is_some()))]
pub fn build_segment(
    index: usize,
    image: &Path,
    narration: Option<&str>,
    synth: &dyn SpeechSynthesizer,
    language: &str,
    work_area: &WorkArea,
    default_silent_secs: f64,
) -> SlidecastResult<Segment> {
    let text = narration.map(str::trim).filter(|t| !t.is_empty());
    let Some(text) = text else {
        if !default_silent_secs.is_finite() || default_silent_secs <= 0.0 {
            return Err(SlidecastError::validation(
                "default silent duration must be finite and > 0",
            ));
        }
        return Ok(Segment {
            index,
            image: image.to_path_buf(),
            narration: None,
            duration_secs: default_silent_secs,
        });
    };

    let out_path = work_area.narration_path(index, synth.file_extension())?;
    let track = synth
        .synthesize(text, language, &out_path)
        .map_err(|e| SlidecastError::synthesis(index, format!("{e:#}")))?;
    if !track.duration_secs.is_finite() || track.duration_secs <= 0.0 {
        return Err(SlidecastError::synthesis(
            index,
            format!(
                "synthesizer reported invalid duration {}",
                track.duration_secs
            ),
        ));
    }
    // Files the synthesizer chose to write elsewhere in the work area are cleaned up too.
    if track.path != out_path && track.path.starts_with(work_area.path()) {
        work_area.track(track.path.clone())?;
    }

    tracing::debug!(duration_secs = track.duration_secs, "narrated segment built");
    Ok(Segment {
        index,
        image: image.to_path_buf(),
        duration_secs: track.duration_secs,
        narration: Some(track),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/segment.rs"]
mod tests;
