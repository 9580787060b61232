//! Conversion configuration.
//!
//! Every knob the pipeline needs travels in one [`PipelineConfig`] value that callers build in
//! code or load from JSON. Missing JSON fields take their defaults.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::foundation::core::{Fps, Resolution};
use crate::foundation::error::{SlidecastError, SlidecastResult};

/// EMU per pixel at 96 DPI (914 400 EMU per inch).
pub const DEFAULT_EMU_PER_PX: i64 = 12_700;

/// Where a slide's narration text comes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrationSource {
    /// Presenter notes only.
    Notes,
    /// Text of the slide's own shapes only.
    SlideText,
    /// Presenter notes when present, otherwise the slide's text.
    #[default]
    NotesOrSlideText,
}

/// Configuration for one conversion.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Output video resolution. Both dimensions must be even (yuv420p).
    pub resolution: Resolution,
    /// Output frame rate.
    pub fps: Fps,
    /// Slide background, straight-alpha RGBA8.
    pub background_rgba: [u8; 4],
    /// Text fill color, straight-alpha RGBA8.
    pub text_rgba: [u8; 4],
    /// Font file used for all slide text. `None` probes a few common system locations.
    pub font_path: Option<PathBuf>,
    /// Font size used for runs that carry no explicit size.
    pub default_font_px: f32,
    /// Native document units per output pixel, used when the deck declares no slide size or
    /// `fit_to_slide` is off.
    pub emu_per_px: i64,
    /// Scale each deck so its declared slide size fills `resolution`.
    pub fit_to_slide: bool,
    /// Duration of a slide without narration.
    pub default_silent_secs: f64,
    /// Narration text selection.
    pub narration_source: NarrationSource,
    /// Phrase spoken for slides whose narration text is empty. `None` keeps those slides silent.
    pub fallback_phrase: Option<String>,
    /// Language tag handed to the speech synthesizer.
    pub language: String,
    /// Process slides on a dedicated rayon pool.
    pub parallel: bool,
    /// Pool size in parallel mode; also bounds concurrent synthesizer calls.
    pub threads: Option<usize>,
    /// Parent directory for per-request work areas. `None` uses the system temp dir.
    pub work_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            fps: Fps::default(),
            background_rgba: [255, 255, 255, 255],
            text_rgba: [0, 0, 0, 255],
            font_path: None,
            default_font_px: 24.0,
            emu_per_px: DEFAULT_EMU_PER_PX,
            fit_to_slide: true,
            default_silent_secs: 2.0,
            narration_source: NarrationSource::default(),
            fallback_phrase: None,
            language: "en".to_string(),
            parallel: false,
            threads: None,
            work_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from a JSON reader and validate it.
    pub fn from_reader<R: std::io::Read>(r: R) -> SlidecastResult<Self> {
        let cfg: Self = serde_json::from_reader(r)
            .map_err(|e| SlidecastError::validation(format!("parse config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a configuration from a JSON file on disk and validate it.
    pub fn from_path(path: impl AsRef<Path>) -> SlidecastResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            SlidecastError::validation(format!("open config JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Check value ranges.
    pub fn validate(&self) -> SlidecastResult<()> {
        self.resolution.check_encodable()?;
        let Resolution { width, height } = self.resolution;
        if width > u32::from(u16::MAX) || height > u32::from(u16::MAX) {
            return Err(SlidecastError::validation("resolution exceeds 65535 pixels"));
        }
        Fps::new(self.fps.num, self.fps.den)?;
        if self.emu_per_px <= 0 {
            return Err(SlidecastError::validation("emu_per_px must be > 0"));
        }
        if !self.default_silent_secs.is_finite() || self.default_silent_secs <= 0.0 {
            return Err(SlidecastError::validation(
                "default_silent_secs must be finite and > 0",
            ));
        }
        if !self.default_font_px.is_finite() || self.default_font_px <= 0.0 {
            return Err(SlidecastError::validation(
                "default_font_px must be finite and > 0",
            ));
        }
        if let Some(phrase) = &self.fallback_phrase
            && phrase.trim().is_empty()
        {
            return Err(SlidecastError::validation(
                "fallback_phrase must not be blank when set",
            ));
        }
        if self.threads == Some(0) {
            return Err(SlidecastError::validation("threads must be >= 1 when set"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/config/config.rs"]
mod tests;
