use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;

use crate::config::PipelineConfig;
use crate::foundation::core::{Resolution, Rgba8Premul};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::foundation::math::{premultiply_rgba8_in_place, unpremultiply_rgba8_in_place};
use crate::render::units::NormalizedElement;

/// Font files tried, in order, when the configuration names none.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// A rendered frame as premultiplied RGBA8 pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
}

impl FrameRGBA {
    /// A frame filled with one color.
    pub fn solid(width: u32, height: u32, color: Rgba8Premul) -> Self {
        let px = color.to_array();
        let mut data = vec![0u8; (width as usize) * (height as usize) * 4];
        for chunk in data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Premultiplied pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Write the frame as a straight-alpha PNG.
    pub fn save_png(&self, path: &Path) -> SlidecastResult<()> {
        let mut straight = self.data.clone();
        unpremultiply_rgba8_in_place(&mut straight);
        image::save_buffer_with_format(
            path,
            &straight,
            self.width,
            self.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }

    /// Load a PNG written by [`FrameRGBA::save_png`].
    pub fn load_png(path: &Path) -> SlidecastResult<Self> {
        let img = image::open(path).with_context(|| format!("read png '{}'", path.display()))?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut data = rgba.into_raw();
        premultiply_rgba8_in_place(&mut data);
        Ok(Self {
            width,
            height,
            data,
        })
    }
}

/// Turns one slide's normalized elements into a frame.
///
/// Implementations paint in element order. The in-process [`crate::render::cpu::CpuSlideRenderer`]
/// is the default; an office-suite automation renderer would plug in here as another kind.
pub trait SlideRenderer: Send {
    /// Rasterize elements onto a fresh canvas of the configured resolution.
    fn render(&mut self, elements: &[NormalizedElement]) -> SlidecastResult<FrameRGBA>;
}

/// Available renderer kinds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RendererKind {
    /// CPU rasterizer powered by `vello_cpu`.
    #[default]
    Cpu,
}

/// Renderer settings shared by all workers of one conversion.
#[derive(Clone, Debug)]
pub struct RenderSettings {
    /// Canvas size.
    pub resolution: Resolution,
    /// Canvas clear color, straight alpha.
    pub background_rgba: [u8; 4],
    /// Text fill color, straight alpha.
    pub text_rgba: [u8; 4],
    /// Size for runs without an explicit size.
    pub default_font_px: f32,
    /// Font file bytes; text cannot be painted without one.
    pub font: Option<Arc<Vec<u8>>>,
}

impl RenderSettings {
    /// Build settings from a configuration, loading the font file once.
    pub fn from_config(cfg: &PipelineConfig) -> SlidecastResult<Self> {
        Ok(Self {
            resolution: cfg.resolution,
            background_rgba: cfg.background_rgba,
            text_rgba: cfg.text_rgba,
            default_font_px: cfg.default_font_px,
            font: load_font(cfg.font_path.as_deref())?,
        })
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        let cfg = PipelineConfig::default();
        Self {
            resolution: cfg.resolution,
            background_rgba: cfg.background_rgba,
            text_rgba: cfg.text_rgba,
            default_font_px: cfg.default_font_px,
            font: None,
        }
    }
}

/// Read the configured font, or the first system font found when none is configured.
pub fn load_font(path: Option<&Path>) -> SlidecastResult<Option<Arc<Vec<u8>>>> {
    if let Some(path) = path {
        let bytes = std::fs::read(path).map_err(|e| {
            SlidecastError::validation(format!("read font '{}': {e}", path.display()))
        })?;
        return Ok(Some(Arc::new(bytes)));
    }
    for candidate in SYSTEM_FONT_CANDIDATES.iter().map(PathBuf::from) {
        if let Ok(bytes) = std::fs::read(&candidate) {
            tracing::debug!(font = %candidate.display(), "using system font");
            return Ok(Some(Arc::new(bytes)));
        }
    }
    tracing::warn!("no font configured or found; slides with text will fail to render");
    Ok(None)
}

/// Create a renderer implementation.
pub fn create_renderer(kind: RendererKind, settings: &RenderSettings) -> Box<dyn SlideRenderer> {
    match kind {
        RendererKind::Cpu => Box::new(crate::render::cpu::CpuSlideRenderer::new(settings.clone())),
    }
}
