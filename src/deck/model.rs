use std::sync::Arc;

/// Rectangle in native document units (EMU).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EmuRect {
    /// Left edge.
    pub x: i64,
    /// Top edge.
    pub y: i64,
    /// Width.
    pub cx: i64,
    /// Height.
    pub cy: i64,
}

impl EmuRect {
    /// Create a rectangle from offset and extent.
    pub fn new(x: i64, y: i64, cx: i64, cy: i64) -> Self {
        Self { x, y, cx, cy }
    }
}

/// A run of text with uniform styling.
#[derive(Clone, Debug, PartialEq)]
pub struct TextRun {
    /// Run text.
    pub text: String,
    /// 0-based paragraph index within its shape.
    pub paragraph: usize,
    /// Explicit font size in points.
    pub size_pt: Option<f32>,
}

/// Text-bearing shape.
#[derive(Clone, Debug, PartialEq)]
pub struct TextShape {
    /// Geometry in EMU.
    pub frame: EmuRect,
    /// Runs in document order.
    pub runs: Vec<TextRun>,
}

/// Picture shape carrying its encoded image bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct PictureShape {
    /// Geometry in EMU.
    pub frame: EmuRect,
    /// Encoded image (PNG, JPEG, ...).
    pub payload: Arc<Vec<u8>>,
}

/// The visual elements slidecast knows how to paint.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// Text block.
    Text(TextShape),
    /// Raster picture.
    Picture(PictureShape),
}

impl Shape {
    /// Geometry in EMU.
    pub fn frame(&self) -> EmuRect {
        match self {
            Shape::Text(t) => t.frame,
            Shape::Picture(p) => p.frame,
        }
    }
}

/// One slide: shapes in paint order plus optional presenter notes.
#[derive(Clone, Debug, PartialEq)]
pub struct Slide {
    /// 0-based position in the deck.
    pub index: usize,
    /// Shapes in document order; later shapes paint over earlier ones.
    pub shapes: Vec<Shape>,
    /// Presenter notes.
    pub notes: Option<String>,
}

/// Ordered slides. The order is the output segment order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Deck {
    /// Slides in presentation order; `slides[i].index == i`.
    pub slides: Vec<Slide>,
    /// Declared slide size in EMU.
    pub slide_size_emu: Option<(i64, i64)>,
}

impl Deck {
    /// Number of slides.
    pub fn len(&self) -> usize {
        self.slides.len()
    }

    /// Return `true` when the deck has no slides.
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }
}
