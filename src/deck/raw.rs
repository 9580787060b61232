use std::sync::Arc;

use crate::deck::model::EmuRect;

/// Parser output for a whole document.
#[derive(Clone, Debug, Default)]
pub struct RawDeck {
    /// Slides in presentation order.
    pub slides: Vec<RawSlide>,
    /// Declared slide size, when the document states one.
    pub slide_size_emu: Option<(i64, i64)>,
}

/// Parser output for one slide.
#[derive(Clone, Debug, Default)]
pub struct RawSlide {
    /// Shapes in document (z) order.
    pub shapes: Vec<RawShape>,
    /// Presenter notes, as written (not trimmed).
    pub notes: Option<String>,
}

/// Shape-kind discriminator reported by the parser.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RawShapeKind {
    /// Auto shape or placeholder (`p:sp`).
    AutoShape,
    /// Picture (`p:pic`).
    Picture,
    /// Group of shapes (`p:grpSp`).
    Group,
    /// Table, chart or other embedded object (`p:graphicFrame`).
    GraphicFrame,
    /// Connector line (`p:cxnSp`).
    Connector,
}

/// One text run inside a paragraph.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawRun {
    /// Run text.
    pub text: String,
    /// Font size in hundredths of a point (`sz` attribute).
    pub size_centipoints: Option<u32>,
}

/// One paragraph of a text frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawParagraph {
    /// Runs in order.
    pub runs: Vec<RawRun>,
}

/// One shape as the parser saw it.
#[derive(Clone, Debug)]
pub struct RawShape {
    /// Shape kind discriminator.
    pub kind: RawShapeKind,
    /// Shape name from its non-visual properties.
    pub name: String,
    /// Resolved geometry (own transform or inherited placeholder transform).
    pub frame: Option<EmuRect>,
    /// Text frame, present when the shape carries a text body (possibly empty).
    pub text_frame: Option<Vec<RawParagraph>>,
    /// Encoded image bytes for pictures whose relationship resolved.
    pub image: Option<Arc<Vec<u8>>>,
}

impl RawShape {
    /// Construct a shape of `kind` with no geometry, text or image.
    pub fn new(kind: RawShapeKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            frame: None,
            text_frame: None,
            image: None,
        }
    }
}
