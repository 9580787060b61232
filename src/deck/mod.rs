//! Slide deck model and the document-parser boundary.
//!
//! A [`DocumentParser`] turns document bytes into a [`RawDeck`], which mirrors the document's
//! own shape tree. [`extract_deck`] then narrows it into the closed [`Shape`] model the renderer
//! and narration extractor consume.

pub(crate) mod extract;
pub(crate) mod model;
pub(crate) mod pptx;
pub(crate) mod raw;

use crate::foundation::error::SlidecastResult;

pub use extract::{extract_deck, extract_shapes, extract_slide};
pub use model::{Deck, EmuRect, PictureShape, Shape, Slide, TextRun, TextShape};
pub use pptx::PptxParser;
pub use raw::{RawDeck, RawParagraph, RawRun, RawShape, RawShapeKind, RawSlide};

/// Document parser collaborator: binary document in, ordered raw slides out.
///
/// Implementations must surface native positional units and raw image bytes unchanged.
pub trait DocumentParser: Send + Sync {
    /// Parse a whole document.
    fn parse(&self, bytes: &[u8]) -> SlidecastResult<RawDeck>;
}
