use std::ops::Range;

use crate::deck::model::TextRun;
use crate::foundation::error::{SlidecastError, SlidecastResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub(crate) struct TextBrushRgba8 {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

/// Text of a shape flattened for layout: paragraphs become lines, and every run keeps the byte
/// range and pixel size it was given.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FlatText {
    pub(crate) text: String,
    pub(crate) sizes: Vec<(Range<usize>, f32)>,
}

impl FlatText {
    pub(crate) fn from_runs(runs: &[TextRun], default_px: f32) -> Self {
        let mut text = String::new();
        let mut sizes = Vec::with_capacity(runs.len());
        let mut paragraph = runs.first().map(|r| r.paragraph).unwrap_or(0);
        for run in runs {
            while paragraph < run.paragraph {
                text.push('\n');
                paragraph += 1;
            }
            let start = text.len();
            text.push_str(&run.text);
            let px = run
                .size_pt
                .filter(|pt| pt.is_finite() && *pt > 0.0)
                .map(|pt| pt * 96.0 / 72.0)
                .unwrap_or(default_px);
            sizes.push((start..text.len(), px));
        }
        Self { text, sizes }
    }

    pub(crate) fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Parley contexts plus the one font family all slide text uses.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    family_name: Option<String>,
}

impl TextLayoutEngine {
    /// Register `font_bytes` (when given) as the family used for every layout.
    pub(crate) fn new(font_bytes: Option<&[u8]>) -> Self {
        let mut font_ctx = parley::FontContext::default();
        let family_name = font_bytes.and_then(|bytes| {
            let families = font_ctx
                .collection
                .register_fonts(parley::fontique::Blob::from(bytes.to_vec()), None);
            let (family_id, _) = families.first()?;
            font_ctx
                .collection
                .family_name(*family_id)
                .map(str::to_string)
        });
        Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
        }
    }

    /// Lay out `flat` without wrapping; `\n` starts a new line.
    pub(crate) fn layout(
        &mut self,
        flat: &FlatText,
        default_px: f32,
        brush: TextBrushRgba8,
    ) -> SlidecastResult<parley::Layout<TextBrushRgba8>> {
        if !default_px.is_finite() || default_px <= 0.0 {
            return Err(SlidecastError::validation(
                "text size must be finite and > 0",
            ));
        }
        let family_name = self.family_name.clone().ok_or_else(|| {
            SlidecastError::rasterization("slide has text but no usable font is configured")
        })?;

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, &flat.text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(default_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));
        for (range, px) in &flat.sizes {
            if !range.is_empty() {
                builder.push(parley::style::StyleProperty::FontSize(*px), range.clone());
            }
        }

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(&flat.text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}
