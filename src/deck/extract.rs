use crate::deck::model::{Deck, PictureShape, Shape, Slide, TextRun, TextShape};
use crate::deck::raw::{RawDeck, RawShape, RawShapeKind, RawSlide};

/// Narrow raw shapes into the paintable [`Shape`] model, preserving order.
///
/// An auto shape with a text frame becomes [`Shape::Text`]; a picture with a resolved payload
/// becomes [`Shape::Picture`]. Everything else, including text held by tables and other graphic
/// frames, is dropped.
pub fn extract_shapes(raw: &[RawShape]) -> Vec<Shape> {
    raw.iter().filter_map(extract_one).collect()
}

fn extract_one(raw: &RawShape) -> Option<Shape> {
    let frame = raw.frame.unwrap_or_default();
    match (raw.kind, &raw.text_frame, &raw.image) {
        (RawShapeKind::AutoShape, Some(paragraphs), _) => {
            let runs = paragraphs
                .iter()
                .enumerate()
                .flat_map(|(p_idx, p)| {
                    p.runs.iter().map(move |r| TextRun {
                        text: r.text.clone(),
                        paragraph: p_idx,
                        size_pt: r.size_centipoints.map(|c| c as f32 / 100.0),
                    })
                })
                .collect();
            Some(Shape::Text(TextShape { frame, runs }))
        }
        (RawShapeKind::Picture, _, Some(payload)) => Some(Shape::Picture(PictureShape {
            frame,
            payload: payload.clone(),
        })),
        (RawShapeKind::Picture, _, None) => {
            tracing::debug!(name = %raw.name, "dropping picture without resolvable image");
            None
        }
        (
            RawShapeKind::AutoShape
            | RawShapeKind::Group
            | RawShapeKind::GraphicFrame
            | RawShapeKind::Connector,
            _,
            _,
        ) => {
            tracing::debug!(name = %raw.name, kind = ?raw.kind, "dropping unsupported shape");
            None
        }
    }
}

/// Build the [`Slide`] at `index` from parser output.
pub fn extract_slide(raw: &RawSlide, index: usize) -> Slide {
    Slide {
        index,
        shapes: extract_shapes(&raw.shapes),
        notes: raw.notes.clone(),
    }
}

/// Build a [`Deck`], assigning slide indices in parser order.
pub fn extract_deck(raw: &RawDeck) -> Deck {
    Deck {
        slides: raw
            .slides
            .iter()
            .enumerate()
            .map(|(i, s)| extract_slide(s, i))
            .collect(),
        slide_size_emu: raw.slide_size_emu,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/deck/extract.rs"]
mod tests;
