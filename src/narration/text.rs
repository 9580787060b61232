use crate::config::{NarrationSource, PipelineConfig};
use crate::deck::model::{Shape, Slide};

/// Every text run of every text shape, in shape-then-run order, joined by single spaces and
/// trimmed.
///
/// Empty runs are skipped so they do not produce doubled separators. A slide without text
/// shapes yields an empty string.
pub fn extract_text(slide: &Slide) -> String {
    let runs: Vec<&str> = slide
        .shapes
        .iter()
        .filter_map(|s| match s {
            Shape::Text(t) => Some(t),
            Shape::Picture(_) => None,
        })
        .flat_map(|t| t.runs.iter().map(|r| r.text.as_str()))
        .filter(|t| !t.is_empty())
        .collect();
    runs.join(" ").trim().to_string()
}

/// Narration for `slide` per the configured source.
///
/// Empty text is replaced by `fallback_phrase` when one is configured. `None` means the slide
/// is intentionally silent; the result is never an empty string.
pub fn narration_for(slide: &Slide, cfg: &PipelineConfig) -> Option<String> {
    let notes = || {
        slide
            .notes
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    };
    let text = match cfg.narration_source {
        NarrationSource::Notes => notes(),
        NarrationSource::SlideText => extract_text(slide),
        NarrationSource::NotesOrSlideText => {
            let n = notes();
            if n.is_empty() { extract_text(slide) } else { n }
        }
    };
    if !text.is_empty() {
        return Some(text);
    }
    cfg.fallback_phrase
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
#[path = "../../tests/unit/narration/text.rs"]
mod tests;
