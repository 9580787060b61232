//! Narration: which words a slide speaks, and the synthesizer that speaks them.

pub mod text;
pub mod tts;

pub use text::{extract_text, narration_for};
pub use tts::{CommandSynthesizer, NarrationTrack, SpeechSynthesizer};
