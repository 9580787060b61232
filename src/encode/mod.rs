//! Encoding sinks.
//!
//! Sinks consume slide frames in timeline order and are driven by `Timeline::materialize`.

/// `ffmpeg`-based sink (MP4 output via system `ffmpeg`).
pub mod ffmpeg;
/// Generic frame sink trait and built-in sinks.
pub mod sink;
