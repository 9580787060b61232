//! Narration audio: probing and decoding through the system `ffmpeg`/`ffprobe`, and the
//! timeline-wide narration bed handed to the encoder.

pub mod media;
pub mod track;
