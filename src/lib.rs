//! Slidecast turns a slide deck into a narrated video.
//!
//! Every slide becomes one segment: a still image rasterized from the slide's shapes, shown for
//! as long as its synthesized narration lasts (or a default duration when the slide is silent).
//! Segments are laid end to end in slide order and streamed into an encoder.
//!
//! - Build a [`PipelineConfig`]
//! - Create a [`Converter`] with a [`DocumentParser`] and a [`SpeechSynthesizer`]
//! - Call [`Converter::convert`] with a [`FrameSink`] factory
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod foundation;

pub mod audio;
pub mod config;
pub mod deck;
/// Encoding sinks.
pub mod encode;
pub mod narration;
pub mod pipeline;
pub mod render;
pub mod timeline;
pub mod workarea;

pub use crate::foundation::cancel::CancelToken;
pub use crate::foundation::core::{Fps, FrameIndex, FrameRange, Resolution, Rgba8Premul};
pub use crate::foundation::error::{SlidecastError, SlidecastResult};

pub use crate::config::{NarrationSource, PipelineConfig};
pub use crate::deck::{Deck, DocumentParser, PptxParser, RawDeck, Shape, Slide};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::sink::{AudioInputConfig, FrameSink, InMemorySink, SinkConfig};
pub use crate::narration::{CommandSynthesizer, NarrationTrack, SpeechSynthesizer};
pub use crate::pipeline::{
    ConversionOutput, ConversionRequest, Converter, SegmentSummary, SlideNarration, Upload,
};
pub use crate::render::backend::{FrameRGBA, RenderSettings, SlideRenderer};
pub use crate::render::cpu::CpuSlideRenderer;
pub use crate::render::units::{NormalizedElement, PxRect, UnitConverter};
pub use crate::timeline::{Segment, Timeline};
pub use crate::workarea::WorkArea;
