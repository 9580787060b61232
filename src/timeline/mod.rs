//! Segments and the timeline they form.
//!
//! A [`Segment`] pairs one slide image with its optional narration and a duration. The
//! [`Timeline`] orders segments by slide index, lays them end to end, and streams them into a
//! [`crate::FrameSink`].

pub mod assemble;
pub mod segment;

pub use assemble::{MaterializeStats, Timeline};
pub use segment::{Segment, build_segment};
