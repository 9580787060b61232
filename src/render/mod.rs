//! Slide rasterization.
//!
//! [`units`] maps document geometry into pixel space, [`backend`] defines the renderer seam and
//! the frame type, and [`cpu`] is the in-process renderer built on `vello_cpu`, `parley` and
//! `image`.

pub mod backend;
pub mod cpu;
pub(crate) mod text;
pub mod units;
