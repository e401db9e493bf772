//! Shared primitives: error taxonomy, frame/time types and pixel math.

pub mod core;
pub mod error;
pub mod math;

pub use self::core::{Canvas, Fps, FrameIndex, FrameRange, Rgba8Premul};
pub use error::{CutError, CutResult};
