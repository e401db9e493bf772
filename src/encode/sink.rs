//! Frame sink contract consumed by the export backends.

use std::path::PathBuf;

use crate::foundation::{CutResult, Fps, FrameIndex};

/// One rendered frame in premultiplied RGBA8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRgba {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Premultiplied interleaved bytes, `width * height * 4` long.
    pub data: Vec<u8>,
}

/// Configuration provided to a [`FrameSink`] at the start of an export.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Optional external raw PCM audio file input.
    pub audio: Option<AudioInputConfig>,
}

/// Raw PCM audio input configuration for sinks that support audio encoding.
#[derive(Debug, Clone)]
pub struct AudioInputConfig {
    /// Path to interleaved `f32le` PCM data.
    pub path: PathBuf,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
}

/// Sink contract for consuming rendered frames in timeline order.
///
/// `push_frame` is called in strictly increasing [`FrameIndex`] order within
/// the exported range. Exactly one of `end` or `abort` follows the last
/// push: `end` finalizes the output, `abort` discards it.
pub trait FrameSink: Send {
    /// Whether the sink can produce output in the current environment
    /// (e.g. its encoder binary is installed).
    fn is_available(&self) -> bool {
        true
    }

    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> CutResult<()>;
    /// Push one frame in strictly increasing timeline order.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRgba) -> CutResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> CutResult<()>;
    /// Discard any partial output. Called instead of `end` on cancellation
    /// or failure; must be safe to call at any point after `begin`.
    fn abort(&mut self) -> CutResult<()> {
        Ok(())
    }
}

/// In-memory sink for tests and preview capture.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, FrameRgba)>,
    aborted: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the sink configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg.clone()
    }

    /// Borrow the captured frames.
    pub fn frames(&self) -> &[(FrameIndex, FrameRgba)] {
        &self.frames
    }

    /// Whether the sink was aborted.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> CutResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.aborted = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRgba) -> CutResult<()> {
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> CutResult<()> {
        Ok(())
    }

    fn abort(&mut self) -> CutResult<()> {
        self.frames.clear();
        self.aborted = true;
        Ok(())
    }
}
