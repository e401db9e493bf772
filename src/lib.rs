//! Cutline is a timeline-based video editing and rendering engine.
//!
//! The crate is built around a seconds-based time-domain model that an
//! editing UI or an automation layer mutates through [`EditorSession`], and
//! a frame-exact read path that playback and export share:
//!
//! 1. **Edit**: [`EditorSession`] mutates the [`Timeline`] (tracks, clips,
//!    transitions) with undo/redo snapshots and snapping.
//! 2. **Resolve**: [`FrameResolver`] maps a [`FrameIndex`] to the set of
//!    active layers, including both sides of an in-flight transition.
//! 3. **Composite**: [`Compositor`] turns a resolved frame into
//!    premultiplied RGBA8 canvas bytes via the `vello_cpu` raster pipeline.
//! 4. **Export**: an [`export::ExportBackend`] streams composited frames and
//!    the mixed 48 kHz audio into a [`FrameSink`] or a remote render job.
//!
//! Design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic resolve/composite**: the same timeline and frame index
//!   produce the same pixels, so preview and export cannot disagree.
//! - **Premultiplied RGBA8** end-to-end between the compositor and sinks.
//! - **ffmpeg as a subprocess**: probing, decoding and encoding shell out to
//!   the system `ffmpeg`/`ffprobe` binaries; nothing links codec libraries.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub mod audio;
pub mod compose;
pub mod encode;
pub mod export;
pub mod media;
pub mod model;
pub mod playback;
pub mod resolve;
pub mod session;
pub mod transition;

pub use foundation::core::{Canvas, Fps, FrameIndex, FrameRange, Rgba8Premul};
pub use foundation::error::{CutError, CutResult};

pub use compose::Compositor;
pub use encode::{AudioInputConfig, FfmpegSink, FfmpegSinkOpts, FrameSink, InMemorySink, SinkConfig};
pub use export::{CancelToken, ExportProgress, ExportRequest, OfflineExporter};
pub use model::{Clip, ClipProps, MediaAsset, ProjectSettings, Timeline, Track, Transition};
pub use playback::PlaybackClock;
pub use resolve::FrameResolver;
pub use session::EditorSession;
