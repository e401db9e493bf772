//! Frame sinks and container encoding.

pub mod ffmpeg;
pub mod sink;

pub use ffmpeg::{FfmpegSink, FfmpegSinkOpts, ensure_parent_dir, is_ffmpeg_on_path};
pub use sink::{AudioInputConfig, FrameRgba, FrameSink, InMemorySink, SinkConfig};
