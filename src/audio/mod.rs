//! Audio planning, mixing and silence analysis.
//!
//! All audio work happens at a fixed internal rate: sources are decoded to
//! 48 kHz stereo `f32` up front, mixed into one interleaved buffer per
//! export range, and handed to the encoder as raw PCM.

pub mod manifest;
pub mod mix;
pub mod silence;

pub use manifest::{AudioManifest, AudioSegment, PcmCache, build_audio_manifest};
pub use mix::{frame_to_sample, mix_manifest, write_mix_to_f32le_file};
pub use silence::{SilenceSpan, detect_silence};

/// Internal mixing sample rate used across decode, mix and encode.
pub const MIX_SAMPLE_RATE: u32 = 48_000;

/// Internal mixing channel count.
pub const MIX_CHANNELS: u16 = 2;
