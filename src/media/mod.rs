//! Media probing and decoding, all through `ffprobe`/`ffmpeg` subprocesses.
//!
//! No native codec linkage: keeping the tools at arm's length through pipes
//! means a crashed decode never takes the editor down with it.

pub mod decode;
pub mod probe;

pub use decode::{
    AssetDecoder, DecodeFarm, DecodeMode, FAILOVER_THRESHOLD, SeekDecoder, StreamDecoder,
    VideoFrameSource,
};
pub use probe::{MediaInfo, probe_media};

use std::path::Path;

use crate::foundation::{CutError, CutResult};

/// Decoded interleaved floating-point PCM.
#[derive(Clone, Debug)]
pub struct AudioPcm {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Interleaved `f32` PCM samples.
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    /// PCM with no samples at the given rate, stereo.
    pub fn silent(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 2,
            interleaved_f32: Vec::new(),
        }
    }

    /// Number of per-channel sample frames.
    pub fn frames(&self) -> usize {
        self.interleaved_f32.len() / self.channels as usize
    }
}

/// Decode a media source's audio to stereo interleaved `f32` PCM at
/// `sample_rate`.
///
/// Video files without an audio track decode to empty PCM rather than an
/// error.
pub fn decode_audio_f32_stereo(path: &Path, sample_rate: u32) -> CutResult<AudioPcm> {
    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            "2",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| CutError::decode(format!("failed to run ffmpeg for audio decode: {e}")))?;

    if !out.status.success() {
        let msg = String::from_utf8_lossy(&out.stderr);
        // ffmpeg reports a missing audio stream as an error; treat it as
        // empty PCM so video-only sources mix as silence.
        if msg.contains("Stream specifier")
            || msg.contains("matches no streams")
            || msg.contains("Output file #0 does not contain any stream")
        {
            return Ok(AudioPcm::silent(sample_rate));
        }
        return Err(CutError::decode(format!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            msg.trim()
        )));
    }

    if !out.stdout.len().is_multiple_of(4) {
        return Err(CutError::decode(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    let mut pcm = Vec::<f32>::with_capacity(out.stdout.len() / 4);
    for chunk in out.stdout.chunks_exact(4) {
        pcm.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    Ok(AudioPcm {
        sample_rate,
        channels: 2,
        interleaved_f32: pcm,
    })
}
