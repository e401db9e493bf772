//! Segment mixdown into one interleaved PCM buffer.

use std::path::Path;

use crate::audio::manifest::{AudioManifest, AudioSegment};
use crate::foundation::{CutError, CutResult, Fps};

/// Mix all manifest segments into interleaved output PCM.
///
/// Overlapping segments sum; the result is hard-clamped to `[-1, 1]`.
pub fn mix_manifest(manifest: &AudioManifest) -> Vec<f32> {
    let frames = manifest.total_samples as usize;
    let mut out = vec![0.0f32; frames * usize::from(manifest.channels)];

    for seg in &manifest.segments {
        mix_segment(&mut out, manifest, seg);
    }

    for s in &mut out {
        *s = s.clamp(-1.0, 1.0);
    }
    out
}

fn mix_segment(out: &mut [f32], manifest: &AudioManifest, seg: &AudioSegment) {
    if seg.timeline_end_sample <= seg.timeline_start_sample {
        return;
    }
    // Sources are pre-resampled to the mix rate, so destination and source
    // sample clocks line up one to one.
    let src = seg.source_interleaved_f32.as_ref();
    let src_frames = src.len() / usize::from(manifest.channels);
    if src_frames == 0 {
        return;
    }
    let rate = f64::from(manifest.sample_rate);

    for dst_sample in seg.timeline_start_sample..seg.timeline_end_sample {
        let rel_sec = ((dst_sample - seg.timeline_start_sample) as f64) / rate;
        let src_sec = seg.source_start_sec + rel_sec;
        if src_sec >= seg.source_end_sec {
            break;
        }
        let src_frame = (src_sec * rate).floor();
        if !src_frame.is_finite() || src_frame < 0.0 {
            break;
        }
        let src_frame = src_frame as usize;
        if src_frame >= src_frames {
            break;
        }

        let gain = seg.volume * fade_gain(seg, rel_sec);
        let src_idx = src_frame * usize::from(manifest.channels);
        let dst_idx = dst_sample as usize * usize::from(manifest.channels);
        for ch in 0..usize::from(manifest.channels) {
            out[dst_idx + ch] += src[src_idx + ch] * gain;
        }
    }
}

/// Fade gain at `rel_sec` into the segment, anchored to the clip's own edges
/// rather than the segment's so a range starting mid-clip hears the same
/// envelope.
fn fade_gain(seg: &AudioSegment, rel_sec: f64) -> f32 {
    let clip_sec = seg.clip_offset_sec + rel_sec;
    let mut gain = 1.0f32;
    if seg.fade_in_sec > 0.0 {
        gain *= (clip_sec / seg.fade_in_sec).clamp(0.0, 1.0) as f32;
    }
    if seg.fade_out_sec > 0.0 {
        let rem = (seg.clip_duration_sec - clip_sec).max(0.0);
        gain *= (rem / seg.fade_out_sec).clamp(0.0, 1.0) as f32;
    }
    gain
}

/// Write interleaved `f32` PCM samples to a raw little-endian `.f32le` file.
pub fn write_mix_to_f32le_file(samples_interleaved: &[f32], out_path: &Path) -> CutResult<()> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            CutError::encode(format!(
                "failed to create audio mix output directory '{}': {e}",
                parent.display()
            ))
        })?;
    }

    let mut bytes = Vec::<u8>::with_capacity(samples_interleaved.len() * 4);
    for &sample in samples_interleaved {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(out_path, bytes).map_err(|e| {
        CutError::encode(format!(
            "failed to write mixed audio file '{}': {e}",
            out_path.display()
        ))
    })
}

/// Convert a frame delta to the nearest sample index at `sample_rate`.
pub fn frame_to_sample(frame_delta: u64, fps: Fps, sample_rate: u32) -> u64 {
    let num = u128::from(frame_delta) * u128::from(sample_rate) * u128::from(fps.den);
    let den = u128::from(fps.num);
    ((num + (den / 2)) / den) as u64
}
