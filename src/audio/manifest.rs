//! Audio mixing plan for a timeline frame range.
//!
//! Manifest building runs once per export, outside the per-frame hot loop.
//! Segment timing is computed purely from the timeline; PCM attachment goes
//! through [`PcmCache`] so each asset is decoded at most once per export.

use std::collections::HashMap;
use std::sync::Arc;

use crate::audio::mix::frame_to_sample;
use crate::audio::{MIX_CHANNELS, MIX_SAMPLE_RATE};
use crate::foundation::{CutError, CutResult, FrameRange};
use crate::media::decode_audio_f32_stereo;
use crate::model::{AssetId, ClipProps, Timeline};

/// One scheduled audio contribution in timeline sample space.
#[derive(Clone, Debug)]
pub struct AudioSegment {
    /// First destination sample frame, relative to the manifest range.
    pub timeline_start_sample: u64,
    /// One past the last destination sample frame.
    pub timeline_end_sample: u64,
    /// Media time of the first contributed source sample.
    pub source_start_sec: f64,
    /// Media time at which the source stops contributing.
    pub source_end_sec: f64,
    /// Linear gain.
    pub volume: f32,
    /// Fade-in duration in seconds, measured from the clip start.
    pub fade_in_sec: f64,
    /// Fade-out duration in seconds, measured back from the clip end.
    pub fade_out_sec: f64,
    /// Offset of the segment start into its clip, seconds. Non-zero when the
    /// manifest range begins mid-clip; fades stay anchored to clip edges.
    pub clip_offset_sec: f64,
    /// Full clip duration in seconds, the fade-out anchor.
    pub clip_duration_sec: f64,
    /// Interleaved stereo source PCM at [`MIX_SAMPLE_RATE`].
    pub source_interleaved_f32: Arc<Vec<f32>>,
}

/// Audio rendering plan for a timeline frame range.
#[derive(Clone, Debug)]
pub struct AudioManifest {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Output channel count.
    pub channels: u16,
    /// Output length in per-channel sample frames.
    pub total_samples: u64,
    /// Scheduled contributions.
    pub segments: Vec<AudioSegment>,
}

/// Per-asset decoded PCM, filled lazily through `ffmpeg`.
#[derive(Default)]
pub struct PcmCache {
    entries: HashMap<AssetId, Arc<Vec<f32>>>,
}

impl PcmCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed an asset's PCM, used by tests and scratch sources.
    pub fn insert(&mut self, asset_id: AssetId, pcm: Arc<Vec<f32>>) {
        self.entries.insert(asset_id, pcm);
    }

    fn pcm(&mut self, timeline: &Timeline, asset_id: AssetId) -> CutResult<Arc<Vec<f32>>> {
        if let Some(pcm) = self.entries.get(&asset_id) {
            return Ok(pcm.clone());
        }
        let asset = timeline
            .asset(asset_id)
            .ok_or_else(|| CutError::validation(format!("unknown asset {asset_id}")))?;
        let decoded = decode_audio_f32_stereo(&asset.source, MIX_SAMPLE_RATE)?;
        let pcm = Arc::new(decoded.interleaved_f32);
        self.entries.insert(asset_id, pcm.clone());
        Ok(pcm)
    }
}

/// Build the audio mixing manifest for `range`.
///
/// Audible clips are media-backed video, audio and overlay clips with a
/// positive volume on unmuted tracks. Muted tracks and text clips contribute
/// nothing. Gaps between clips are left as silence in the output buffer.
pub fn build_audio_manifest(
    timeline: &Timeline,
    range: FrameRange,
    cache: &mut PcmCache,
) -> CutResult<AudioManifest> {
    if range.is_empty() {
        return Err(CutError::validation("audio manifest range must be non-empty"));
    }
    let fps = timeline.settings.fps;
    let range_start_sec = fps.frames_to_secs(range.start.0);
    let range_end_sec = fps.frames_to_secs(range.end.0);
    let total_samples = frame_to_sample(range.len_frames(), fps, MIX_SAMPLE_RATE);

    let mut segments = Vec::new();
    for track in &timeline.tracks {
        if track.muted {
            continue;
        }
        for clip in &track.clips {
            let Some((volume, fade_in_sec, fade_out_sec)) = audible_props(&clip.props) else {
                continue;
            };
            if volume <= 0.0 {
                continue;
            }
            let Some(asset_id) = clip.asset_id else {
                continue;
            };

            let start_sec = clip.start_sec.max(range_start_sec);
            let end_sec = clip.end_sec().min(range_end_sec);
            if end_sec <= start_sec {
                continue;
            }
            let clip_offset_sec = start_sec - clip.start_sec;

            let to_sample = |t: f64| -> u64 {
                (((t - range_start_sec) * f64::from(MIX_SAMPLE_RATE)).round().max(0.0) as u64)
                    .min(total_samples)
            };

            segments.push(AudioSegment {
                timeline_start_sample: to_sample(start_sec),
                timeline_end_sample: to_sample(end_sec),
                source_start_sec: clip.trim_start_sec + clip_offset_sec,
                source_end_sec: clip.trim_start_sec + clip.duration_sec,
                volume,
                fade_in_sec,
                fade_out_sec,
                clip_offset_sec,
                clip_duration_sec: clip.duration_sec,
                source_interleaved_f32: cache.pcm(timeline, asset_id)?,
            });
        }
    }

    Ok(AudioManifest {
        sample_rate: MIX_SAMPLE_RATE,
        channels: MIX_CHANNELS,
        total_samples,
        segments,
    })
}

/// Gain and fades for an audible clip kind, `None` for text.
fn audible_props(props: &ClipProps) -> Option<(f32, f64, f64)> {
    match props {
        ClipProps::Video {
            volume,
            fade_in_sec,
            fade_out_sec,
            ..
        }
        | ClipProps::Audio {
            volume,
            fade_in_sec,
            fade_out_sec,
        }
        | ClipProps::Overlay {
            volume,
            fade_in_sec,
            fade_out_sec,
            ..
        } => Some((*volume as f32, *fade_in_sec, *fade_out_sec)),
        ClipProps::Text { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::FrameIndex;
    use crate::model::{Clip, MediaAsset, ProjectSettings, TrackRole};
    use crate::session::EditorSession;

    fn seeded_session() -> (EditorSession, AssetId) {
        let mut s = EditorSession::new(ProjectSettings::default());
        let asset = s.import_asset(MediaAsset::audio("a.wav", 10.0));
        let track = s.track_for_role(TrackRole::Audio);
        let mut clip = Clip::new(Some(asset), 1.0, 2.0, ClipProps::audio());
        clip.trim_start_sec = 0.5;
        s.add_clip(track, clip).unwrap();
        (s, asset)
    }

    fn seeded_cache(asset: AssetId) -> PcmCache {
        let mut cache = PcmCache::new();
        cache.insert(asset, Arc::new(vec![0.25; 48_000 * 2 * 10]));
        cache
    }

    #[test]
    fn segment_timing_maps_clip_window_into_range_samples() {
        let (s, asset) = seeded_session();
        let mut cache = seeded_cache(asset);
        // 30 fps, frames [0, 120) covers t in [0, 4).
        let range = FrameRange::new(FrameIndex(0), FrameIndex(120)).unwrap();
        let m = build_audio_manifest(s.timeline(), range, &mut cache).unwrap();

        assert_eq!(m.total_samples, 4 * 48_000);
        assert_eq!(m.segments.len(), 1);
        let seg = &m.segments[0];
        assert_eq!(seg.timeline_start_sample, 48_000);
        assert_eq!(seg.timeline_end_sample, 3 * 48_000);
        assert!((seg.source_start_sec - 0.5).abs() < 1e-12);
        assert!((seg.source_end_sec - 2.5).abs() < 1e-12);
    }

    #[test]
    fn range_starting_mid_clip_keeps_fade_anchors() {
        let (s, asset) = seeded_session();
        let mut cache = seeded_cache(asset);
        // Frames [60, 120) is t in [2, 4): starts 1 s into the clip.
        let range = FrameRange::new(FrameIndex(60), FrameIndex(120)).unwrap();
        let m = build_audio_manifest(s.timeline(), range, &mut cache).unwrap();

        let seg = &m.segments[0];
        assert_eq!(seg.timeline_start_sample, 0);
        assert!((seg.clip_offset_sec - 1.0).abs() < 1e-12);
        assert!((seg.source_start_sec - 1.5).abs() < 1e-12);
        assert!((seg.clip_duration_sec - 2.0).abs() < 1e-12);
    }

    #[test]
    fn muted_tracks_and_text_clips_contribute_nothing() {
        let (mut s, asset) = seeded_session();
        let text = s.track_for_role(TrackRole::Text);
        s.add_clip(text, Clip::new(None, 0.0, 2.0, ClipProps::text("hi", "f.ttf")))
            .unwrap();
        let audio_track = s.track_for_role(TrackRole::Audio);
        s.set_track_muted(audio_track, true);

        let mut cache = seeded_cache(asset);
        let range = FrameRange::new(FrameIndex(0), FrameIndex(120)).unwrap();
        let m = build_audio_manifest(s.timeline(), range, &mut cache).unwrap();
        assert!(m.segments.is_empty());
    }

    #[test]
    fn zero_volume_clips_are_skipped() {
        let mut s = EditorSession::new(ProjectSettings::default());
        let asset = s.import_asset(MediaAsset::audio("a.wav", 10.0));
        let track = s.track_for_role(TrackRole::Audio);
        let clip = Clip::new(
            Some(asset),
            0.0,
            2.0,
            ClipProps::Audio {
                volume: 0.0,
                fade_in_sec: 0.0,
                fade_out_sec: 0.0,
            },
        );
        s.add_clip(track, clip).unwrap();

        let mut cache = seeded_cache(asset);
        let range = FrameRange::new(FrameIndex(0), FrameIndex(60)).unwrap();
        let m = build_audio_manifest(s.timeline(), range, &mut cache).unwrap();
        assert!(m.segments.is_empty());
    }

    #[test]
    fn empty_range_is_rejected() {
        let (s, asset) = seeded_session();
        let mut cache = seeded_cache(asset);
        let range = FrameRange::new(FrameIndex(5), FrameIndex(5)).unwrap();
        assert!(build_audio_manifest(s.timeline(), range, &mut cache).is_err());
    }
}
