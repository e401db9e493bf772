//! Realtime capture backend: renders the timeline paced at 1x wall-clock
//! speed, the way a screen recorder would see a live preview.
//!
//! Frame content is identical to the offline backend whenever the machine
//! keeps up. When a frame misses its deadline by more than one frame
//! period the previous composite is re-pushed for the late slot, trading
//! motion smoothness for pace. Output timing therefore depends on machine
//! load, which is the point of this backend.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::audio::{self, PcmCache};
use crate::compose::Compositor;
use crate::encode::{AudioInputConfig, FrameRgba, FrameSink, SinkConfig};
use crate::foundation::{CutResult, FrameIndex};
use crate::media::DecodeFarm;
use crate::model::{MediaKind, Timeline};
use crate::resolve::FrameResolver;

use super::{CancelToken, ExportBackend, ExportProgress, ExportRequest, effective_range};

/// Wall-clock paced export backend writing into any [`FrameSink`].
pub struct RealtimeExporter<S: FrameSink> {
    sink: S,
    scratch_dir: PathBuf,
    scratch_file: Option<PathBuf>,
    pcm_cache: PcmCache,
}

impl<S: FrameSink> RealtimeExporter<S> {
    /// Create a paced exporter around `sink`.
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            scratch_dir: std::env::temp_dir(),
            scratch_file: None,
            pcm_cache: PcmCache::new(),
        }
    }

    /// Borrow the underlying sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn run(
        &mut self,
        timeline: &Timeline,
        request: &ExportRequest,
        cancel: &CancelToken,
        progress: &mut dyn FnMut(ExportProgress),
    ) -> CutResult<()> {
        let range = effective_range(timeline, request)?;
        let settings = &timeline.settings;
        let fps = settings.fps;
        let frames_total = range.len_frames();
        let frame_period = Duration::from_secs_f64(fps.frame_duration_secs());

        if request.keep_audio {
            self.scratch_file =
                super::stage_audio_mix(timeline, range, &self.scratch_dir, &mut self.pcm_cache)?;
        }

        let mut farm = DecodeFarm::new();
        for asset in &timeline.assets {
            let used = timeline
                .tracks
                .iter()
                .flat_map(|t| t.clips.iter())
                .any(|c| c.asset_id == Some(asset.id));
            if asset.kind == MediaKind::Video && used {
                farm.open(asset, fps)?;
            }
        }

        self.sink.begin(SinkConfig {
            width: settings.canvas.width,
            height: settings.canvas.height,
            fps,
            audio: self.scratch_file.as_ref().map(|path| AudioInputConfig {
                path: path.clone(),
                sample_rate: audio::MIX_SAMPLE_RATE,
                channels: audio::MIX_CHANNELS,
            }),
        })?;

        let resolver = FrameResolver::new(timeline);
        let mut compositor = Compositor::new(settings.canvas);
        let mut last_frame: Option<FrameRgba> = None;
        let mut duplicated = 0u64;
        let start = Instant::now();
        for (done, idx) in (range.start.0..range.end.0).enumerate() {
            if let Err(err) = cancel.check() {
                self.sink.abort()?;
                return Err(err);
            }

            let deadline = start + frame_period.mul_f64(done as f64);
            let now = Instant::now();
            if now < deadline {
                std::thread::sleep(deadline - now);
            }

            // More than one period late: repeat the previous composite for
            // this slot rather than falling further behind.
            let late = Instant::now().saturating_duration_since(deadline) > frame_period;
            let frame = match (&last_frame, late) {
                (Some(prev), true) => {
                    duplicated += 1;
                    prev.clone()
                }
                _ => {
                    let resolved = resolver.resolve_frame(FrameIndex(idx));
                    let data = match compositor.render_frame(timeline, &resolved, &mut farm) {
                        Ok(data) => data,
                        Err(err) => {
                            self.sink.abort()?;
                            return Err(err);
                        }
                    };
                    FrameRgba {
                        width: settings.canvas.width,
                        height: settings.canvas.height,
                        data,
                    }
                }
            };
            if let Err(err) = self.sink.push_frame(FrameIndex(idx), &frame) {
                self.sink.abort()?;
                return Err(err);
            }
            last_frame = Some(frame);
            progress(ExportProgress {
                frames_done: done as u64 + 1,
                frames_total,
            });
        }

        if duplicated > 0 {
            tracing::warn!(duplicated, "capture fell behind realtime");
        }
        farm.close_all();
        self.sink.end()?;
        Ok(())
    }
}

impl<S: FrameSink> ExportBackend for RealtimeExporter<S> {
    fn is_available(&self) -> bool {
        self.sink.is_available()
    }

    fn export(
        &mut self,
        timeline: &Timeline,
        request: &ExportRequest,
        cancel: &CancelToken,
        progress: &mut dyn FnMut(ExportProgress),
    ) -> CutResult<()> {
        let result = self.run(timeline, request, cancel, progress);
        if let Some(path) = self.scratch_file.take() {
            if let Err(err) = std::fs::remove_file(&path) {
                tracing::debug!(path = %path.display(), %err, "leaving stale audio scratch file");
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::InMemorySink;
    use crate::model::{Clip, ClipProps, ProjectSettings, Track, TrackKind, TrackRole};

    #[test]
    fn capture_runs_at_roughly_wall_clock_pace() {
        let mut timeline = Timeline {
            settings: ProjectSettings::default(),
            assets: Vec::new(),
            tracks: Vec::new(),
            transitions: Vec::new(),
        };
        let mut track = Track::new(TrackKind::Video, Some(TrackRole::Main));
        track.clips.push(Clip::new(None, 0.0, 0.2, ClipProps::video()));
        timeline.tracks.push(track);

        let mut exporter = RealtimeExporter::new(InMemorySink::new());
        let started = Instant::now();
        exporter
            .export(
                &timeline,
                &ExportRequest {
                    range: None,
                    keep_audio: false,
                },
                &CancelToken::new(),
                &mut |_| {},
            )
            .unwrap();
        // 0.2 sec at 30 fps: 6 frames, at least 5 frame periods of pacing.
        assert_eq!(exporter.sink().frames().len(), 6);
        assert!(started.elapsed() >= Duration::from_secs_f64(5.0 / 30.0));
    }
}
