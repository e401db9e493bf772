//! Deterministic offline export: resolve, composite and encode every frame
//! of the requested range as fast as the machine allows.

use std::path::PathBuf;

use crate::audio::{self, PcmCache};
use crate::compose::Compositor;
use crate::encode::{AudioInputConfig, FrameRgba, FrameSink, SinkConfig};
use crate::foundation::{CutResult, FrameIndex};
use crate::media::DecodeFarm;
use crate::model::{MediaKind, Timeline};
use crate::resolve::FrameResolver;

use super::{CancelToken, ExportBackend, ExportProgress, ExportRequest, effective_range};

/// Frame-exact export backend writing into any [`FrameSink`].
pub struct OfflineExporter<S: FrameSink> {
    sink: S,
    scratch_dir: PathBuf,
    scratch_file: Option<PathBuf>,
    pcm_cache: PcmCache,
}

impl<S: FrameSink> OfflineExporter<S> {
    /// Create an exporter around `sink`, staging mixed audio under the
    /// system temp directory.
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            scratch_dir: std::env::temp_dir(),
            scratch_file: None,
            pcm_cache: PcmCache::new(),
        }
    }

    /// Override where the intermediate audio mix file is staged.
    pub fn with_scratch_dir(mut self, dir: PathBuf) -> Self {
        self.scratch_dir = dir;
        self
    }

    /// Borrow the underlying sink, e.g. to inspect captured frames.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Seed the PCM cache, bypassing on-demand audio decode.
    pub fn pcm_cache_mut(&mut self) -> &mut PcmCache {
        &mut self.pcm_cache
    }

    #[tracing::instrument(skip_all)]
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

        // Mix audio up front so the sink can mux it alongside the first frame.
        if request.keep_audio {
            self.scratch_file =
                super::stage_audio_mix(timeline, range, &self.scratch_dir, &mut self.pcm_cache)?;
        }

        let mut farm = DecodeFarm::new();
        for asset in &timeline.assets {
            if asset.kind == MediaKind::Video && timeline_uses_asset(timeline, asset.id) {
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
        let mut frames_done = 0u64;
        for idx in range.start.0..range.end.0 {
            if let Err(err) = cancel.check() {
                self.sink.abort()?;
                return Err(err);
            }
            let resolved = resolver.resolve_frame(FrameIndex(idx));
            let data = match compositor.render_frame(timeline, &resolved, &mut farm) {
                Ok(data) => data,
                Err(err) => {
                    self.sink.abort()?;
                    return Err(err);
                }
            };
            let frame = FrameRgba {
                width: settings.canvas.width,
                height: settings.canvas.height,
                data,
            };
            if let Err(err) = self.sink.push_frame(FrameIndex(idx), &frame) {
                self.sink.abort()?;
                return Err(err);
            }
            frames_done += 1;
            progress(ExportProgress {
                frames_done,
                frames_total,
            });
        }

        farm.close_all();
        self.sink.end()?;
        Ok(())
    }
}

impl<S: FrameSink> ExportBackend for OfflineExporter<S> {
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
        remove_scratch(self.scratch_file.take());
        result
    }
}

fn timeline_uses_asset(timeline: &Timeline, asset_id: crate::model::AssetId) -> bool {
    timeline
        .tracks
        .iter()
        .flat_map(|t| t.clips.iter())
        .any(|c| c.asset_id == Some(asset_id))
}

fn remove_scratch(path: Option<PathBuf>) {
    if let Some(path) = path {
        if let Err(err) = std::fs::remove_file(&path) {
            tracing::debug!(path = %path.display(), %err, "leaving stale audio scratch file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::InMemorySink;
    use crate::model::{Clip, ClipProps, ProjectSettings, Track, TrackKind, TrackRole};

    fn solid_timeline() -> Timeline {
        let mut timeline = Timeline {
            settings: ProjectSettings::default(),
            assets: Vec::new(),
            tracks: Vec::new(),
            transitions: Vec::new(),
        };
        let mut track = Track::new(TrackKind::Video, Some(TrackRole::Main));
        // No source asset: composites as black, keeping the test hermetic.
        track.clips.push(Clip::new(None, 0.0, 1.0, ClipProps::video()));
        timeline.tracks.push(track);
        timeline
    }

    #[test]
    fn exports_every_frame_in_order() {
        let timeline = solid_timeline();
        let mut exporter = OfflineExporter::new(InMemorySink::new());
        let cancel = CancelToken::new();
        let mut reports = Vec::new();
        exporter
            .export(&timeline, &ExportRequest::full(), &cancel, &mut |p| {
                reports.push(p)
            })
            .unwrap();

        // 1 second at 30 fps.
        assert_eq!(exporter.sink().frames().len(), 30);
        for (i, (idx, frame)) in exporter.sink().frames().iter().enumerate() {
            assert_eq!(idx.0, i as u64);
            assert_eq!(frame.width, 1920);
            assert_eq!(frame.height, 1080);
        }
        assert_eq!(
            reports.last(),
            Some(&ExportProgress {
                frames_done: 30,
                frames_total: 30
            })
        );
    }

    #[test]
    fn cancellation_aborts_sink_midway() {
        let timeline = solid_timeline();
        let mut exporter = OfflineExporter::new(InMemorySink::new());
        let cancel = CancelToken::new();
        let cancel_after = cancel.clone();
        let err = exporter
            .export(&timeline, &ExportRequest::full(), &cancel, &mut |p| {
                if p.frames_done == 5 {
                    cancel_after.cancel();
                }
            })
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(exporter.sink().is_aborted());
        assert!(exporter.sink().frames().is_empty());
    }

    #[test]
    fn empty_timeline_is_rejected() {
        let timeline = Timeline {
            settings: ProjectSettings::default(),
            assets: Vec::new(),
            tracks: Vec::new(),
            transitions: Vec::new(),
        };
        let mut exporter = OfflineExporter::new(InMemorySink::new());
        let err = exporter
            .export(
                &timeline,
                &ExportRequest::full(),
                &CancelToken::new(),
                &mut |_| {},
            )
            .unwrap_err();
        assert!(matches!(err, crate::foundation::CutError::Validation(_)));
    }
}
