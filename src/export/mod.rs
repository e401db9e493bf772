//! Export backends: offline render, realtime capture and remote jobs.
//!
//! All three backends consume the same resolver and compositor, so whatever
//! the preview shows is what lands in the file. They share the
//! [`ExportBackend`] contract and the cooperative [`CancelToken`];
//! cancellation is a clean termination ([`CutError::Cancelled`]), never a
//! user-facing failure.

pub mod offline;
pub mod realtime;
pub mod remote;

pub use offline::OfflineExporter;
pub use realtime::RealtimeExporter;
pub use remote::{RemoteExporter, RemoteJobClient, RemoteJobStatus};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::foundation::{CutError, CutResult, FrameRange};
use crate::model::Timeline;

/// Cooperative cancellation flag shared between an export and its driver.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create an uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Bail out with [`CutError::Cancelled`] when cancellation is pending.
    pub fn check(&self) -> CutResult<()> {
        if self.is_cancelled() {
            Err(CutError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// What to export.
#[derive(Clone, Debug, Default)]
pub struct ExportRequest {
    /// Frame range to export; `None` exports the whole timeline.
    pub range: Option<FrameRange>,
    /// Mix and mux the timeline's audio. Disabled produces a silent file.
    pub keep_audio: bool,
}

impl ExportRequest {
    /// Export the whole timeline with audio.
    pub fn full() -> Self {
        Self {
            range: None,
            keep_audio: true,
        }
    }
}

/// Progress report emitted once per exported frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportProgress {
    /// Frames already delivered to the sink.
    pub frames_done: u64,
    /// Total frames in the export range.
    pub frames_total: u64,
}

/// Common contract over the offline, realtime and remote backends.
pub trait ExportBackend {
    /// Whether this backend can run in the current environment. Callers
    /// pick a backend among the available ones; `export` on an unavailable
    /// backend fails.
    fn is_available(&self) -> bool {
        true
    }

    /// Run the export to completion, cancellation or failure.
    fn export(
        &mut self,
        timeline: &Timeline,
        request: &ExportRequest,
        cancel: &CancelToken,
        progress: &mut dyn FnMut(ExportProgress),
    ) -> CutResult<()>;
}

/// Mix the range's audio into a staged `f32le` scratch file, if the
/// timeline has any audible content.
pub(crate) fn stage_audio_mix(
    timeline: &Timeline,
    range: FrameRange,
    scratch_dir: &std::path::Path,
    cache: &mut crate::audio::PcmCache,
) -> CutResult<Option<std::path::PathBuf>> {
    let manifest = crate::audio::build_audio_manifest(timeline, range, cache)?;
    if manifest.segments.is_empty() {
        return Ok(None);
    }
    let samples = crate::audio::mix_manifest(&manifest);
    let path = scratch_dir.join(format!("cutline-mix-{}.f32le", uuid::Uuid::new_v4()));
    crate::audio::write_mix_to_f32le_file(&samples, &path)?;
    Ok(Some(path))
}

/// Resolve the requested range against the timeline's derived duration.
pub(crate) fn effective_range(timeline: &Timeline, request: &ExportRequest) -> CutResult<FrameRange> {
    let fps = timeline.settings.fps;
    let range = match request.range {
        Some(r) => r,
        None => {
            let total = fps.secs_to_frames_ceil(timeline.duration_sec());
            FrameRange::new(crate::foundation::FrameIndex(0), crate::foundation::FrameIndex(total))?
        }
    };
    if range.is_empty() {
        return Err(CutError::validation("export range is empty"));
    }
    Ok(range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_is_sticky_and_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());
        clone.cancel();
        assert!(token.is_cancelled());
        assert!(token.check().unwrap_err().is_cancelled());
    }
}
