//! Remote render backend: ships the serialized project to a render service
//! and polls the job until the encoded file can be fetched.
//!
//! The transport is abstracted behind [`RemoteJobClient`] so the backend
//! itself stays testable without a network. Whatever the outcome, the
//! submitted job is released on the service so abandoned uploads do not
//! accumulate.

use std::path::PathBuf;
use std::time::Duration;

use crate::foundation::{CutError, CutResult};
use crate::model::Timeline;

use super::{CancelToken, ExportBackend, ExportProgress, ExportRequest, effective_range};

/// Server-assigned job identifier.
pub type JobId = String;

/// Lifecycle state reported by the render service.
#[derive(Clone, Debug, PartialEq)]
pub enum RemoteJobStatus {
    /// Accepted, waiting for a worker.
    Queued,
    /// Rendering, with completion in `0.0..=1.0`.
    Running(f64),
    /// Output ready to download.
    Done,
    /// Render failed; diagnostics are reported verbatim.
    Failed(Vec<String>),
}

/// Transport to a render service.
pub trait RemoteJobClient: Send {
    /// Upload one referenced source file. Called for every asset the
    /// timeline references, before `submit`.
    fn upload_asset(&mut self, source: &std::path::Path) -> CutResult<()>;
    /// Submit a project (serialized timeline JSON) and start a job over the
    /// previously uploaded assets.
    fn submit(&mut self, project_json: &str, keep_audio: bool) -> CutResult<JobId>;
    /// Fetch the job's current status.
    fn poll(&mut self, job: &JobId) -> CutResult<RemoteJobStatus>;
    /// Download the finished output to `dest`.
    fn download(&mut self, job: &JobId, dest: &std::path::Path) -> CutResult<()>;
    /// Delete uploaded assets and, when a job was submitted, its server-side
    /// resources. Called on every outcome, including after `Failed`, on
    /// cancellation, and when cancellation lands between upload and submit.
    fn release(&mut self, job: Option<&JobId>) -> CutResult<()>;
}

/// Export backend that delegates rendering to a remote service.
pub struct RemoteExporter<C: RemoteJobClient> {
    client: C,
    out_path: PathBuf,
    poll_interval: Duration,
}

impl<C: RemoteJobClient> RemoteExporter<C> {
    /// Create a remote exporter writing the downloaded file to `out_path`.
    pub fn new(client: C, out_path: PathBuf) -> Self {
        Self {
            client,
            out_path,
            poll_interval: Duration::from_millis(500),
        }
    }

    /// Override the status poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Borrow the transport, e.g. to inspect a test double.
    pub fn client(&self) -> &C {
        &self.client
    }

    fn run(
        &mut self,
        timeline: &Timeline,
        request: &ExportRequest,
        cancel: &CancelToken,
        progress: &mut dyn FnMut(ExportProgress),
        job: &mut Option<JobId>,
        uploaded: &mut bool,
    ) -> CutResult<()> {
        let range = effective_range(timeline, request)?;
        if request.range.is_some() {
            return Err(CutError::validation(
                "remote rendering exports the whole timeline only",
            ));
        }
        let frames_total = range.len_frames();

        cancel.check()?;
        for asset in &timeline.assets {
            *uploaded = true;
            self.client.upload_asset(&asset.source)?;
            cancel.check()?;
        }

        let project_json = timeline.to_json()?;
        let id = self.client.submit(&project_json, request.keep_audio)?;
        tracing::info!(job = %id, "remote render job submitted");
        *job = Some(id.clone());

        loop {
            if cancel.is_cancelled() {
                return Err(CutError::Cancelled);
            }
            match self.client.poll(&id)? {
                RemoteJobStatus::Queued => {}
                RemoteJobStatus::Running(fraction) => {
                    let done = (fraction.clamp(0.0, 1.0) * frames_total as f64).floor() as u64;
                    progress(ExportProgress {
                        frames_done: done.min(frames_total),
                        frames_total,
                    });
                }
                RemoteJobStatus::Done => break,
                RemoteJobStatus::Failed(diagnostics) => {
                    return Err(CutError::remote(diagnostics.join("; ")));
                }
            }
            std::thread::sleep(self.poll_interval);
        }

        self.client.download(&id, &self.out_path)?;
        progress(ExportProgress {
            frames_done: frames_total,
            frames_total,
        });
        Ok(())
    }
}

impl<C: RemoteJobClient> ExportBackend for RemoteExporter<C> {
    fn export(
        &mut self,
        timeline: &Timeline,
        request: &ExportRequest,
        cancel: &CancelToken,
        progress: &mut dyn FnMut(ExportProgress),
    ) -> CutResult<()> {
        let mut job = None;
        let mut uploaded = false;
        let result = self.run(timeline, request, cancel, progress, &mut job, &mut uploaded);
        if job.is_some() || uploaded {
            if let Err(err) = self.client.release(job.as_ref()) {
                tracing::warn!(%err, "failed to release remote render job");
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Clip, ClipProps, ProjectSettings, Track, TrackKind, TrackRole};

    fn one_second_timeline() -> Timeline {
        let mut timeline = Timeline {
            settings: ProjectSettings::default(),
            assets: Vec::new(),
            tracks: Vec::new(),
            transitions: Vec::new(),
        };
        let mut track = Track::new(TrackKind::Video, Some(TrackRole::Main));
        track.clips.push(Clip::new(None, 0.0, 1.0, ClipProps::video()));
        timeline.tracks.push(track);
        timeline
    }

    /// Scripted transport double replaying a fixed status sequence.
    struct ScriptedClient {
        statuses: Vec<RemoteJobStatus>,
        cursor: usize,
        uploads: usize,
        submitted: bool,
        downloaded: bool,
        released: bool,
    }

    impl ScriptedClient {
        fn new(statuses: Vec<RemoteJobStatus>) -> Self {
            Self {
                statuses,
                cursor: 0,
                uploads: 0,
                submitted: false,
                downloaded: false,
                released: false,
            }
        }
    }

    impl RemoteJobClient for ScriptedClient {
        fn upload_asset(&mut self, _source: &std::path::Path) -> CutResult<()> {
            self.uploads += 1;
            Ok(())
        }

        fn submit(&mut self, project_json: &str, _keep_audio: bool) -> CutResult<JobId> {
            assert!(project_json.contains("\"tracks\""));
            self.submitted = true;
            Ok("job-1".to_string())
        }

        fn poll(&mut self, job: &JobId) -> CutResult<RemoteJobStatus> {
            assert_eq!(job, "job-1");
            let status = self.statuses[self.cursor.min(self.statuses.len() - 1)].clone();
            self.cursor += 1;
            Ok(status)
        }

        fn download(&mut self, _job: &JobId, _dest: &std::path::Path) -> CutResult<()> {
            self.downloaded = true;
            Ok(())
        }

        fn release(&mut self, _job: Option<&JobId>) -> CutResult<()> {
            self.released = true;
            Ok(())
        }
    }

    fn exporter(statuses: Vec<RemoteJobStatus>) -> RemoteExporter<ScriptedClient> {
        RemoteExporter::new(ScriptedClient::new(statuses), PathBuf::from("/tmp/out.mp4"))
            .with_poll_interval(Duration::ZERO)
    }

    #[test]
    fn successful_job_downloads_and_releases() {
        let mut exporter = exporter(vec![
            RemoteJobStatus::Queued,
            RemoteJobStatus::Running(0.5),
            RemoteJobStatus::Done,
        ]);
        let mut reports = Vec::new();
        exporter
            .export(
                &one_second_timeline(),
                &ExportRequest::full(),
                &CancelToken::new(),
                &mut |p| reports.push(p),
            )
            .unwrap();
        assert!(exporter.client().submitted);
        assert!(exporter.client().downloaded);
        assert!(exporter.client().released);
        // 50% of 30 frames, then completion.
        assert_eq!(reports[0].frames_done, 15);
        assert_eq!(reports.last().map(|p| p.frames_done), Some(30));
    }

    #[test]
    fn failed_job_surfaces_diagnostics_and_still_releases() {
        let mut exporter = exporter(vec![RemoteJobStatus::Failed(vec![
            "worker oom".to_string(),
            "retry limit hit".to_string(),
        ])]);
        let err = exporter
            .export(
                &one_second_timeline(),
                &ExportRequest::full(),
                &CancelToken::new(),
                &mut |_| {},
            )
            .unwrap_err();
        assert!(matches!(err, CutError::Remote(msg) if msg == "worker oom; retry limit hit"));
        assert!(!exporter.client().downloaded);
        assert!(exporter.client().released);
    }

    #[test]
    fn cancellation_releases_the_job() {
        let mut exporter = exporter(vec![
            RemoteJobStatus::Running(0.1),
            RemoteJobStatus::Running(0.2),
        ]);
        let cancel = CancelToken::new();
        let cancel_inner = cancel.clone();
        let err = exporter
            .export(
                &one_second_timeline(),
                &ExportRequest::full(),
                &cancel,
                &mut |_| cancel_inner.cancel(),
            )
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(!exporter.client().downloaded);
        assert!(exporter.client().released);
    }

    #[test]
    fn uploads_every_referenced_asset_before_submitting() {
        let mut timeline = one_second_timeline();
        timeline
            .assets
            .push(crate::model::MediaAsset::video(PathBuf::from("a.mp4"), 4.0, 640, 360));
        timeline
            .assets
            .push(crate::model::MediaAsset::audio(PathBuf::from("b.wav"), 2.0));

        let mut exporter = exporter(vec![RemoteJobStatus::Done]);
        exporter
            .export(
                &timeline,
                &ExportRequest::full(),
                &CancelToken::new(),
                &mut |_| {},
            )
            .unwrap();
        assert_eq!(exporter.client().uploads, 2);
        assert!(exporter.client().submitted);
        assert!(exporter.client().released);
    }
}
