//! Offline export wired end to end against the in-memory sink.
//!
//! Clips here carry no source asset, so layers composite as transparent
//! buffers over the opaque black base. That keeps the tests hermetic while
//! still running the full resolve, transition blend and sink path.

use cutline::export::{CancelToken, ExportBackend, ExportProgress, ExportRequest};
use cutline::model::{Clip, ClipProps, TrackRole};
use cutline::transition::TransitionKind;
use cutline::{EditorSession, FrameIndex, FrameRange, InMemorySink, OfflineExporter, ProjectSettings};

fn crossfade_session() -> EditorSession {
    let mut session = EditorSession::new(ProjectSettings::default());
    let track = session.track_for_role(TrackRole::Main);
    let a = session
        .add_clip(track, Clip::new(None, 0.0, 1.0, ClipProps::video()))
        .unwrap();
    let b = session
        .add_clip(track, Clip::new(None, 1.0, 1.0, ClipProps::video()))
        .unwrap();
    session
        .add_transition(a, b, TransitionKind::Crossfade, 0.25)
        .unwrap();
    session
}

#[test]
fn full_export_delivers_every_frame_with_monotonic_progress() {
    let session = crossfade_session();
    let mut exporter = OfflineExporter::new(InMemorySink::new());
    let mut reports: Vec<ExportProgress> = Vec::new();
    exporter
        .export(
            session.timeline(),
            &ExportRequest::full(),
            &CancelToken::new(),
            &mut |p| reports.push(p),
        )
        .unwrap();

    // 2 seconds at the default 30 fps.
    let frames = exporter.sink().frames();
    assert_eq!(frames.len(), 60);
    for (i, (idx, frame)) in frames.iter().enumerate() {
        assert_eq!(idx.0, i as u64);
        assert_eq!(frame.data.len(), 1920 * 1080 * 4);
        // Opaque output, even through the transition window.
        assert!(frame.data.chunks_exact(4).all(|px| px[3] == 255));
    }
    assert!(reports.windows(2).all(|w| w[0].frames_done < w[1].frames_done));
    assert_eq!(reports.last().map(|p| p.frames_done), Some(60));
}

#[test]
fn partial_range_exports_only_the_requested_frames() {
    let session = crossfade_session();
    let mut exporter = OfflineExporter::new(InMemorySink::new());
    let range = FrameRange::new(FrameIndex(30), FrameIndex(45)).unwrap();
    exporter
        .export(
            session.timeline(),
            &ExportRequest {
                range: Some(range),
                keep_audio: false,
            },
            &CancelToken::new(),
            &mut |_| {},
        )
        .unwrap();

    let frames = exporter.sink().frames();
    assert_eq!(frames.len(), 15);
    assert_eq!(frames.first().map(|(idx, _)| idx.0), Some(30));
    assert_eq!(frames.last().map(|(idx, _)| idx.0), Some(44));
}

#[test]
fn cancelling_mid_export_aborts_without_a_user_facing_failure() {
    let session = crossfade_session();
    let mut exporter = OfflineExporter::new(InMemorySink::new());
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    let err = exporter
        .export(
            session.timeline(),
            &ExportRequest::full(),
            &cancel,
            &mut |p| {
                if p.frames_done == 10 {
                    trigger.cancel();
                }
            },
        )
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(exporter.sink().is_aborted());
    assert!(exporter.sink().frames().is_empty());
}

#[test]
fn playback_and_offline_export_are_mutually_exclusive() {
    let mut session = crossfade_session();
    assert!(session.begin_playback());
    assert!(!session.begin_export());
    session.end_playback();
    assert!(session.begin_export());
    assert!(!session.begin_playback());
    session.end_export();
}
