//! End-to-end editing scenarios exercised through the public session API,
//! the way a UI or an automation layer drives the engine.

use cutline::model::{Clip, ClipProps, TrackRole};
use cutline::resolve::MainSlot;
use cutline::transition::TransitionKind;
use cutline::{EditorSession, FrameResolver, ProjectSettings, Timeline};

fn session_with_back_to_back_clips() -> (EditorSession, cutline::model::ClipId, cutline::model::ClipId) {
    let mut session = EditorSession::new(ProjectSettings::default());
    let track = session.track_for_role(TrackRole::Main);
    let a = session
        .add_clip(track, Clip::new(None, 0.0, 4.0, ClipProps::video()))
        .unwrap();
    let b = session
        .add_clip(track, Clip::new(None, 4.0, 3.0, ClipProps::video()))
        .unwrap();
    (session, a, b)
}

#[test]
fn crossfade_resolves_both_clips_through_the_junction() {
    let (mut session, a, b) = session_with_back_to_back_clips();
    session
        .add_transition(a, b, TransitionKind::Crossfade, 0.5)
        .unwrap();

    let timeline = session.timeline();
    let resolver = FrameResolver::new(timeline);

    // Pre-boundary lead-in: both clips active, progress still clamped to 0.
    let frame = resolver.resolve(3.9);
    match frame.main {
        MainSlot::Transition {
            outgoing,
            incoming,
            progress,
            ..
        } => {
            assert_eq!(outgoing.clip.id, a);
            assert_eq!(incoming.clip.id, b);
            assert_eq!(progress, 0.0);
        }
        other => panic!("expected transition at t=3.9, got {other:?}"),
    }

    // Halfway through the 0.5s window past the junction.
    let frame = resolver.resolve(4.25);
    match frame.main {
        MainSlot::Transition { progress, outgoing, .. } => {
            assert!((progress - 0.5).abs() < 1e-6);
            // The outgoing clip keeps advancing past its nominal end.
            assert!((outgoing.local_sec - 4.25).abs() < 1e-9);
        }
        other => panic!("expected transition at t=4.25, got {other:?}"),
    }

    // Outside the window the slot degenerates to a single clip.
    match resolver.resolve(5.0).main {
        MainSlot::Single(rc) => assert_eq!(rc.clip.id, b),
        other => panic!("expected single clip at t=5.0, got {other:?}"),
    }
}

#[test]
fn removing_either_endpoint_clip_deletes_the_transition() {
    for remove_from_side in [true, false] {
        let (mut session, a, b) = session_with_back_to_back_clips();
        session
            .add_transition(a, b, TransitionKind::Slide(cutline::transition::SlideDir::Left), 0.5)
            .unwrap();
        assert_eq!(session.timeline().transitions.len(), 1);

        session.remove_clip(if remove_from_side { a } else { b });
        assert!(session.timeline().transitions.is_empty());
    }
}

#[test]
fn split_preserves_media_continuity_and_survives_undo_redo() {
    let (mut session, a, _b) = session_with_back_to_back_clips();
    let before = session.snapshot();

    let second = session.split_clip(a, 1.5).unwrap();
    {
        let (_, first) = session.timeline().find_clip(a).unwrap();
        let (_, tail) = session.timeline().find_clip(second).unwrap();
        assert!((first.duration_sec + tail.duration_sec - 4.0).abs() < 1e-9);
        assert!((tail.trim_start_sec - (first.trim_start_sec + first.duration_sec)).abs() < 1e-9);
        assert!((tail.start_sec - 1.5).abs() < 1e-9);
    }

    assert!(session.undo());
    assert_eq!(session.snapshot(), before);
    assert!(session.timeline().find_clip(second).is_none());

    assert!(session.redo());
    assert!(session.timeline().find_clip(second).is_some());
}

#[test]
fn splits_too_close_to_an_edge_are_rejected() {
    let (mut session, a, _b) = session_with_back_to_back_clips();
    let depth = session.undo_len();
    assert!(session.split_clip(a, 0.05).is_none());
    assert!(session.split_clip(a, 3.95).is_none());
    // No history entry for a rejected edit.
    assert_eq!(session.undo_len(), depth);
}

#[test]
fn derived_duration_tracks_every_structural_change() {
    let (mut session, _a, b) = session_with_back_to_back_clips();
    assert!((session.duration_sec() - 7.0).abs() < 1e-9);

    session.move_clip(b, 10.0);
    assert!((session.duration_sec() - 13.0).abs() < 1e-9);

    session.remove_clip(b);
    assert!((session.duration_sec() - 4.0).abs() < 1e-9);
}

#[test]
fn stale_ids_are_ignored_not_fatal() {
    let (mut session, _a, _b) = session_with_back_to_back_clips();
    let ghost = uuid::Uuid::new_v4();
    assert!(!session.remove_clip(ghost));
    assert!(!session.move_clip(ghost, 1.0));
    assert!(session.split_clip(ghost, 1.0).is_none());
    assert!(!session.remove_track(ghost));
}

#[test]
fn snapping_prefers_the_nearest_boundary_within_threshold() {
    let (session, _a, _b) = session_with_back_to_back_clips();
    let engine = session.snap_engine(None);

    // 8px at 100 px/sec is 0.08s of slack around the 4.0s junction.
    let result = engine.snap_time(4.05, 100.0);
    assert!(result.snapped);
    assert!((result.time_sec - 4.0).abs() < 1e-9);

    // Snapping an exact boundary is idempotent.
    let result = engine.snap_time(4.0, 100.0);
    assert!(result.snapped);
    assert!((result.time_sec - 4.0).abs() < 1e-9);

    let result = engine.snap_time(2.0, 100.0);
    assert!(!result.snapped);
    assert!((result.time_sec - 2.0).abs() < 1e-9);
}

#[test]
fn session_timeline_round_trips_through_json() {
    let (mut session, a, b) = session_with_back_to_back_clips();
    session
        .add_transition(a, b, TransitionKind::FadeToBlack, 0.25)
        .unwrap();

    let json = session.timeline().to_json().unwrap();
    let back = Timeline::from_json(&json).unwrap();
    assert_eq!(&back, session.timeline());
}
