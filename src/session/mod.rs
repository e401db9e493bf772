//! Editing session: the sole mutation channel for the time-domain model.
//!
//! UI and assistant features (captioning, B-roll, silence removal) all edit
//! the timeline through [`EditorSession`]; nothing mutates the model behind
//! its back. The session bundles model, history and view state explicitly so
//! the core stays testable without a UI harness.
//!
//! Operation contract:
//! - destructive operations snapshot history first (after validation);
//! - operations on missing ids are no-ops, never errors;
//! - degenerate inputs (zero/negative duration, split too close to an edge,
//!   non-adjacent transition) are rejected by returning `false`/`None`;
//! - every structural change recomputes the derived project duration.

mod history;
mod snap;

pub use history::{EditHistory, HISTORY_CAP, Snapshot};
pub use snap::{SNAP_THRESHOLD_PX, SnapCandidate, SnapEngine, SnapResult, SnapSource};

use crate::model::{
    AssetId, Clip, ClipId, ClipKind, ClipProps, MediaAsset, ProjectSettings, Timeline, Track,
    TrackId, TrackKind, TrackRole, Transition, TransitionId, TRANSITION_ADJACENCY_EPSILON,
};
use crate::transition::TransitionKind;

/// Minimum distance from a clip edge at which a split is accepted, seconds.
pub const MIN_SPLIT_MARGIN_SEC: f64 = 0.1;

/// Zoom bounds in pixels per second.
const ZOOM_RANGE: (f64, f64) = (1.0, 1000.0);

/// One editing session: timeline, history, selection and view state.
#[derive(Debug)]
pub struct EditorSession {
    timeline: Timeline,
    history: EditHistory,
    duration_sec: f64,

    selected_clips: Vec<ClipId>,
    selected_transition: Option<TransitionId>,
    playhead_sec: f64,
    zoom_px_per_sec: f64,
    scroll_sec: f64,

    playing: bool,
    exporting: bool,
}

impl EditorSession {
    /// Create a session over an empty timeline.
    pub fn new(settings: ProjectSettings) -> Self {
        Self::with_timeline(Timeline::new(settings))
    }

    /// Create a session over an existing timeline (project load).
    pub fn with_timeline(timeline: Timeline) -> Self {
        let duration_sec = timeline.duration_sec();
        Self {
            timeline,
            history: EditHistory::new(),
            duration_sec,
            selected_clips: Vec::new(),
            selected_transition: None,
            playhead_sec: 0.0,
            zoom_px_per_sec: 100.0,
            scroll_sec: 0.0,
            playing: false,
            exporting: false,
        }
    }

    /// Borrow the timeline for resolution, mixing and export.
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Derived project duration, recomputed after every structural change.
    pub fn duration_sec(&self) -> f64 {
        self.duration_sec
    }

    /// Current playhead position.
    pub fn playhead_sec(&self) -> f64 {
        self.playhead_sec
    }

    /// Current zoom in pixels per second.
    pub fn zoom_px_per_sec(&self) -> f64 {
        self.zoom_px_per_sec
    }

    /// Current horizontal scroll offset in seconds.
    pub fn scroll_sec(&self) -> f64 {
        self.scroll_sec
    }

    /// Currently selected clips.
    pub fn selected_clips(&self) -> &[ClipId] {
        &self.selected_clips
    }

    /// Currently selected transition.
    pub fn selected_transition(&self) -> Option<TransitionId> {
        self.selected_transition
    }

    /// Undoable snapshot count.
    pub fn undo_len(&self) -> usize {
        self.history.undo_len()
    }

    /// Redoable snapshot count.
    pub fn redo_len(&self) -> usize {
        self.history.redo_len()
    }

    // ---- assets ----

    /// Register an imported media asset and return its id.
    pub fn import_asset(&mut self, asset: MediaAsset) -> AssetId {
        let id = asset.id;
        self.timeline.assets.push(asset);
        id
    }

    /// Remove an asset, releasing its byte source reference.
    ///
    /// Clips that still reference the asset keep their id and simply resolve
    /// to nothing afterwards.
    pub fn remove_asset(&mut self, id: AssetId) -> bool {
        let before = self.timeline.assets.len();
        self.timeline.assets.retain(|a| a.id != id);
        self.timeline.assets.len() != before
    }

    // ---- tracks ----

    /// Add a role-less track of `kind` below all role tracks.
    pub fn add_track(&mut self, kind: TrackKind) -> TrackId {
        self.push_history();
        let track = Track::new(kind, None);
        let id = track.id;
        self.timeline.tracks.push(track);
        self.structural_change();
        id
    }

    /// Lookup-or-create accessor for "the" track with `role`.
    ///
    /// Enforces the at-most-one-track-per-role invariant and re-sorts the
    /// role-bearing tracks into the fixed ordering whenever a role track is
    /// created.
    pub fn track_for_role(&mut self, role: TrackRole) -> TrackId {
        if let Some(t) = self.timeline.role_track(role) {
            return t.id;
        }
        self.push_history();
        let mut track = Track::new(role.kind(), Some(role));
        track.required = true;
        let id = track.id;
        self.timeline.tracks.push(track);
        self.timeline.sort_tracks_by_role();
        self.structural_change();
        id
    }

    /// Remove a track and every clip/transition on it.
    ///
    /// Required (structurally significant) tracks are protected and the call
    /// is a no-op returning `false`.
    pub fn remove_track(&mut self, id: TrackId) -> bool {
        let Some(track) = self.timeline.track(id) else {
            return false;
        };
        if track.required {
            return false;
        }
        let had_role = track.role.is_some();
        self.push_history();
        self.timeline.tracks.retain(|t| t.id != id);
        self.timeline.transitions.retain(|tr| tr.track_id != id);
        if had_role {
            self.timeline.sort_tracks_by_role();
        }
        self.prune_selection();
        self.structural_change();
        true
    }

    /// Toggle a track's mute flag. Non-destructive: no history snapshot.
    pub fn set_track_muted(&mut self, id: TrackId, muted: bool) -> bool {
        match self.timeline.track_mut(id) {
            Some(t) => {
                t.muted = muted;
                true
            }
            None => false,
        }
    }

    // ---- clips ----

    /// Add a clip to a track.
    ///
    /// The requested start is clamped to the nearest non-overlapping
    /// position: clips on one track never overlap outside a shared boundary.
    /// Returns the clip id, or `None` for degenerate input or a missing
    /// track or mismatched clip/track kind.
    pub fn add_clip(&mut self, track_id: TrackId, mut clip: Clip) -> Option<ClipId> {
        if clip.duration_sec <= 0.0 || clip.trim_start_sec < 0.0 || clip.trim_end_sec < 0.0 {
            return None;
        }
        let track = self.timeline.track(track_id)?;
        if !clip_fits_track(clip.kind(), track.kind) {
            return None;
        }
        clip.start_sec = resolve_overlap(track, clip.start_sec, clip.duration_sec, None);

        self.push_history();
        let id = clip.id;
        let track = self.timeline.track_mut(track_id).expect("track checked");
        track.clips.push(clip);
        track.sort_clips();
        self.structural_change();
        Some(id)
    }

    /// Replace a clip's rendering properties.
    ///
    /// The property variant must keep the clip's kind; a kind change is
    /// rejected silently.
    pub fn set_clip_props(&mut self, id: ClipId, props: ClipProps) -> bool {
        let Some((_, clip)) = self.timeline.find_clip(id) else {
            return false;
        };
        if clip.kind() != props.kind() {
            return false;
        }
        self.push_history();
        if let Some(clip) = self.clip_mut(id) {
            clip.props = props;
        }
        true
    }

    /// Move a clip along its own track.
    pub fn move_clip(&mut self, id: ClipId, new_start_sec: f64) -> bool {
        if !new_start_sec.is_finite() || new_start_sec < 0.0 {
            return false;
        }
        let Some((track, clip)) = self.timeline.find_clip(id) else {
            return false;
        };
        let start = resolve_overlap(track, new_start_sec, clip.duration_sec, Some(id));
        let track_id = track.id;

        self.push_history();
        let track = self.timeline.track_mut(track_id).expect("track checked");
        if let Some(clip) = track.clip_mut(id) {
            clip.start_sec = start;
        }
        track.sort_clips();
        self.drop_broken_transitions();
        self.structural_change();
        true
    }

    /// Move a clip to another track.
    ///
    /// Legal only between tracks of the same kind, or between the `main` and
    /// `overlay` roles specifically; any other pair is rejected silently.
    /// Transitions referencing the clip are deleted (adjacency is broken).
    pub fn move_clip_to_track(&mut self, id: ClipId, dest_track: TrackId) -> bool {
        let Some((src, clip)) = self.timeline.find_clip(id) else {
            return false;
        };
        let Some(dst) = self.timeline.track(dest_track) else {
            return false;
        };
        if src.id == dst.id {
            return false;
        }

        let same_kind = src.kind == dst.kind;
        let main_overlay = matches!(
            (src.role, dst.role),
            (Some(TrackRole::Main), Some(TrackRole::Overlay))
                | (Some(TrackRole::Overlay), Some(TrackRole::Main))
        );
        if !same_kind && !main_overlay {
            return false;
        }

        let mut moved = clip.clone();
        if !same_kind {
            moved.props = convert_main_overlay_props(moved.props);
        }
        moved.start_sec = resolve_overlap(dst, moved.start_sec, moved.duration_sec, None);
        let src_id = src.id;

        self.push_history();
        if let Some(src) = self.timeline.track_mut(src_id) {
            src.clips.retain(|c| c.id != id);
        }
        self.timeline.transitions.retain(|tr| !tr.references(id));
        if let Some(dst) = self.timeline.track_mut(dest_track) {
            dst.clips.push(moved);
            dst.sort_clips();
        }
        self.structural_change();
        true
    }

    /// Trim a clip's left edge to a new timeline start.
    ///
    /// Adjusts `start`, `duration` and `trim_start` together so the clip
    /// keeps playing the same media at the same timeline instants.
    pub fn trim_clip_left(&mut self, id: ClipId, new_start_sec: f64) -> bool {
        let Some((_, clip)) = self.timeline.find_clip(id) else {
            return false;
        };
        let delta = new_start_sec - clip.start_sec;
        if clip.duration_sec - delta <= 0.0 || clip.trim_start_sec + delta < 0.0 {
            return false;
        }
        self.push_history();
        if let Some(clip) = self.clip_mut(id) {
            clip.start_sec += delta;
            clip.duration_sec -= delta;
            clip.trim_start_sec += delta;
        }
        self.drop_broken_transitions();
        self.structural_change();
        true
    }

    /// Trim a clip's right edge to a new timeline end.
    ///
    /// For media-backed clips the extension is capped by the asset's
    /// remaining trim-out margin.
    pub fn trim_clip_right(&mut self, id: ClipId, new_end_sec: f64) -> bool {
        let Some((_, clip)) = self.timeline.find_clip(id) else {
            return false;
        };
        let new_duration = new_end_sec - clip.start_sec;
        if new_duration <= 0.0 {
            return false;
        }
        if let Some(asset) = clip.asset_id.and_then(|a| self.timeline.asset(a))
            && asset.duration_sec > 0.0
            && clip.trim_start_sec + new_duration > asset.duration_sec
        {
            return false;
        }
        let grow = new_duration - clip.duration_sec;
        self.push_history();
        if let Some(clip) = self.clip_mut(id) {
            clip.duration_sec = new_duration;
            clip.trim_end_sec = (clip.trim_end_sec - grow).max(0.0);
        }
        self.drop_broken_transitions();
        self.structural_change();
        true
    }

    /// Remove a clip. Cascades: transitions referencing it are deleted.
    pub fn remove_clip(&mut self, id: ClipId) -> bool {
        let Some(track_id) = self.timeline.track_of_clip(id) else {
            return false;
        };
        self.push_history();
        if let Some(track) = self.timeline.track_mut(track_id) {
            track.clips.retain(|c| c.id != id);
        }
        self.timeline.transitions.retain(|tr| !tr.references(id));
        self.prune_selection();
        self.structural_change();
        true
    }

    /// Split a clip at timeline time `t`.
    ///
    /// Rejects splits within 0.1 s of either clip edge to guard against
    /// degenerate zero-length clips. The two halves partition the original
    /// trim window exactly: the second clip's `trim_start` absorbs the
    /// elapsed play time, the first clip's `trim_end` absorbs the remainder.
    /// A transition out of the original clip follows the second half, which
    /// now owns the junction.
    pub fn split_clip(&mut self, id: ClipId, t: f64) -> Option<ClipId> {
        let (_, clip) = self.timeline.find_clip(id)?;
        if t - clip.start_sec < MIN_SPLIT_MARGIN_SEC || clip.end_sec() - t < MIN_SPLIT_MARGIN_SEC {
            return None;
        }
        let elapsed = t - clip.start_sec;
        let remainder = clip.duration_sec - elapsed;
        let track_id = self.timeline.track_of_clip(id)?;

        self.push_history();
        let track = self.timeline.track_mut(track_id).expect("track checked");
        let first = track.clip_mut(id).expect("clip checked");

        let mut second = first.clone();
        second.id = uuid::Uuid::new_v4();
        second.start_sec = t;
        second.duration_sec = remainder;
        second.trim_start_sec = first.trim_start_sec + elapsed;

        first.duration_sec = elapsed;
        first.trim_end_sec += remainder;

        let second_id = second.id;
        track.clips.push(second);
        track.sort_clips();

        for tr in &mut self.timeline.transitions {
            if tr.from_clip == id {
                tr.from_clip = second_id;
            }
        }

        self.structural_change();
        Some(second_id)
    }

    // ---- transitions ----

    /// Insert a transition between two temporally adjacent clips.
    ///
    /// The end of `from` must equal the start of `to` within a small
    /// epsilon. At most one transition exists per ordered clip pair;
    /// inserting a second overwrites the first. Returns `None` for missing
    /// ids, non-adjacent clips or a non-positive duration.
    pub fn add_transition(
        &mut self,
        from_clip: ClipId,
        to_clip: ClipId,
        kind: TransitionKind,
        duration_sec: f64,
    ) -> Option<TransitionId> {
        if duration_sec <= 0.0 || from_clip == to_clip {
            return None;
        }
        let (from_track, from) = self.timeline.find_clip(from_clip)?;
        let (to_track, to) = self.timeline.find_clip(to_clip)?;
        if from_track.id != to_track.id {
            return None;
        }
        if (from.end_sec() - to.start_sec).abs() > TRANSITION_ADJACENCY_EPSILON {
            return None;
        }
        let track_id = from_track.id;

        self.push_history();
        self.timeline
            .transitions
            .retain(|tr| !(tr.from_clip == from_clip && tr.to_clip == to_clip));
        let transition = Transition::new(track_id, from_clip, to_clip, kind, duration_sec);
        let id = transition.id;
        self.timeline.transitions.push(transition);
        self.structural_change();
        Some(id)
    }

    /// Update a transition's kind and duration.
    pub fn update_transition(
        &mut self,
        id: TransitionId,
        kind: TransitionKind,
        duration_sec: f64,
    ) -> bool {
        if duration_sec <= 0.0 {
            return false;
        }
        if !self.timeline.transitions.iter().any(|tr| tr.id == id) {
            return false;
        }
        self.push_history();
        if let Some(tr) = self.timeline.transitions.iter_mut().find(|tr| tr.id == id) {
            tr.kind = kind;
            tr.duration_sec = duration_sec;
        }
        true
    }

    /// Remove a transition.
    pub fn remove_transition(&mut self, id: TransitionId) -> bool {
        if !self.timeline.transitions.iter().any(|tr| tr.id == id) {
            return false;
        }
        self.push_history();
        self.timeline.transitions.retain(|tr| tr.id != id);
        if self.selected_transition == Some(id) {
            self.selected_transition = None;
        }
        true
    }

    // ---- selection & view state ----

    /// Select a clip, optionally adding to the current selection.
    pub fn select_clip(&mut self, id: ClipId, additive: bool) {
        if self.timeline.find_clip(id).is_none() {
            return;
        }
        if !additive {
            self.selected_clips.clear();
        }
        if !self.selected_clips.contains(&id) {
            self.selected_clips.push(id);
        }
        self.selected_transition = None;
    }

    /// Select a transition, clearing any clip selection.
    pub fn select_transition(&mut self, id: TransitionId) {
        if self.timeline.transitions.iter().any(|tr| tr.id == id) {
            self.selected_transition = Some(id);
            self.selected_clips.clear();
        }
    }

    /// Clear all selection.
    pub fn clear_selection(&mut self) {
        self.selected_clips.clear();
        self.selected_transition = None;
    }

    /// Move the playhead; clamped to `[0, ∞)`.
    pub fn set_playhead(&mut self, t: f64) {
        self.playhead_sec = t.max(0.0);
    }

    /// Set timeline zoom in pixels per second, clamped to a sane range.
    pub fn set_zoom(&mut self, px_per_sec: f64) {
        self.zoom_px_per_sec = px_per_sec.clamp(ZOOM_RANGE.0, ZOOM_RANGE.1);
    }

    /// Set horizontal scroll offset in seconds.
    pub fn set_scroll(&mut self, sec: f64) {
        self.scroll_sec = sec.max(0.0);
    }

    /// Build a snap engine for dragging on `dragged_track`.
    pub fn snap_engine(&self, dragged_track: Option<TrackId>) -> SnapEngine {
        SnapEngine::for_drag(&self.timeline, dragged_track, self.playhead_sec)
    }

    // ---- history ----

    /// Undo the last destructive operation.
    pub fn undo(&mut self) -> bool {
        let current = self.snapshot();
        match self.history.undo(current) {
            Some(snap) => {
                self.restore(snap);
                true
            }
            None => false,
        }
    }

    /// Redo the last undone operation.
    pub fn redo(&mut self) -> bool {
        let current = self.snapshot();
        match self.history.redo(current) {
            Some(snap) => {
                self.restore(snap);
                true
            }
            None => false,
        }
    }

    /// Capture the undoable state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tracks: self.timeline.tracks.clone(),
            transitions: self.timeline.transitions.clone(),
        }
    }

    // ---- playback/export exclusivity ----

    /// Mark playback active. Fails while an offline export holds the decode
    /// resources.
    pub fn begin_playback(&mut self) -> bool {
        if self.exporting {
            return false;
        }
        self.playing = true;
        true
    }

    /// Mark playback stopped.
    pub fn end_playback(&mut self) {
        self.playing = false;
    }

    /// Mark an offline export active. Fails while playback is running.
    pub fn begin_export(&mut self) -> bool {
        if self.playing {
            return false;
        }
        self.exporting = true;
        true
    }

    /// Mark the offline export finished.
    pub fn end_export(&mut self) {
        self.exporting = false;
    }

    /// Whether playback is currently active.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    // ---- internals ----

    fn clip_mut(&mut self, id: ClipId) -> Option<&mut Clip> {
        self.timeline
            .tracks
            .iter_mut()
            .find_map(|t| t.clip_mut(id))
    }

    fn push_history(&mut self) {
        let snap = self.snapshot();
        self.history.push(snap);
    }

    fn restore(&mut self, snap: Snapshot) {
        self.timeline.tracks = snap.tracks;
        self.timeline.transitions = snap.transitions;
        self.prune_selection();
        self.structural_change();
    }

    fn structural_change(&mut self) {
        self.duration_sec = self.timeline.duration_sec();
    }

    fn prune_selection(&mut self) {
        let timeline = &self.timeline;
        self.selected_clips
            .retain(|&id| timeline.find_clip(id).is_some());
        if let Some(id) = self.selected_transition
            && !timeline.transitions.iter().any(|tr| tr.id == id)
        {
            self.selected_transition = None;
        }
    }

    /// Delete transitions whose clip pair is no longer adjacent.
    fn drop_broken_transitions(&mut self) {
        let timeline = &self.timeline;
        let keep: Vec<bool> = timeline
            .transitions
            .iter()
            .map(|tr| {
                match (timeline.find_clip(tr.from_clip), timeline.find_clip(tr.to_clip)) {
                    (Some((_, from)), Some((_, to))) => {
                        (from.end_sec() - to.start_sec).abs() <= TRANSITION_ADJACENCY_EPSILON
                    }
                    _ => false,
                }
            })
            .collect();
        let mut keep = keep.into_iter();
        self.timeline.transitions.retain(|_| keep.next().unwrap_or(false));
    }
}

fn clip_fits_track(clip: ClipKind, track: TrackKind) -> bool {
    matches!(
        (clip, track),
        (ClipKind::Video, TrackKind::Video)
            | (ClipKind::Audio, TrackKind::Audio)
            | (ClipKind::Text, TrackKind::Text)
            | (ClipKind::Overlay, TrackKind::Overlay)
    )
}

/// Clamp a requested clip window to the nearest non-overlapping start.
///
/// Boundary contact is allowed (that is what a transition junction is); only
/// strict overlap shifts the clip, to the end of the last clip it collides
/// with.
fn resolve_overlap(track: &Track, start_sec: f64, duration_sec: f64, ignore: Option<ClipId>) -> f64 {
    let mut start = start_sec.max(0.0);
    loop {
        let collision = track.clips.iter().find(|c| {
            Some(c.id) != ignore && start < c.end_sec() && start + duration_sec > c.start_sec
        });
        match collision {
            Some(c) => start = c.end_sec(),
            None => return start,
        }
    }
}

/// Map clip props between the main video and overlay variants when moving a
/// clip across the main/overlay role pair.
fn convert_main_overlay_props(props: ClipProps) -> ClipProps {
    match props {
        ClipProps::Video {
            opacity,
            volume,
            transform,
            fade_in_sec,
            fade_out_sec,
        } => ClipProps::Overlay {
            opacity,
            volume,
            transform,
            fade_in_sec,
            fade_out_sec,
        },
        ClipProps::Overlay {
            opacity,
            volume,
            transform,
            fade_in_sec,
            fade_out_sec,
        } => ClipProps::Video {
            opacity,
            volume,
            transform,
            fade_in_sec,
            fade_out_sec,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MediaAsset;

    fn session_with_main() -> (EditorSession, TrackId) {
        let mut s = EditorSession::new(ProjectSettings::default());
        let main = s.track_for_role(TrackRole::Main);
        (s, main)
    }

    fn video_clip(start: f64, dur: f64) -> Clip {
        Clip::new(None, start, dur, ClipProps::video())
    }

    #[test]
    fn role_accessor_is_idempotent() {
        let (mut s, main) = session_with_main();
        assert_eq!(s.track_for_role(TrackRole::Main), main);
        assert_eq!(
            s.timeline()
                .tracks
                .iter()
                .filter(|t| t.role == Some(TrackRole::Main))
                .count(),
            1
        );
    }

    #[test]
    fn required_tracks_cannot_be_removed() {
        let (mut s, main) = session_with_main();
        assert!(!s.remove_track(main));
        assert!(s.timeline().track(main).is_some());
    }

    #[test]
    fn split_conserves_duration_and_partitions_trim() {
        let (mut s, main) = session_with_main();
        let mut clip = video_clip(1.0, 4.0);
        clip.trim_start_sec = 0.5;
        clip.trim_end_sec = 0.25;
        let id = s.add_clip(main, clip).unwrap();

        let second = s.split_clip(id, 2.5).unwrap();
        let (_, first) = s.timeline().find_clip(id).unwrap();
        let (_, second) = s.timeline().find_clip(second).unwrap();

        assert!((first.duration_sec + second.duration_sec - 4.0).abs() < 1e-12);
        assert!(
            (second.trim_start_sec - (first.trim_start_sec + first.duration_sec)).abs() < 1e-12
        );
        assert!((second.trim_end_sec - 0.25).abs() < 1e-12);
        assert!((first.trim_end_sec - (0.25 + second.duration_sec)).abs() < 1e-12);
        assert!((second.start_sec - 2.5).abs() < 1e-12);
    }

    #[test]
    fn split_rejects_near_edges() {
        let (mut s, main) = session_with_main();
        let id = s.add_clip(main, video_clip(0.0, 1.0)).unwrap();
        assert!(s.split_clip(id, 0.05).is_none());
        assert!(s.split_clip(id, 0.95).is_none());
        assert!(s.split_clip(id, 0.5).is_some());
    }

    #[test]
    fn derived_duration_tracks_edits() {
        let (mut s, main) = session_with_main();
        let id = s.add_clip(main, video_clip(0.0, 4.0)).unwrap();
        assert!((s.duration_sec() - 4.0).abs() < 1e-12);
        s.move_clip(id, 2.0);
        assert!((s.duration_sec() - 6.0).abs() < 1e-12);
        s.remove_clip(id);
        assert_eq!(s.duration_sec(), 0.0);
    }

    #[test]
    fn overlap_is_clamped_to_nearest_gap() {
        let (mut s, main) = session_with_main();
        s.add_clip(main, video_clip(0.0, 4.0)).unwrap();
        let id = s.add_clip(main, video_clip(2.0, 3.0)).unwrap();
        let (_, clip) = s.timeline().find_clip(id).unwrap();
        assert!((clip.start_sec - 4.0).abs() < 1e-12);
    }

    #[test]
    fn undo_redo_round_trip_restores_bit_identical_state() {
        let (mut s, main) = session_with_main();
        let a = s.add_clip(main, video_clip(0.0, 4.0)).unwrap();
        let b = s.add_clip(main, video_clip(4.0, 3.0)).unwrap();
        s.add_transition(a, b, TransitionKind::Crossfade, 0.5)
            .unwrap();
        let before = s.snapshot();

        s.remove_clip(b);
        assert_ne!(s.snapshot(), before);
        assert!(s.undo());
        assert_eq!(s.snapshot(), before);
        assert!(s.redo());
        assert!(s.undo());
        assert_eq!(s.snapshot(), before);
    }

    #[test]
    fn removing_clip_cascades_to_transitions() {
        let (mut s, main) = session_with_main();
        let a = s.add_clip(main, video_clip(0.0, 4.0)).unwrap();
        let b = s.add_clip(main, video_clip(4.0, 3.0)).unwrap();
        s.add_transition(a, b, TransitionKind::Crossfade, 0.5)
            .unwrap();
        assert_eq!(s.timeline().transitions.len(), 1);

        s.remove_clip(a);
        assert!(s.timeline().transitions.is_empty());
    }

    #[test]
    fn transition_requires_adjacency() {
        let (mut s, main) = session_with_main();
        let a = s.add_clip(main, video_clip(0.0, 4.0)).unwrap();
        let b = s.add_clip(main, video_clip(5.0, 3.0)).unwrap();
        assert!(s.add_transition(a, b, TransitionKind::Crossfade, 0.5).is_none());
    }

    #[test]
    fn second_transition_on_same_pair_overwrites() {
        let (mut s, main) = session_with_main();
        let a = s.add_clip(main, video_clip(0.0, 4.0)).unwrap();
        let b = s.add_clip(main, video_clip(4.0, 3.0)).unwrap();
        s.add_transition(a, b, TransitionKind::Crossfade, 0.5)
            .unwrap();
        s.add_transition(a, b, TransitionKind::ZoomBlend, 1.0)
            .unwrap();
        assert_eq!(s.timeline().transitions.len(), 1);
        assert_eq!(
            s.timeline().transitions[0].kind,
            TransitionKind::ZoomBlend
        );
    }

    #[test]
    fn operations_on_missing_ids_are_noops() {
        let (mut s, _) = session_with_main();
        let ghost = uuid::Uuid::new_v4();
        assert!(!s.move_clip(ghost, 1.0));
        assert!(!s.remove_clip(ghost));
        assert!(s.split_clip(ghost, 1.0).is_none());
        assert!(!s.remove_track(ghost));
        assert!(!s.remove_transition(ghost));
        s.select_clip(ghost, false);
        assert!(s.selected_clips().is_empty());
    }

    #[test]
    fn move_between_main_and_overlay_converts_props() {
        let mut s = EditorSession::new(ProjectSettings::default());
        let main = s.track_for_role(TrackRole::Main);
        let overlay = s.track_for_role(TrackRole::Overlay);
        let id = s.add_clip(main, video_clip(0.0, 2.0)).unwrap();

        assert!(s.move_clip_to_track(id, overlay));
        let (track, clip) = s.timeline().find_clip(id).unwrap();
        assert_eq!(track.id, overlay);
        assert_eq!(clip.kind(), ClipKind::Overlay);
    }

    #[test]
    fn move_between_incompatible_kinds_is_rejected_silently() {
        let mut s = EditorSession::new(ProjectSettings::default());
        let main = s.track_for_role(TrackRole::Main);
        let text = s.track_for_role(TrackRole::Text);
        let id = s.add_clip(main, video_clip(0.0, 2.0)).unwrap();

        assert!(!s.move_clip_to_track(id, text));
        assert_eq!(s.timeline().track_of_clip(id).unwrap(), main);
    }

    #[test]
    fn split_repoints_outgoing_transition_to_second_half() {
        let (mut s, main) = session_with_main();
        let a = s.add_clip(main, video_clip(0.0, 4.0)).unwrap();
        let b = s.add_clip(main, video_clip(4.0, 3.0)).unwrap();
        s.add_transition(a, b, TransitionKind::Crossfade, 0.5)
            .unwrap();

        let second = s.split_clip(a, 2.0).unwrap();
        assert_eq!(s.timeline().transitions[0].from_clip, second);
        assert_eq!(s.timeline().transitions[0].to_clip, b);
    }

    #[test]
    fn trim_right_respects_asset_margin() {
        let (mut s, main) = session_with_main();
        let asset = s.import_asset(MediaAsset::video("a.mp4", 5.0, 640, 360));
        let mut clip = video_clip(0.0, 4.0);
        clip.asset_id = Some(asset);
        clip.trim_start_sec = 0.5;
        let id = s.add_clip(main, clip).unwrap();

        // 0.5 + 4.5 = 5.0 is exactly the asset duration: allowed.
        assert!(s.trim_clip_right(id, 4.5));
        // Anything longer exceeds the source media.
        assert!(!s.trim_clip_right(id, 4.6));
    }

    #[test]
    fn playback_and_export_are_mutually_exclusive() {
        let (mut s, _) = session_with_main();
        assert!(s.begin_playback());
        assert!(!s.begin_export());
        s.end_playback();
        assert!(s.begin_export());
        assert!(!s.begin_playback());
        s.end_export();
        assert!(s.begin_playback());
    }
}
