use crate::model::{
    AssetId, Clip, ClipId, MediaAsset, ProjectSettings, Track, TrackId, TrackRole, Transition,
};

/// The complete editable timeline: settings, assets, tracks and transitions.
///
/// Plain serializable records; ids are opaque strings on the wire and the
/// whole structure round-trips through JSON.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Timeline {
    /// Canvas and frame-rate settings.
    pub settings: ProjectSettings,
    /// Imported media assets.
    #[serde(default)]
    pub assets: Vec<MediaAsset>,
    /// Ordered track lanes (top to bottom).
    pub tracks: Vec<Track>,
    /// Transitions between adjacent clips.
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

impl Timeline {
    /// Create an empty timeline with the given settings.
    pub fn new(settings: ProjectSettings) -> Self {
        Self {
            settings,
            assets: Vec::new(),
            tracks: Vec::new(),
            transitions: Vec::new(),
        }
    }

    /// Load a timeline from JSON.
    pub fn from_json(json: &str) -> crate::CutResult<Self> {
        serde_json::from_str(json).map_err(|e| crate::CutError::serde(e.to_string()))
    }

    /// Serialize the timeline to JSON.
    pub fn to_json(&self) -> crate::CutResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| crate::CutError::serde(e.to_string()))
    }

    /// Look up an asset by id.
    pub fn asset(&self, id: AssetId) -> Option<&MediaAsset> {
        self.assets.iter().find(|a| a.id == id)
    }

    /// Look up a track by id.
    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// Look up a track by id, mutably.
    pub fn track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    /// The track carrying `role`, if one exists.
    pub fn role_track(&self, role: TrackRole) -> Option<&Track> {
        self.tracks.iter().find(|t| t.role == Some(role))
    }

    /// Find a clip and its owning track by clip id.
    pub fn find_clip(&self, id: ClipId) -> Option<(&Track, &Clip)> {
        self.tracks
            .iter()
            .find_map(|t| t.clip(id).map(|c| (t, c)))
    }

    /// Id of the track owning `clip`, if any.
    pub fn track_of_clip(&self, id: ClipId) -> Option<TrackId> {
        self.find_clip(id).map(|(t, _)| t.id)
    }

    /// Transition whose incoming clip is `to`, if any.
    pub fn transition_into(&self, to: ClipId) -> Option<&Transition> {
        self.transitions.iter().find(|tr| tr.to_clip == to)
    }

    /// Transition whose outgoing clip is `from`, if any.
    pub fn transition_out_of(&self, from: ClipId) -> Option<&Transition> {
        self.transitions.iter().find(|tr| tr.from_clip == from)
    }

    /// Derived project duration: `max(start + duration)` over all clips.
    ///
    /// Recomputed, never stored; callers cache it per structural change.
    pub fn duration_sec(&self) -> f64 {
        self.tracks
            .iter()
            .flat_map(|t| t.clips.iter())
            .map(Clip::end_sec)
            .fold(0.0, f64::max)
    }

    /// Re-sort tracks by the fixed role ordering.
    ///
    /// Role-bearing tracks sort text > overlay > main > audio; tracks without
    /// a role keep their relative insertion order below them. Called whenever
    /// the role-bearing set changes.
    pub fn sort_tracks_by_role(&mut self) {
        self.tracks.sort_by_key(|t| match t.role {
            Some(r) => (0u8, r.sort_key()),
            None => (1u8, 0),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClipProps, TrackKind};

    fn timeline_with_roles() -> Timeline {
        let mut tl = Timeline::new(ProjectSettings::default());
        tl.tracks.push(Track::new(TrackKind::Audio, Some(TrackRole::Audio)));
        tl.tracks.push(Track::new(TrackKind::Video, Some(TrackRole::Main)));
        tl.tracks.push(Track::new(TrackKind::Text, Some(TrackRole::Text)));
        tl.tracks.push(Track::new(TrackKind::Overlay, Some(TrackRole::Overlay)));
        tl
    }

    #[test]
    fn sort_tracks_follows_fixed_role_order() {
        let mut tl = timeline_with_roles();
        tl.sort_tracks_by_role();
        let order: Vec<_> = tl.tracks.iter().map(|t| t.role.unwrap()).collect();
        assert_eq!(
            order,
            vec![
                TrackRole::Text,
                TrackRole::Overlay,
                TrackRole::Main,
                TrackRole::Audio
            ]
        );
    }

    #[test]
    fn non_role_tracks_keep_insertion_order_below_roles() {
        let mut tl = timeline_with_roles();
        let mut extra_a = Track::new(TrackKind::Overlay, None);
        extra_a.clips.push(Clip::new(None, 0.0, 1.0, ClipProps::overlay()));
        let extra_b = Track::new(TrackKind::Overlay, None);
        let (a_id, b_id) = (extra_a.id, extra_b.id);
        tl.tracks.insert(1, extra_a);
        tl.tracks.insert(3, extra_b);
        tl.sort_tracks_by_role();
        let tail: Vec<_> = tl.tracks[4..].iter().map(|t| t.id).collect();
        assert_eq!(tail, vec![a_id, b_id]);
    }

    #[test]
    fn duration_is_max_clip_end_across_tracks() {
        let mut tl = timeline_with_roles();
        tl.tracks[0].clips.push(Clip::new(None, 1.0, 2.5, ClipProps::audio()));
        tl.tracks[1].clips.push(Clip::new(None, 0.0, 2.0, ClipProps::video()));
        assert!((tl.duration_sec() - 3.5).abs() < 1e-12);
    }

    #[test]
    fn json_round_trip_preserves_model() {
        let mut tl = timeline_with_roles();
        tl.tracks[1].clips.push(Clip::new(None, 0.0, 2.0, ClipProps::video()));
        let back = Timeline::from_json(&tl.to_json().unwrap()).unwrap();
        assert_eq!(tl, back);
    }
}
