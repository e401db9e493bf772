use crate::model::{Clip, ClipId, TrackId};

/// Content kind of a track lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TrackKind {
    /// Video clips.
    Video,
    /// Audio clips.
    Audio,
    /// Generated text clips.
    Text,
    /// Overlay clips.
    Overlay,
}

/// Semantic role used for placement ("the" main video track, etc.).
///
/// At most one track per role exists at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TrackRole {
    /// Primary video lane.
    Main,
    /// Overlay lane above main.
    Overlay,
    /// Text lane above everything visual.
    Text,
    /// Audio lane below main.
    Audio,
}

impl TrackRole {
    /// Fixed top-to-bottom ordering: text above overlay above main above audio.
    pub fn sort_key(self) -> u8 {
        match self {
            TrackRole::Text => 0,
            TrackRole::Overlay => 1,
            TrackRole::Main => 2,
            TrackRole::Audio => 3,
        }
    }

    /// Track kind implied by this role.
    pub fn kind(self) -> TrackKind {
        match self {
            TrackRole::Main => TrackKind::Video,
            TrackRole::Overlay => TrackKind::Overlay,
            TrackRole::Text => TrackKind::Text,
            TrackRole::Audio => TrackKind::Audio,
        }
    }
}

/// An ordered lane of clips of one kind.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Track {
    /// Stable track identifier.
    pub id: TrackId,
    /// Content kind.
    pub kind: TrackKind,
    /// Optional semantic role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<TrackRole>,
    /// Muted tracks contribute no audio to the mix.
    #[serde(default)]
    pub muted: bool,
    /// Structurally significant tracks cannot be deleted.
    #[serde(default)]
    pub required: bool,
    /// Clips on this lane, kept sorted by `start_sec`.
    pub clips: Vec<Clip>,
}

impl Track {
    /// Create an empty track with a fresh id.
    pub fn new(kind: TrackKind, role: Option<TrackRole>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            kind,
            role,
            muted: false,
            required: false,
            clips: Vec::new(),
        }
    }

    /// First clip whose window contains `t`, if any.
    ///
    /// Clips are expected non-overlapping outside transition junctions, so
    /// "first" is also "the" active clip for single-layer kinds.
    pub fn clip_at(&self, t: f64) -> Option<&Clip> {
        self.clips.iter().find(|c| c.contains(t))
    }

    /// All clips whose windows contain `t` (stacking layers).
    pub fn clips_at(&self, t: f64) -> impl Iterator<Item = &Clip> {
        self.clips.iter().filter(move |c| c.contains(t))
    }

    /// Look up a clip by id.
    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == id)
    }

    /// Look up a clip by id, mutably.
    pub fn clip_mut(&mut self, id: ClipId) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|c| c.id == id)
    }

    /// Re-sort clips by timeline start.
    pub fn sort_clips(&mut self) {
        self.clips
            .sort_by(|a, b| a.start_sec.total_cmp(&b.start_sec));
    }

    /// End of the last clip, or 0 for an empty track.
    pub fn end_sec(&self) -> f64 {
        self.clips.iter().map(|c| c.end_sec()).fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClipProps;

    #[test]
    fn role_ordering_is_text_overlay_main_audio() {
        let mut roles = [
            TrackRole::Audio,
            TrackRole::Main,
            TrackRole::Text,
            TrackRole::Overlay,
        ];
        roles.sort_by_key(|r| r.sort_key());
        assert_eq!(
            roles,
            [
                TrackRole::Text,
                TrackRole::Overlay,
                TrackRole::Main,
                TrackRole::Audio
            ]
        );
    }

    #[test]
    fn clip_at_returns_containing_clip() {
        let mut track = Track::new(TrackKind::Video, Some(TrackRole::Main));
        track.clips.push(Clip::new(None, 0.0, 2.0, ClipProps::video()));
        track.clips.push(Clip::new(None, 2.0, 2.0, ClipProps::video()));
        assert_eq!(track.clip_at(0.5).unwrap().start_sec, 0.0);
        assert_eq!(track.clip_at(2.0).unwrap().start_sec, 2.0);
        assert!(track.clip_at(4.0).is_none());
    }

    #[test]
    fn end_sec_is_max_clip_end() {
        let mut track = Track::new(TrackKind::Overlay, None);
        assert_eq!(track.end_sec(), 0.0);
        track.clips.push(Clip::new(None, 1.0, 2.0, ClipProps::overlay()));
        track.clips.push(Clip::new(None, 0.0, 1.5, ClipProps::overlay()));
        assert!((track.end_sec() - 3.0).abs() < 1e-12);
    }
}
