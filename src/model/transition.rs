use crate::model::{ClipId, TrackId, TransitionId};
use crate::transition::TransitionKind;

/// Adjacency tolerance between `from.end` and `to.start`, in seconds.
pub const TRANSITION_ADJACENCY_EPSILON: f64 = 1e-3;

/// A timed visual blend between two temporally-adjacent clips on one track.
///
/// `from_clip` must end where `to_clip` starts (within
/// [`TRANSITION_ADJACENCY_EPSILON`]). At most one transition exists per
/// ordered clip pair; inserting a second overwrites the first.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transition {
    /// Stable transition identifier.
    pub id: TransitionId,
    /// Track both clips live on.
    pub track_id: TrackId,
    /// Outgoing clip.
    pub from_clip: ClipId,
    /// Incoming clip.
    pub to_clip: ClipId,
    /// Blend kind.
    pub kind: TransitionKind,
    /// Blend duration in seconds; always > 0.
    pub duration_sec: f64,
}

impl Transition {
    /// Create a transition with a fresh id.
    pub fn new(
        track_id: TrackId,
        from_clip: ClipId,
        to_clip: ClipId,
        kind: TransitionKind,
        duration_sec: f64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            track_id,
            from_clip,
            to_clip,
            kind,
            duration_sec,
        }
    }

    /// Return `true` when this transition references `clip`.
    pub fn references(&self, clip: ClipId) -> bool {
        self.from_clip == clip || self.to_clip == clip
    }
}
