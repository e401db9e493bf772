//! Timeline-to-frame resolution.
//!
//! [`FrameResolver`] answers "what is visible at time t" as pure data, with
//! no decoding or pixel work. The compositor, the playback loop and all
//! export backends consume the same resolution, which is what makes preview
//! and export agree frame for frame.

use crate::foundation::FrameIndex;
use crate::model::{Clip, ClipKind, Timeline, TrackKind, TrackRole, Transition};
use crate::transition::{TransitionKind, transition_progress};

/// One clip active at the resolved instant, with its media-local time.
#[derive(Clone, Copy, Debug)]
pub struct ResolvedClip<'a> {
    /// The active clip.
    pub clip: &'a Clip,
    /// Media time inside the clip's source, trim offset applied.
    pub local_sec: f64,
}

/// What occupies the main video slot at the resolved instant.
#[derive(Clone, Copy, Debug)]
pub enum MainSlot<'a> {
    /// No main-track clip covers this instant.
    Empty,
    /// Exactly one clip, no transition in flight.
    Single(ResolvedClip<'a>),
    /// Two clips blended by a transition.
    ///
    /// Reported for the whole transition window, which opens one transition
    /// duration before the junction (progress clamped to zero there) so a
    /// renderer can warm the incoming clip's decoder before the blend starts.
    Transition {
        /// Clip being left.
        outgoing: ResolvedClip<'a>,
        /// Clip being entered.
        incoming: ResolvedClip<'a>,
        /// Visual style of the blend.
        kind: TransitionKind,
        /// Blend progress in `[0, 1]`.
        progress: f32,
    },
}

/// Everything visible at one instant, ordered back to front.
#[derive(Debug)]
pub struct ResolvedFrame<'a> {
    /// The resolved timeline instant.
    pub t_sec: f64,
    /// Active clips on video tracks without the main role, bottom-most track
    /// first. Drawn underneath the main slot.
    pub under: Vec<ResolvedClip<'a>>,
    /// Main video layer.
    pub main: MainSlot<'a>,
    /// Active overlay clips, bottom-most track first.
    pub overlays: Vec<ResolvedClip<'a>>,
    /// Active text clips, bottom-most track first.
    pub texts: Vec<ResolvedClip<'a>>,
}

/// Pure timeline query: instant in, visible layer set out.
#[derive(Clone, Copy, Debug)]
pub struct FrameResolver<'a> {
    timeline: &'a Timeline,
}

impl<'a> FrameResolver<'a> {
    /// Build a resolver over a timeline.
    pub fn new(timeline: &'a Timeline) -> Self {
        Self { timeline }
    }

    /// Resolve a frame index at the project frame rate.
    #[tracing::instrument(skip(self))]
    pub fn resolve_frame(&self, frame: FrameIndex) -> ResolvedFrame<'a> {
        self.resolve(self.timeline.settings.fps.frames_to_secs(frame.0))
    }

    /// Resolve an arbitrary instant.
    ///
    /// Same input always yields the same layer set; nothing here depends on
    /// decode state or wall time.
    pub fn resolve(&self, t_sec: f64) -> ResolvedFrame<'a> {
        ResolvedFrame {
            t_sec,
            under: self.collect_under(t_sec),
            main: self.resolve_main(t_sec),
            overlays: self.collect_layers(t_sec, ClipKind::Overlay),
            texts: self.collect_layers(t_sec, ClipKind::Text),
        }
    }

    /// Video tracks beyond the main role still resolve; their clips stack
    /// below the main slot the same way overlay tracks stack above it.
    fn collect_under(&self, t: f64) -> Vec<ResolvedClip<'a>> {
        let mut out = Vec::new();
        for track in &self.timeline.tracks {
            if track.kind != TrackKind::Video || track.role == Some(TrackRole::Main) {
                continue;
            }
            out.extend(track.clips_at(t).map(|clip| resolved(clip, t)));
        }
        out
    }

    fn resolve_main(&self, t: f64) -> MainSlot<'a> {
        let Some(track) = self.timeline.role_track(TrackRole::Main) else {
            return MainSlot::Empty;
        };

        // A transition window covers [to.start - d, to.start + d]. When
        // short clips put two windows over the same instant, the junction
        // nearest to t wins.
        let active = self
            .timeline
            .transitions
            .iter()
            .filter(|tr| tr.track_id == track.id)
            .filter_map(|tr| self.transition_at(tr, t))
            .min_by(|a, b| {
                let da = (t - a.0).abs();
                let db = (t - b.0).abs();
                da.total_cmp(&db)
            });

        if let Some((_, slot)) = active {
            return slot;
        }

        match track.clip_at(t) {
            Some(clip) => MainSlot::Single(resolved(clip, t)),
            None => MainSlot::Empty,
        }
    }

    /// Resolve one transition at `t`, returning the junction time and slot
    /// when the instant falls inside its window.
    fn transition_at(&self, tr: &'a Transition, t: f64) -> Option<(f64, MainSlot<'a>)> {
        let (_, from) = self.timeline.find_clip(tr.from_clip)?;
        let (_, to) = self.timeline.find_clip(tr.to_clip)?;
        let junction = to.start_sec;
        if t < junction - tr.duration_sec || t >= junction + tr.duration_sec {
            return None;
        }
        let progress = transition_progress(t, junction, tr.duration_sec);
        // The outgoing clip keeps running past its own end during the blend:
        // its local time is deliberately unclamped and the decode layer holds
        // the last frame once the source is exhausted. The incoming clip is
        // clamped at its in-point during the lead-in.
        let incoming_local = to.local_time(t).max(to.trim_start_sec);
        Some((
            junction,
            MainSlot::Transition {
                outgoing: resolved(from, t),
                incoming: ResolvedClip {
                    clip: to,
                    local_sec: incoming_local,
                },
                kind: tr.kind,
                progress,
            },
        ))
    }

    fn collect_layers(&self, t: f64, kind: ClipKind) -> Vec<ResolvedClip<'a>> {
        let mut out = Vec::new();
        for track in &self.timeline.tracks {
            for clip in track.clips_at(t) {
                if clip.kind() == kind {
                    out.push(resolved(clip, t));
                }
            }
        }
        out
    }
}

fn resolved<'a>(clip: &'a Clip, t: f64) -> ResolvedClip<'a> {
    ResolvedClip {
        clip,
        local_sec: clip.local_time(t),
    }
}
