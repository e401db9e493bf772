use crate::model::{Timeline, TrackId};

/// On-screen snap threshold in pixels, converted to seconds through the
/// current zoom before matching.
pub const SNAP_THRESHOLD_PX: f64 = 8.0;

/// Where a snap candidate came from, for guideline rendering.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SnapSource {
    /// Start of the timeline (`t = 0`).
    TimelineStart,
    /// Current playhead position.
    Playhead,
    /// A clip boundary (start or end) on another track.
    ClipEdge,
}

/// A candidate alignment point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SnapCandidate {
    /// Candidate time in seconds.
    pub time_sec: f64,
    /// Candidate origin.
    pub source: SnapSource,
}

/// Result of snapping a single time value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SnapResult {
    /// Quantized time (the input when no candidate matched).
    pub time_sec: f64,
    /// Whether a candidate was applied.
    pub snapped: bool,
    /// The winning candidate, for drawing the snap guideline.
    pub candidate: Option<SnapCandidate>,
}

/// Computes candidate alignment points and quantizes drag/trim times
/// against them.
#[derive(Clone, Debug)]
pub struct SnapEngine {
    candidates: Vec<SnapCandidate>,
}

impl SnapEngine {
    /// Collect candidates: every clip boundary on every track except
    /// `dragged_track`, plus the playhead and time zero.
    pub fn for_drag(timeline: &Timeline, dragged_track: Option<TrackId>, playhead_sec: f64) -> Self {
        let mut candidates = vec![SnapCandidate {
            time_sec: 0.0,
            source: SnapSource::TimelineStart,
        }];
        candidates.push(SnapCandidate {
            time_sec: playhead_sec,
            source: SnapSource::Playhead,
        });

        for track in &timeline.tracks {
            if Some(track.id) == dragged_track {
                continue;
            }
            for clip in &track.clips {
                candidates.push(SnapCandidate {
                    time_sec: clip.start_sec,
                    source: SnapSource::ClipEdge,
                });
                candidates.push(SnapCandidate {
                    time_sec: clip.end_sec(),
                    source: SnapSource::ClipEdge,
                });
            }
        }

        Self { candidates }
    }

    /// Snap one time value (trim handles).
    ///
    /// `px_per_sec` is the current zoom; the 8 px screen threshold becomes a
    /// time threshold through it. Returns the nearest candidate within the
    /// threshold, or the input unchanged.
    pub fn snap_time(&self, proposed_sec: f64, px_per_sec: f64) -> SnapResult {
        let threshold = Self::threshold_sec(px_per_sec);
        match self.nearest(proposed_sec, threshold) {
            Some(c) => SnapResult {
                time_sec: c.time_sec,
                snapped: true,
                candidate: Some(c),
            },
            None => SnapResult {
                time_sec: proposed_sec,
                snapped: false,
                candidate: None,
            },
        }
    }

    /// Snap a clip move: test the proposed start *and* the resulting end
    /// against the same candidate set and apply whichever correction is
    /// smaller. The returned time is always the corrected clip start.
    pub fn snap_clip_move(
        &self,
        proposed_start_sec: f64,
        clip_duration_sec: f64,
        px_per_sec: f64,
    ) -> SnapResult {
        let threshold = Self::threshold_sec(px_per_sec);
        let start_hit = self.nearest(proposed_start_sec, threshold);
        let end_hit = self.nearest(proposed_start_sec + clip_duration_sec, threshold);

        let start_err = start_hit.map(|c| (c.time_sec - proposed_start_sec).abs());
        let end_err =
            end_hit.map(|c| (c.time_sec - (proposed_start_sec + clip_duration_sec)).abs());

        match (start_hit, end_hit) {
            (None, None) => SnapResult {
                time_sec: proposed_start_sec,
                snapped: false,
                candidate: None,
            },
            (Some(c), None) => SnapResult {
                time_sec: c.time_sec,
                snapped: true,
                candidate: Some(c),
            },
            (None, Some(c)) => SnapResult {
                time_sec: c.time_sec - clip_duration_sec,
                snapped: true,
                candidate: Some(c),
            },
            (Some(s), Some(e)) => {
                if start_err.unwrap_or(f64::MAX) <= end_err.unwrap_or(f64::MAX) {
                    SnapResult {
                        time_sec: s.time_sec,
                        snapped: true,
                        candidate: Some(s),
                    }
                } else {
                    SnapResult {
                        time_sec: e.time_sec - clip_duration_sec,
                        snapped: true,
                        candidate: Some(e),
                    }
                }
            }
        }
    }

    fn threshold_sec(px_per_sec: f64) -> f64 {
        if px_per_sec <= 0.0 {
            return 0.0;
        }
        SNAP_THRESHOLD_PX / px_per_sec
    }

    fn nearest(&self, t: f64, threshold_sec: f64) -> Option<SnapCandidate> {
        if threshold_sec <= 0.0 {
            return None;
        }
        self.candidates
            .iter()
            .copied()
            .filter(|c| (c.time_sec - t).abs() <= threshold_sec)
            .min_by(|a, b| {
                (a.time_sec - t)
                    .abs()
                    .total_cmp(&(b.time_sec - t).abs())
            })
    }
}
