//! Preview playback clock.
//!
//! During playback the decoded media runs on its own clock, and forcing a
//! discrete seek every tick to keep the timeline aligned with it causes
//! visible stutter. Instead the clock nudges its playback rate a few percent
//! around 1x so the timeline position converges onto the observed media time
//! over a handful of ticks. Only gross drift triggers a hard jump.

/// Drift below this is treated as in-sync and leaves the rate at 1x.
const DRIFT_DEADBAND_SEC: f64 = 1.0 / 120.0;

/// Drift at or beyond this gives up on nudging and jumps outright.
const HARD_SEEK_DRIFT_SEC: f64 = 0.25;

/// Proportional gain from observed drift to rate offset.
const RATE_GAIN: f64 = 0.5;

/// The rate never leaves `1 ± MAX_RATE_OFFSET` while nudging.
const MAX_RATE_OFFSET: f64 = 0.05;

/// Wall-time-driven timeline clock with drift convergence against an
/// external media clock.
#[derive(Clone, Debug)]
pub struct PlaybackClock {
    position_sec: f64,
    rate: f64,
    playing: bool,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackClock {
    /// New paused clock at time zero.
    pub fn new() -> Self {
        Self {
            position_sec: 0.0,
            rate: 1.0,
            playing: false,
        }
    }

    /// Current timeline position in seconds.
    pub fn position_sec(&self) -> f64 {
        self.position_sec
    }

    /// Current playback rate. 1.0 outside of drift correction.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Whether the clock advances on [`Self::advance`].
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Start advancing.
    pub fn play(&mut self) {
        self.playing = true;
    }

    /// Stop advancing; the position stays put.
    pub fn pause(&mut self) {
        self.playing = false;
        self.rate = 1.0;
    }

    /// Jump to an absolute position (scrub). Resets drift correction.
    pub fn seek(&mut self, t_sec: f64) {
        self.position_sec = t_sec.max(0.0);
        self.rate = 1.0;
    }

    /// Advance by `dt_sec` of wall time at the current rate. No-op while
    /// paused.
    pub fn advance(&mut self, dt_sec: f64) {
        if self.playing && dt_sec > 0.0 {
            self.position_sec += dt_sec * self.rate;
        }
    }

    /// Report where the decoded media actually is. Small drift nudges the
    /// rate toward the media clock; gross drift jumps.
    pub fn sync_to_media(&mut self, media_sec: f64) {
        if !self.playing {
            return;
        }
        let drift = media_sec - self.position_sec;
        if drift.abs() >= HARD_SEEK_DRIFT_SEC {
            tracing::debug!(drift, "playback drift too large, jumping");
            self.position_sec = media_sec;
            self.rate = 1.0;
        } else if drift.abs() <= DRIFT_DEADBAND_SEC {
            self.rate = 1.0;
        } else {
            self.rate = 1.0 + (drift * RATE_GAIN).clamp(-MAX_RATE_OFFSET, MAX_RATE_OFFSET);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paused_clock_does_not_advance() {
        let mut clock = PlaybackClock::new();
        clock.advance(1.0);
        assert_eq!(clock.position_sec(), 0.0);
        clock.play();
        clock.advance(0.5);
        assert!((clock.position_sec() - 0.5).abs() < 1e-12);
        clock.pause();
        clock.advance(0.5);
        assert!((clock.position_sec() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn small_drift_converges_by_rate_nudging() {
        let mut clock = PlaybackClock::new();
        clock.play();

        // Media clock runs uniformly but starts 0.1s ahead of the timeline.
        let mut media = 0.1f64;
        let dt = 1.0 / 60.0;
        for _ in 0..600 {
            clock.sync_to_media(media);
            assert!(clock.rate() >= 1.0 - MAX_RATE_OFFSET);
            assert!(clock.rate() <= 1.0 + MAX_RATE_OFFSET);
            clock.advance(dt);
            media += dt;
        }
        assert!((media - clock.position_sec()).abs() <= DRIFT_DEADBAND_SEC * 2.0);
    }

    #[test]
    fn gross_drift_jumps_instead_of_nudging() {
        let mut clock = PlaybackClock::new();
        clock.play();
        clock.advance(1.0);
        clock.sync_to_media(5.0);
        assert_eq!(clock.position_sec(), 5.0);
        assert_eq!(clock.rate(), 1.0);
    }

    #[test]
    fn seek_resets_correction() {
        let mut clock = PlaybackClock::new();
        clock.play();
        clock.sync_to_media(0.1);
        assert!(clock.rate() > 1.0);
        clock.seek(2.0);
        assert_eq!(clock.position_sec(), 2.0);
        assert_eq!(clock.rate(), 1.0);
    }
}
