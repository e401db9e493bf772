//! Silence detection over decoded PCM.
//!
//! Drives the "remove silence" assist: the caller detects spans on a clip's
//! source audio, offsets them into timeline time and applies splits through
//! the session.

/// One detected silent span in media-local seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SilenceSpan {
    /// Span start, seconds.
    pub start_sec: f64,
    /// Span end, seconds (exclusive).
    pub end_sec: f64,
}

impl SilenceSpan {
    /// Span length in seconds.
    pub fn duration_sec(&self) -> f64 {
        self.end_sec - self.start_sec
    }
}

/// Find spans where the peak amplitude stays below `threshold`.
///
/// Spans shorter than `min_duration_sec` are discarded: brief pauses are
/// speech cadence, not dead air. A trailing silent run is reported even
/// though it has no terminating loud sample.
pub fn detect_silence(
    interleaved: &[f32],
    channels: u16,
    sample_rate: u32,
    threshold: f32,
    min_duration_sec: f64,
) -> Vec<SilenceSpan> {
    let channels = usize::from(channels.max(1));
    let rate = f64::from(sample_rate);
    let mut spans = Vec::new();
    let mut run_start: Option<usize> = None;

    let frames = interleaved.len() / channels;
    for frame in 0..frames {
        let peak = interleaved[frame * channels..(frame + 1) * channels]
            .iter()
            .fold(0.0f32, |m, s| m.max(s.abs()));
        if peak < threshold {
            run_start.get_or_insert(frame);
        } else if let Some(start) = run_start.take() {
            push_span(&mut spans, start, frame, rate, min_duration_sec);
        }
    }
    if let Some(start) = run_start {
        push_span(&mut spans, start, frames, rate, min_duration_sec);
    }
    spans
}

fn push_span(
    spans: &mut Vec<SilenceSpan>,
    start_frame: usize,
    end_frame: usize,
    rate: f64,
    min_duration_sec: f64,
) {
    let span = SilenceSpan {
        start_sec: start_frame as f64 / rate,
        end_sec: end_frame as f64 / rate,
    };
    if span.duration_sec() >= min_duration_sec {
        spans.push(span);
    }
}
