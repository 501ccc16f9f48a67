//! Progress reporting derived from the published read position

use std::sync::Arc;

use super::SessionAtomics;

/// Percentage of the buffer played, 0 when the duration is unknown
pub fn percent_done(current_seconds: f64, duration_seconds: f64) -> f64 {
    if duration_seconds > 0.0 {
        current_seconds / duration_seconds * 100.0
    } else {
        0.0
    }
}

/// Converts a percentage to an absolute frame offset clamped to `[0, total_frames]`
pub fn percent_to_frame(percent: f64, duration_seconds: f64, sample_rate: u32, total_frames: usize) -> usize {
    let percent = if percent.is_finite() { percent.clamp(0.0, 100.0) } else { 0.0 };
    let frame = (percent / 100.0 * duration_seconds * sample_rate as f64).round();
    (frame.max(0.0) as usize).min(total_frames)
}

/// Read-only view of playback progress
///
/// Reads the position the audio source last reported. Display only: the
/// transform cursor stays authoritative for playback.
///
/// A tracker taken from the controller while a stop or seek is still queued
/// reports that command's target instead.
#[derive(Clone)]
pub struct PositionTracker {
    atomics: Arc<SessionAtomics>,
    pending: Option<u64>,
}

impl PositionTracker {
    pub fn new(atomics: Arc<SessionAtomics>) -> Self {
        Self::with_pending(atomics, None)
    }

    pub(crate) fn with_pending(atomics: Arc<SessionAtomics>, pending: Option<u64>) -> Self {
        Self { atomics, pending }
    }

    /// Last reported source position in frames
    pub fn position_frames(&self) -> u64 {
        self.pending.unwrap_or_else(|| self.atomics.position())
    }

    pub fn current_seconds(&self) -> f64 {
        let sample_rate = self.atomics.sample_rate();
        if sample_rate == 0 {
            return 0.0;
        }
        self.position_frames() as f64 / sample_rate as f64
    }

    pub fn duration_seconds(&self) -> f64 {
        self.atomics.duration_seconds()
    }

    pub fn percent_done(&self) -> f64 {
        percent_done(self.current_seconds(), self.duration_seconds())
    }
}
