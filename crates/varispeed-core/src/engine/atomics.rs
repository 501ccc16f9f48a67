//! Lock-free session state shared between the control and audio threads

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};

use crate::types::PlaybackAction;

/// Lock-free playback state
///
/// The control thread publishes the action, parameters and buffer metadata;
/// the audio thread publishes the cursor and reported position after every
/// pull. Neither side ever blocks on the other.
///
/// The audio thread is the only writer of the cursor and position. Values use
/// `Ordering::Relaxed` since we only need visibility; the applied sequence
/// number is the one release/acquire pair. `f64` values are stored as their
/// bit patterns.
pub struct SessionAtomics {
    /// Playback action (see [`PlaybackAction::as_u8`])
    action: AtomicU8,
    /// Absolute read position of the transform in source frames
    cursor: AtomicU64,
    /// Last frame offset requested from the audio source
    position: AtomicU64,
    /// Pitch multiplier (f64 bits)
    pitch: AtomicU64,
    /// Tempo multiplier (f64 bits)
    tempo: AtomicU64,
    /// Duration of the installed buffer in seconds (f64 bits)
    duration: AtomicU64,
    /// Sample rate of the installed buffer (equals the output rate)
    sample_rate: AtomicU32,
    /// Total frames of the installed buffer
    total_frames: AtomicU64,
    /// Sequence number of the last command the audio thread applied
    applied_seq: AtomicU64,
}

impl SessionAtomics {
    pub fn new(sample_rate: u32, pitch: f64, tempo: f64) -> Self {
        Self {
            action: AtomicU8::new(PlaybackAction::Stopped.as_u8()),
            cursor: AtomicU64::new(0),
            position: AtomicU64::new(0),
            pitch: AtomicU64::new(pitch.to_bits()),
            tempo: AtomicU64::new(tempo.to_bits()),
            duration: AtomicU64::new(0.0f64.to_bits()),
            sample_rate: AtomicU32::new(sample_rate),
            total_frames: AtomicU64::new(0),
            applied_seq: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn action(&self) -> PlaybackAction {
        PlaybackAction::from_u8(self.action.load(Ordering::Relaxed))
    }

    #[inline]
    pub(crate) fn set_action(&self, action: PlaybackAction) {
        self.action.store(action.as_u8(), Ordering::Relaxed);
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.action() == PlaybackAction::Playing
    }

    /// Current transform cursor in frames (lock-free)
    #[inline]
    pub fn cursor(&self) -> u64 {
        self.cursor.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn set_cursor(&self, frames: u64) {
        self.cursor.store(frames, Ordering::Relaxed);
    }

    /// Last reported source position in frames (lock-free)
    #[inline]
    pub fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn set_position(&self, frames: u64) {
        self.position.store(frames, Ordering::Relaxed);
    }

    #[inline]
    pub fn pitch(&self) -> f64 {
        f64::from_bits(self.pitch.load(Ordering::Relaxed))
    }

    #[inline]
    pub(crate) fn set_pitch(&self, pitch: f64) {
        self.pitch.store(pitch.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub fn tempo(&self) -> f64 {
        f64::from_bits(self.tempo.load(Ordering::Relaxed))
    }

    #[inline]
    pub(crate) fn set_tempo(&self, tempo: f64) {
        self.tempo.store(tempo.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub fn duration_seconds(&self) -> f64 {
        f64::from_bits(self.duration.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn total_frames(&self) -> u64 {
        self.total_frames.load(Ordering::Relaxed)
    }

    /// Publish metadata for a newly installed buffer
    pub(crate) fn set_buffer_info(&self, sample_rate: u32, total_frames: u64, duration: f64) {
        self.sample_rate.store(sample_rate, Ordering::Relaxed);
        self.total_frames.store(total_frames, Ordering::Relaxed);
        self.duration.store(duration.to_bits(), Ordering::Relaxed);
    }

    /// Pairs with the release in [`Self::set_applied_seq`]: once a sequence
    /// number is visible, so is the cursor its command left behind.
    #[inline]
    pub fn applied_seq(&self) -> u64 {
        self.applied_seq.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_applied_seq(&self, seq: u64) {
        self.applied_seq.store(seq, Ordering::Release);
    }
}

impl Default for SessionAtomics {
    fn default() -> Self {
        Self::new(crate::types::DEFAULT_SAMPLE_RATE, 1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let atomics = SessionAtomics::default();
        assert_eq!(atomics.action(), PlaybackAction::Stopped);
        assert_eq!(atomics.cursor(), 0);
        assert_eq!(atomics.pitch(), 1.0);
        assert_eq!(atomics.tempo(), 1.0);
        assert_eq!(atomics.duration_seconds(), 0.0);
    }

    #[test]
    fn test_float_values_roundtrip_through_bits() {
        let atomics = SessionAtomics::new(48000, 0.8, 1.25);
        assert_eq!(atomics.pitch(), 0.8);
        assert_eq!(atomics.tempo(), 1.25);

        atomics.set_buffer_info(48000, 96000, 2.0);
        assert_eq!(atomics.total_frames(), 96000);
        assert_eq!(atomics.duration_seconds(), 2.0);
    }
}
