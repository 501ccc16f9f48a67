//! Common types for Varispeed
//!
//! Fundamental audio types shared by the source, transform and output stages:
//! stereo samples, the reusable frame batch, and the playback action enum.

use std::ops::{Index, IndexMut};

/// Default sample rate when the output device doesn't dictate one
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Channel count of every buffer in the pipeline (stereo)
pub const CHANNELS: usize = 2;

/// Audio sample type (32-bit float throughout the pipeline)
pub type Sample = f32;

/// A single stereo sample (left and right channels)
///
/// Uses `#[repr(C)]` to ensure predictable memory layout: [left, right].
/// This enables zero-copy conversion between `&[StereoSample]` and `&[f32]`
/// (interleaved format) using bytemuck.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StereoSample {
    pub left: Sample,
    pub right: Sample,
}

impl StereoSample {
    /// Create a new stereo sample
    #[inline]
    pub fn new(left: Sample, right: Sample) -> Self {
        Self { left, right }
    }

    /// Create a silent stereo sample
    #[inline]
    pub fn silence() -> Self {
        Self::default()
    }
}

/// A buffer of stereo samples
///
/// Pre-allocated once and reused; the working length can be changed with
/// [`StereoBuffer::set_len_from_capacity`] without touching the allocator.
#[derive(Debug, Clone, Default)]
pub struct StereoBuffer {
    samples: Vec<StereoSample>,
}

/// Fixed-capacity interleaved batch reused across output callbacks
pub type FrameBatch = StereoBuffer;

impl StereoBuffer {
    /// Create a buffer filled with silence
    pub fn silence(len: usize) -> Self {
        Self {
            samples: vec![StereoSample::silence(); len],
        }
    }

    /// Create a buffer from interleaved samples [L, R, L, R, ...]
    pub fn from_interleaved(interleaved: &[Sample]) -> Self {
        assert!(interleaved.len() % 2 == 0, "Interleaved buffer must have even length");
        let samples = interleaved
            .chunks_exact(2)
            .map(|chunk| StereoSample::new(chunk[0], chunk[1]))
            .collect();
        Self { samples }
    }

    /// Number of stereo frames in the buffer
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Allocated capacity in frames
    #[inline]
    pub fn capacity(&self) -> usize {
        self.samples.capacity()
    }

    /// Set the working length of a pre-allocated buffer (real-time safe)
    ///
    /// Fills any newly exposed elements with silence. Never grows past the
    /// existing capacity in debug builds.
    #[inline]
    pub fn set_len_from_capacity(&mut self, new_len: usize) {
        let current_len = self.samples.len();
        if new_len > current_len {
            debug_assert!(
                new_len <= self.samples.capacity(),
                "set_len_from_capacity called with len > capacity"
            );
            self.samples.resize(new_len, StereoSample::silence());
        } else {
            self.samples.truncate(new_len);
        }
    }

    /// Fill the buffer with silence
    pub fn fill_silence(&mut self) {
        self.samples.fill(StereoSample::silence());
    }

    #[inline]
    pub fn as_slice(&self) -> &[StereoSample] {
        &self.samples
    }

    /// Zero-copy view of samples as interleaved f32 [L, R, L, R, ...]
    #[inline]
    pub fn as_interleaved(&self) -> &[Sample] {
        bytemuck::cast_slice(&self.samples)
    }

    /// Zero-copy mutable view of samples as interleaved f32 [L, R, L, R, ...]
    #[inline]
    pub fn as_interleaved_mut(&mut self) -> &mut [Sample] {
        bytemuck::cast_slice_mut(&mut self.samples)
    }

    /// De-interleave the first `frames` samples into separate channel buffers
    pub fn to_channels(&self, frames: usize, left: &mut [Sample], right: &mut [Sample]) {
        let frames = frames.min(self.samples.len()).min(left.len()).min(right.len());
        for (i, sample) in self.samples[..frames].iter().enumerate() {
            left[i] = sample.left;
            right[i] = sample.right;
        }
    }
}

impl Index<usize> for StereoBuffer {
    type Output = StereoSample;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.samples[index]
    }
}

impl IndexMut<usize> for StereoBuffer {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.samples[index]
    }
}

/// Playback action of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackAction {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl PlaybackAction {
    /// Encoding used by the lock-free session atomics
    #[inline]
    pub fn as_u8(self) -> u8 {
        match self {
            PlaybackAction::Stopped => 0,
            PlaybackAction::Playing => 1,
            PlaybackAction::Paused => 2,
        }
    }

    /// Decode from the atomic representation (unknown values read as stopped)
    #[inline]
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => PlaybackAction::Playing,
            2 => PlaybackAction::Paused,
            _ => PlaybackAction::Stopped,
        }
    }

    /// Short name for display
    pub fn name(&self) -> &'static str {
        match self {
            PlaybackAction::Stopped => "stop",
            PlaybackAction::Playing => "play",
            PlaybackAction::Paused => "pause",
        }
    }
}

impl std::fmt::Display for PlaybackAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stereo_buffer_from_interleaved() {
        let interleaved = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let buffer = StereoBuffer::from_interleaved(&interleaved);

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer[0].left, 1.0);
        assert_eq!(buffer[0].right, 2.0);
        assert_eq!(buffer[2].left, 5.0);
        assert_eq!(buffer[2].right, 6.0);
    }

    #[test]
    fn test_interleaved_view_matches_layout() {
        let mut buffer = StereoBuffer::silence(2);
        buffer.as_interleaved_mut().copy_from_slice(&[0.1, 0.2, 0.3, 0.4]);

        assert_eq!(buffer[1], StereoSample::new(0.3, 0.4));
        assert_eq!(buffer.as_interleaved().len(), 4);
    }

    #[test]
    fn test_to_channels_partial() {
        let buffer = StereoBuffer::from_interleaved(&[1.0, -1.0, 2.0, -2.0, 3.0, -3.0]);
        let mut left = [9.0; 4];
        let mut right = [9.0; 4];
        buffer.to_channels(2, &mut left, &mut right);

        assert_eq!(left, [1.0, 2.0, 9.0, 9.0]);
        assert_eq!(right, [-1.0, -2.0, 9.0, 9.0]);
    }

    #[test]
    fn test_set_len_keeps_capacity() {
        let mut buffer = StereoBuffer::silence(64);
        buffer.set_len_from_capacity(16);
        assert_eq!(buffer.len(), 16);
        buffer.set_len_from_capacity(64);
        assert_eq!(buffer.len(), 64);
        assert!(buffer.capacity() >= 64);
    }

    #[test]
    fn test_action_roundtrip_encoding() {
        for action in [PlaybackAction::Stopped, PlaybackAction::Playing, PlaybackAction::Paused] {
            assert_eq!(PlaybackAction::from_u8(action.as_u8()), action);
        }
        assert_eq!(PlaybackAction::from_u8(200), PlaybackAction::Stopped);
    }
}
