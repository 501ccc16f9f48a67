//! Decoded PCM buffers and the decode operation
//!
//! Every buffer in the engine is two-channel float PCM. Decoders turn raw
//! file bytes into a [`DecodedBuffer`]; the loader then resamples it to the
//! output clock's rate so frame offsets and wall-clock seconds agree.

mod resample;
mod probe;

pub use self::resample::resample_to;
pub use self::probe::SymphoniaDecoder;

use thiserror::Error;

use crate::types::{Sample, CHANNELS};

/// A decode failure, surfaced to the control surface as `{kind, message}`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}: {message}", DecodeError::KIND)]
pub struct DecodeError {
    /// Human-readable reason reported by the decoder
    pub message: String,
}

impl DecodeError {
    /// Error type label reported alongside the message
    pub const KIND: &'static str = "Decoding error";

    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        Self::KIND
    }
}

/// Immutable decoded stereo audio
///
/// Created once by a [`Decoder`], then owned by the audio source until a new
/// buffer replaces it.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBuffer {
    sample_rate: u32,
    left: Vec<Sample>,
    right: Vec<Sample>,
}

impl DecodedBuffer {
    /// Create a buffer from separate left and right channel arrays
    pub fn from_channels(sample_rate: u32, left: Vec<Sample>, right: Vec<Sample>) -> Self {
        assert_eq!(left.len(), right.len(), "Channel lengths must match");
        Self {
            sample_rate,
            left,
            right,
        }
    }

    /// Create a buffer from interleaved samples with any channel count
    ///
    /// Mono is duplicated to both channels; anything wider keeps the first two.
    pub fn from_interleaved(sample_rate: u32, channels: usize, interleaved: &[Sample]) -> Self {
        let channels = channels.max(1);
        let frames = interleaved.len() / channels;
        let mut left = Vec::with_capacity(frames);
        let mut right = Vec::with_capacity(frames);

        for frame in interleaved.chunks_exact(channels) {
            left.push(frame[0]);
            right.push(if channels > 1 { frame[1] } else { frame[0] });
        }

        Self {
            sample_rate,
            left,
            right,
        }
    }

    /// Create a silent buffer (mostly useful in tests)
    pub fn silence(sample_rate: u32, frames: usize) -> Self {
        Self::from_channels(sample_rate, vec![0.0; frames], vec![0.0; frames])
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Always 2
    #[inline]
    pub fn channel_count(&self) -> usize {
        CHANNELS
    }

    /// Total frame count
    #[inline]
    pub fn frames(&self) -> usize {
        self.left.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    #[inline]
    pub fn left(&self) -> &[Sample] {
        &self.left
    }

    #[inline]
    pub fn right(&self) -> &[Sample] {
        &self.right
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }
}

/// The external decode operation: raw bytes in, stereo PCM (or a failure) out
///
/// `hint` is an optional file extension used to speed up format probing.
pub trait Decoder: Send {
    fn decode(&self, bytes: &[u8], hint: Option<&str>) -> Result<DecodedBuffer, DecodeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_is_duplicated() {
        let buffer = DecodedBuffer::from_interleaved(48000, 1, &[0.1, 0.2, 0.3]);
        assert_eq!(buffer.frames(), 3);
        assert_eq!(buffer.left(), buffer.right());
    }

    #[test]
    fn test_extra_channels_are_dropped() {
        let buffer = DecodedBuffer::from_interleaved(48000, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(buffer.left(), &[1.0, 4.0]);
        assert_eq!(buffer.right(), &[2.0, 5.0]);
    }

    #[test]
    fn test_duration() {
        let buffer = DecodedBuffer::silence(44100, 441000);
        assert!((buffer.duration_seconds() - 10.0).abs() < 1e-9);
        assert_eq!(buffer.channel_count(), 2);
    }

    #[test]
    fn test_error_display_carries_kind() {
        let err = DecodeError::new("bad header");
        assert_eq!(err.kind(), "Decoding error");
        assert_eq!(err.to_string(), "Decoding error: bad header");
    }
}
