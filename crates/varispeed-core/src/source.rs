//! Pull source over a decoded buffer
//!
//! [`AudioSource`] presents the installed [`DecodedBuffer`] as a random-access
//! pull source: the transform asks for `n` frames at an absolute offset and
//! gets back how many it can have. Every pull republishes the requested offset
//! so progress becomes visible outside the real-time path.

use std::sync::Arc;

use basedrop::Shared;

use crate::decode::DecodedBuffer;
use crate::engine::SessionAtomics;
use crate::types::{Sample, CHANNELS};

/// Random-access stereo source addressed by absolute frame offset
pub struct AudioSource {
    /// Installed buffer; `Shared` so a swap on the audio thread defers the free
    buffer: Option<Shared<DecodedBuffer>>,
    /// Session state the source reports its read position into (not owned)
    atomics: Arc<SessionAtomics>,
}

impl AudioSource {
    /// Create an empty source reporting into `atomics`
    pub fn new(atomics: Arc<SessionAtomics>) -> Self {
        Self {
            buffer: None,
            atomics,
        }
    }

    /// Create a source with a buffer already installed
    pub fn with_buffer(buffer: Shared<DecodedBuffer>, atomics: Arc<SessionAtomics>) -> Self {
        Self {
            buffer: Some(buffer),
            atomics,
        }
    }

    /// Replace the installed buffer, returning the previous one
    ///
    /// Dropping the returned `Shared` on the audio thread is RT-safe: the
    /// deallocation happens on the collector thread.
    pub fn replace_buffer(&mut self, buffer: Shared<DecodedBuffer>) -> Option<Shared<DecodedBuffer>> {
        self.buffer.replace(buffer)
    }

    #[inline]
    pub fn has_buffer(&self) -> bool {
        self.buffer.is_some()
    }

    /// Total frames in the installed buffer (0 when empty)
    #[inline]
    pub fn total_frames(&self) -> usize {
        self.buffer.as_ref().map_or(0, |b| b.frames())
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.buffer
            .as_ref()
            .map_or_else(|| self.atomics.sample_rate(), |b| b.sample_rate())
    }

    /// Copy up to `num_frames` interleaved stereo frames starting at `position`
    ///
    /// Returns `min(num_frames, total_frames - position)`, or 0 once `position`
    /// reaches the end of the buffer. Only the returned number of frames is
    /// written; the rest of `target` is left as it was. `num_frames` is further
    /// limited by what `target` can hold.
    pub fn extract(&self, target: &mut [Sample], num_frames: usize, position: usize) -> usize {
        self.atomics.set_position(position as u64);

        let Some(buffer) = self.buffer.as_ref() else {
            return 0;
        };

        let total = buffer.frames();
        if position >= total {
            return 0;
        }

        let frames = num_frames.min(total - position).min(target.len() / CHANNELS);
        let left = &buffer.left()[position..position + frames];
        let right = &buffer.right()[position..position + frames];

        for (i, frame) in target.chunks_exact_mut(CHANNELS).take(frames).enumerate() {
            frame[0] = left[i];
            frame[1] = right[i];
        }

        frames
    }
}
