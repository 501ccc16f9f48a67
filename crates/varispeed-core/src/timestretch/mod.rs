//! Streaming pitch/tempo transforms
//!
//! A [`StreamingTransform`] sits between the [`AudioSource`] and the output
//! callback. It owns the source cursor: every `extract` pulls as many source
//! frames as it needs from the cursor onwards, advances it, and writes at most
//! `max_frames` processed frames. Zero frames out means the source is
//! exhausted.
//!
//! Two implementations are provided:
//! - [`StretchTransform`]: signalsmith-stretch, independent pitch and tempo
//! - [`PassthroughTransform`]: identity, used as a bypass and as a test stub

mod passthrough;
mod stretch;

pub use passthrough::PassthroughTransform;
pub use stretch::{StretchTransform, MAX_OUTPUT_FRAMES};

use serde::{Deserialize, Serialize};

use crate::source::AudioSource;
use crate::types::Sample;

/// Lowest accepted pitch/tempo multiplier
pub const MIN_RATE: f64 = 0.05;

/// Highest accepted pitch/tempo multiplier
pub const MAX_RATE: f64 = 2.0;

/// Clamp a pitch/tempo multiplier to the supported range
///
/// Returns `None` for NaN or infinite input so callers can keep the previous
/// value.
pub fn clamp_rate(value: f64) -> Option<f64> {
    if value.is_finite() {
        Some(value.clamp(MIN_RATE, MAX_RATE))
    } else {
        None
    }
}

/// Pull-based transform between the source and the sink
pub trait StreamingTransform: Send {
    /// Write up to `max_frames` interleaved stereo frames into `target`
    ///
    /// Returns the number of frames produced; 0 signals that the underlying
    /// source is exhausted.
    fn extract(&mut self, target: &mut [Sample], max_frames: usize) -> usize;

    /// Absolute source frame the next pull starts from
    fn cursor(&self) -> usize;

    /// Move the source read position; honoured on the next pull
    fn set_cursor(&mut self, frame: usize);

    fn pitch(&self) -> f64;

    fn set_pitch(&mut self, pitch: f64);

    fn tempo(&self) -> f64;

    fn set_tempo(&mut self, tempo: f64);

    fn source(&self) -> &AudioSource;

    fn source_mut(&mut self) -> &mut AudioSource;

    /// Processing latency in output frames
    fn latency(&self) -> usize {
        0
    }

    /// Most frames a single `extract` call will produce
    ///
    /// A short answer below this limit means the source is running out.
    fn max_block_frames(&self) -> usize {
        usize::MAX
    }
}

/// Which transform the engine runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    /// Pitch/tempo shifting via signalsmith-stretch
    #[default]
    Stretch,
    /// No processing; pitch and tempo are ignored
    Passthrough,
}

impl TransformKind {
    /// Build the transform around `source`
    pub fn build(self, source: AudioSource, sample_rate: u32) -> Box<dyn StreamingTransform> {
        match self {
            TransformKind::Stretch => Box::new(StretchTransform::new(source, sample_rate)),
            TransformKind::Passthrough => Box::new(PassthroughTransform::new(source)),
        }
    }
}
