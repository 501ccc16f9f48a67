//! Time-stretching via signalsmith-stretch
//!
//! Tempo is expressed through buffer sizes: to produce `n` output frames at
//! tempo `t` the transform pulls `round(n * t)` frames from the source and lets
//! signalsmith-stretch squeeze or expand them into `n`. Pitch is an independent
//! transpose factor.

use signalsmith_stretch::Stretch;

use crate::source::AudioSource;
use crate::types::{Sample, CHANNELS};

use super::{clamp_rate, StreamingTransform, MAX_RATE};

/// Number of channels handed to the stretcher
const STRETCH_CHANNELS: u32 = CHANNELS as u32;

/// Largest output block produced per `extract` call (frames)
///
/// Larger requests are answered with this many frames; callers loop.
pub const MAX_OUTPUT_FRAMES: usize = 8192;

/// Pitch/tempo transform backed by signalsmith-stretch
pub struct StretchTransform {
    /// The underlying signalsmith stretcher
    stretcher: Stretch,
    source: AudioSource,
    /// Absolute source frame of the next pull
    cursor: usize,
    pitch: f64,
    tempo: f64,
    /// Pre-allocated interleaved input scratch (sized for MAX_RATE)
    input: Vec<Sample>,
    /// Latency tail already emitted after the source ran dry
    flushed: bool,
}

impl StretchTransform {
    pub fn new(source: AudioSource, sample_rate: u32) -> Self {
        let max_input_frames = (MAX_OUTPUT_FRAMES as f64 * MAX_RATE).ceil() as usize;

        Self {
            stretcher: Stretch::preset_default(STRETCH_CHANNELS, sample_rate),
            source,
            cursor: 0,
            pitch: 1.0,
            tempo: 1.0,
            input: vec![0.0; max_input_frames * CHANNELS],
            flushed: false,
        }
    }

    /// Convert a pitch multiplier to semitones (1.0 -> 0, 2.0 -> +12)
    pub fn semitones(pitch: f64) -> f64 {
        12.0 * pitch.log2()
    }

    pub fn input_latency(&self) -> usize {
        self.stretcher.input_latency()
    }

    pub fn output_latency(&self) -> usize {
        self.stretcher.output_latency()
    }

    /// Drop everything buffered inside the stretcher
    fn reset(&mut self) {
        self.stretcher.reset();
        self.flushed = false;
    }
}

impl StreamingTransform for StretchTransform {
    fn extract(&mut self, target: &mut [Sample], max_frames: usize) -> usize {
        let out_frames = max_frames.min(target.len() / CHANNELS).min(MAX_OUTPUT_FRAMES);
        if out_frames == 0 {
            return 0;
        }

        let wanted = ((out_frames as f64 * self.tempo).round() as usize).max(1);
        let input = &mut self.input[..wanted * CHANNELS];
        let got = self.source.extract(input, wanted, self.cursor);
        self.cursor += got;

        let output = &mut target[..out_frames * CHANNELS];

        if got == 0 {
            // Source is dry: emit whatever is still inside the stretcher, once
            if self.flushed {
                return 0;
            }
            self.flushed = true;

            let tail = self.stretcher.output_latency().min(out_frames);
            if tail == 0 {
                return 0;
            }
            output[..tail * CHANNELS].fill(0.0);
            self.stretcher.flush(&mut output[..tail * CHANNELS]);
            return tail;
        }

        // A short read at the end of the buffer yields proportionally less output
        let produced = if got == wanted {
            out_frames
        } else {
            ((got as f64 / self.tempo).round() as usize).clamp(1, out_frames)
        };

        output[..produced * CHANNELS].fill(0.0);
        self.stretcher.process(
            &input[..got * CHANNELS],
            &mut output[..produced * CHANNELS],
        );

        produced
    }

    fn cursor(&self) -> usize {
        self.cursor
    }

    /// Seeking flushes the stretcher so no pre-seek audio leaks out
    fn set_cursor(&mut self, frame: usize) {
        self.cursor = frame;
        self.reset();
    }

    fn pitch(&self) -> f64 {
        self.pitch
    }

    fn set_pitch(&mut self, pitch: f64) {
        let Some(pitch) = clamp_rate(pitch) else {
            return;
        };
        self.pitch = pitch;
        self.stretcher
            .set_transpose_factor_semitones(Self::semitones(pitch) as f32, None);
    }

    fn tempo(&self) -> f64 {
        self.tempo
    }

    fn set_tempo(&mut self, tempo: f64) {
        if let Some(tempo) = clamp_rate(tempo) {
            self.tempo = tempo;
        }
    }

    fn source(&self) -> &AudioSource {
        &self.source
    }

    fn source_mut(&mut self) -> &mut AudioSource {
        &mut self.source
    }

    fn latency(&self) -> usize {
        self.input_latency() + self.output_latency()
    }

    fn max_block_frames(&self) -> usize {
        MAX_OUTPUT_FRAMES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::gc::gc_handle;
    use crate::engine::SessionAtomics;
    use crate::source::tests::ramp_buffer;
    use basedrop::Shared;
    use std::sync::Arc;

    fn stretch(frames: usize) -> StretchTransform {
        let atomics = Arc::new(SessionAtomics::default());
        let buffer = Shared::new(&gc_handle(), ramp_buffer(44100, frames));
        StretchTransform::new(AudioSource::with_buffer(buffer, atomics), 44100)
    }

    #[test]
    fn test_stretch_creation() {
        let transform = stretch(1000);
        assert_eq!(transform.pitch(), 1.0);
        assert_eq!(transform.tempo(), 1.0);
        assert!(transform.input_latency() > 0);
        assert!(transform.output_latency() > 0);
        assert_eq!(transform.latency(), transform.input_latency() + transform.output_latency());
    }

    #[test]
    fn test_semitone_conversion() {
        assert!(StretchTransform::semitones(1.0).abs() < 1e-12);
        assert!((StretchTransform::semitones(2.0) - 12.0).abs() < 1e-12);
        assert!((StretchTransform::semitones(0.5) + 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_tempo_controls_source_consumption() {
        let mut target = vec![0.0; 1024 * 2];

        let mut fast = stretch(100_000);
        fast.set_tempo(2.0);
        assert_eq!(fast.extract(&mut target, 1024), 1024);
        assert_eq!(fast.cursor(), 2048);

        let mut slow = stretch(100_000);
        slow.set_tempo(0.5);
        assert_eq!(slow.extract(&mut target, 1024), 1024);
        assert_eq!(slow.cursor(), 512);
    }

    #[test]
    fn test_runs_dry_after_tail() {
        let mut transform = stretch(3000);
        let mut target = vec![0.0; 1024 * 2];
        let mut calls = 0;

        while transform.extract(&mut target, 1024) > 0 {
            calls += 1;
            assert!(calls < 100, "transform never reported exhaustion");
        }

        assert_eq!(transform.cursor(), 3000);
        // Stays exhausted
        assert_eq!(transform.extract(&mut target, 1024), 0);
    }

    #[test]
    fn test_seek_rearms_after_exhaustion() {
        let mut transform = stretch(2048);
        let mut target = vec![0.0; 1024 * 2];
        while transform.extract(&mut target, 1024) > 0 {}

        transform.set_cursor(1024);
        assert_eq!(transform.extract(&mut target, 512), 512);
        assert_eq!(transform.cursor(), 1536);
    }

    #[test]
    fn test_partial_read_scales_output() {
        let mut transform = stretch(1500);
        let mut target = vec![0.0; 1024 * 2];

        assert_eq!(transform.extract(&mut target, 1024), 1024);
        // 476 frames left at tempo 1.0
        assert_eq!(transform.extract(&mut target, 1024), 476);
    }

    #[test]
    fn test_oversized_request_is_capped() {
        let mut transform = stretch(100_000);
        let mut target = vec![0.0; (MAX_OUTPUT_FRAMES + 100) * 2];
        assert_eq!(transform.extract(&mut target, MAX_OUTPUT_FRAMES + 100), MAX_OUTPUT_FRAMES);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut transform = stretch(100);
        transform.set_pitch(0.8);
        assert_eq!(transform.pitch(), 0.8);
        transform.set_pitch(0.0);
        assert_eq!(transform.pitch(), 0.05);
        transform.set_pitch(f64::NAN);
        assert_eq!(transform.pitch(), 0.05);
    }
}
