//! Identity transform

use crate::source::AudioSource;
use crate::types::Sample;

use super::{clamp_rate, StreamingTransform};

/// Copies source frames straight through
///
/// Pitch and tempo are stored (so the controller's mirror stays consistent)
/// but never applied. Output is bit-identical to the source.
pub struct PassthroughTransform {
    source: AudioSource,
    cursor: usize,
    pitch: f64,
    tempo: f64,
}

impl PassthroughTransform {
    pub fn new(source: AudioSource) -> Self {
        Self {
            source,
            cursor: 0,
            pitch: 1.0,
            tempo: 1.0,
        }
    }
}

impl StreamingTransform for PassthroughTransform {
    fn extract(&mut self, target: &mut [Sample], max_frames: usize) -> usize {
        let frames = self.source.extract(target, max_frames, self.cursor);
        self.cursor += frames;
        frames
    }

    fn cursor(&self) -> usize {
        self.cursor
    }

    fn set_cursor(&mut self, frame: usize) {
        self.cursor = frame;
    }

    fn pitch(&self) -> f64 {
        self.pitch
    }

    fn set_pitch(&mut self, pitch: f64) {
        if let Some(pitch) = clamp_rate(pitch) {
            self.pitch = pitch;
        }
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::gc::gc_handle;
    use crate::engine::SessionAtomics;
    use crate::source::tests::ramp_buffer;
    use basedrop::Shared;
    use std::sync::Arc;

    fn passthrough(frames: usize) -> PassthroughTransform {
        let atomics = Arc::new(SessionAtomics::default());
        let buffer = Shared::new(&gc_handle(), ramp_buffer(44100, frames));
        PassthroughTransform::new(AudioSource::with_buffer(buffer, atomics))
    }

    #[test]
    fn test_identity_reproduces_source() {
        let mut transform = passthrough(10_000);
        let mut target = vec![0.0; 256 * 2];
        let mut expected_frame = 0;

        loop {
            let frames = transform.extract(&mut target, 256);
            if frames == 0 {
                break;
            }
            for i in 0..frames {
                assert_eq!(target[i * 2], (expected_frame + i) as f32);
                assert_eq!(target[i * 2 + 1], -((expected_frame + i) as f32));
            }
            expected_frame += frames;
        }

        assert_eq!(expected_frame, 10_000);
        assert_eq!(transform.cursor(), 10_000);
    }

    #[test]
    fn test_set_cursor_moves_next_pull() {
        let mut transform = passthrough(1000);
        let mut target = vec![0.0; 16 * 2];

        transform.set_cursor(500);
        assert_eq!(transform.extract(&mut target, 16), 16);
        assert_eq!(target[0], 500.0);
        assert_eq!(transform.cursor(), 516);
    }

    #[test]
    fn test_parameters_are_clamped_not_applied() {
        let mut transform = passthrough(100);
        transform.set_pitch(5.0);
        transform.set_tempo(f64::NAN);
        assert_eq!(transform.pitch(), 2.0);
        assert_eq!(transform.tempo(), 1.0);

        let mut target = vec![0.0; 8 * 2];
        assert_eq!(transform.extract(&mut target, 8), 8);
        assert_eq!(target[14], 7.0);
    }
}
