//! Playback engine: controller, real-time adapter and the queues between them
//!
//! A session is split in two halves that never share a lock:
//! - [`PlaybackController`] lives on the control thread and owns the state machine
//! - [`OutputCallbackAdapter`] is moved into the audio callback
//!
//! Commands flow control → audio over an rtrb ring, end-of-stream flows back
//! over a second ring, and everything the UI displays is read from
//! [`SessionAtomics`].

mod adapter;
mod atomics;
mod command;
mod controller;
mod event;
pub mod gc;
mod position;

pub use adapter::OutputCallbackAdapter;
pub use atomics::SessionAtomics;
pub use command::{
    command_channel, event_channel, CommandSender, EngineCommand, EngineEvent, SequencedCommand,
    COMMAND_QUEUE_CAPACITY, EVENT_QUEUE_CAPACITY,
};
pub use controller::{PlaybackController, STATUS_DONE, STATUS_PLAYING, STATUS_READING};
pub use event::{LoadFailure, PlaybackEvent};
pub use position::{percent_done, percent_to_frame, PositionTracker};

use std::sync::Arc;

use thiserror::Error;

use crate::config::EngineConfig;
use crate::decode::Decoder;
use crate::loader::BufferLoader;
use crate::source::AudioSource;
use crate::timestretch::clamp_rate;

/// Errors that can occur while setting up a session
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to spawn loader thread: {0}")]
    LoaderSpawn(#[from] std::io::Error),
}

/// Build a session for an output clock running at `sample_rate`
///
/// Returns the controller for the control thread and the adapter to move
/// into the audio callback.
pub fn create_session(
    sample_rate: u32,
    config: &EngineConfig,
    decoder: Box<dyn Decoder>,
) -> Result<(PlaybackController, OutputCallbackAdapter), EngineError> {
    let pitch = clamp_rate(config.default_pitch).unwrap_or(1.0);
    let tempo = clamp_rate(config.default_tempo).unwrap_or(1.0);
    let atomics = Arc::new(SessionAtomics::new(sample_rate, pitch, tempo));

    let mut transform = config
        .transform
        .build(AudioSource::new(atomics.clone()), sample_rate);
    transform.set_pitch(pitch);
    transform.set_tempo(tempo);

    let (command_tx, command_rx) = command_channel();
    let (event_tx, event_rx) = event_channel();

    let target_rate = config.resample_on_load.then_some(sample_rate);
    let loader = BufferLoader::spawn(decoder, target_rate)?;

    let adapter = OutputCallbackAdapter::new(
        transform,
        command_rx,
        event_tx,
        atomics.clone(),
        config.batch_size,
    );
    let controller = PlaybackController::new(atomics, CommandSender::new(command_tx), event_rx, loader);

    if adapter.batch_size() != config.batch_size {
        log::warn!(
            "Batch size {} not supported by the {:?} transform, using {}",
            config.batch_size,
            config.transform,
            adapter.batch_size()
        );
    }

    log::info!(
        "Session created: {} Hz, batch {} frames, {:?} transform",
        sample_rate,
        adapter.batch_size(),
        config.transform
    );

    Ok((controller, adapter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::tests::StubDecoder;
    use crate::timestretch::TransformKind;
    use crate::types::PlaybackAction;

    #[test]
    fn test_create_session_applies_defaults() {
        let config = EngineConfig {
            batch_size: 512,
            transform: TransformKind::Passthrough,
            default_pitch: 0.8,
            default_tempo: 5.0,
            resample_on_load: false,
        };
        let (controller, adapter) =
            create_session(48000, &config, Box::new(StubDecoder { sample_rate: 48000 })).unwrap();

        assert_eq!(adapter.batch_size(), 512);
        assert_eq!(adapter.transform().pitch(), 0.8);
        assert_eq!(adapter.transform().tempo(), 2.0);
        assert_eq!(controller.tempo(), 2.0);
        assert_eq!(controller.action(), PlaybackAction::Stopped);
        assert_eq!(controller.atomics().sample_rate(), 48000);
    }

    #[test]
    fn test_stretch_session_pulls_audio() {
        let config = EngineConfig {
            batch_size: 1024,
            ..EngineConfig::default()
        };
        let (mut controller, mut adapter) =
            create_session(44100, &config, Box::new(StubDecoder { sample_rate: 44100 })).unwrap();

        let tone: Vec<f32> = (0..44100)
            .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / 44100.0).sin() * 0.5)
            .collect();
        let buffer = crate::decode::DecodedBuffer::from_channels(44100, tone.clone(), tone);
        controller.install_buffer(buffer, "tone");
        controller.set_tempo(1.5);

        let mut left = vec![0.0; 1024];
        let mut right = vec![0.0; 1024];
        let mut energy = 0.0;
        for _ in 0..10 {
            adapter.process(&mut left, &mut right);
            energy += left.iter().map(|s| s * s).sum::<f32>();
        }

        assert!(energy > 0.0);
        assert_eq!(controller.cursor(), 1536 * 10);
    }

    #[test]
    fn test_oversized_batch_is_capped_to_stretch_block() {
        use crate::timestretch::MAX_OUTPUT_FRAMES;

        let frames = 2 * MAX_OUTPUT_FRAMES;
        let config = EngineConfig {
            batch_size: frames,
            ..EngineConfig::default()
        };
        let (mut controller, mut adapter) =
            create_session(44100, &config, Box::new(StubDecoder { sample_rate: 44100 })).unwrap();
        assert_eq!(adapter.batch_size(), MAX_OUTPUT_FRAMES);

        let tone: Vec<f32> = (0..441_000)
            .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / 44100.0).sin() * 0.5)
            .collect();
        let buffer = crate::decode::DecodedBuffer::from_channels(44100, tone.clone(), tone);
        controller.install_buffer(buffer, "tone");

        let mut left = vec![0.0; frames];
        let mut right = vec![0.0; frames];
        // First callback absorbs the stretcher's latency
        adapter.process(&mut left, &mut right);
        for _ in 0..3 {
            adapter.process(&mut left, &mut right);
            let tail: f32 = left[MAX_OUTPUT_FRAMES..].iter().map(|s| s * s).sum();
            assert!(tail > 0.0, "second half of a mid-stream callback is silent");
        }
        assert_eq!(controller.cursor(), 4 * frames as u64);
    }
}
