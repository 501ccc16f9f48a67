//! Real-time entry point driven by the output clock
//!
//! The adapter is moved into the audio callback and owned there exclusively.
//! Each invocation applies queued commands, mirrors pitch/tempo, pulls from the
//! transform and de-interleaves into the sink's channel buffers. Everything it
//! touches is pre-allocated; nothing here blocks, locks or logs.

use std::sync::Arc;

use super::command::{EngineCommand, EngineEvent, SequencedCommand};
use super::SessionAtomics;
use crate::timestretch::StreamingTransform;
use crate::types::{FrameBatch, Sample};

/// Audio-thread half of a playback session
pub struct OutputCallbackAdapter {
    transform: Box<dyn StreamingTransform>,
    commands: rtrb::Consumer<SequencedCommand>,
    events: rtrb::Producer<EngineEvent>,
    atomics: Arc<SessionAtomics>,
    /// Reused interleaved pull buffer, `batch_size` frames
    batch: FrameBatch,
    batch_size: usize,
    /// Whether callbacks currently pull from the transform
    attached: bool,
    applied_seq: u64,
}

impl OutputCallbackAdapter {
    pub(crate) fn new(
        transform: Box<dyn StreamingTransform>,
        commands: rtrb::Consumer<SequencedCommand>,
        events: rtrb::Producer<EngineEvent>,
        atomics: Arc<SessionAtomics>,
        batch_size: usize,
    ) -> Self {
        // Pulls never ask for more than the transform delivers at once, so a
        // short pull always means the end of the buffer
        let batch_size = batch_size.clamp(1, transform.max_block_frames());
        Self {
            transform,
            commands,
            events,
            atomics,
            batch: FrameBatch::silence(batch_size),
            batch_size,
            attached: false,
            applied_seq: 0,
        }
    }

    #[inline]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[inline]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn transform(&self) -> &dyn StreamingTransform {
        self.transform.as_ref()
    }

    /// Fill one pair of output channel buffers
    ///
    /// Frames the transform doesn't produce are left silent. Requests longer
    /// than the batch size are served in batch-sized pulls.
    pub fn process(&mut self, left: &mut [Sample], right: &mut [Sample]) {
        self.drain_commands();
        self.sync_parameters();

        left.fill(0.0);
        right.fill(0.0);

        if !self.attached {
            return;
        }

        let frames = left.len().min(right.len());
        let mut written = 0;

        while written < frames {
            let chunk = (frames - written).min(self.batch_size);
            self.batch.set_len_from_capacity(chunk);

            let produced = self.transform.extract(self.batch.as_interleaved_mut(), chunk);
            if produced == 0 {
                self.end_of_stream();
                return;
            }

            self.batch.to_channels(
                produced,
                &mut left[written..written + produced],
                &mut right[written..written + produced],
            );
            written += produced;

            if produced < chunk {
                break;
            }
        }

        self.atomics.set_cursor(self.transform.cursor() as u64);
    }

    fn drain_commands(&mut self) {
        while let Ok(SequencedCommand { seq, command }) = self.commands.pop() {
            self.apply(command);
            self.applied_seq = seq;
        }
        self.atomics.set_applied_seq(self.applied_seq);
    }

    fn apply(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Load { buffer } => {
                self.attached = false;
                // Old buffer is freed by the collector thread
                let _previous = self.transform.source_mut().replace_buffer(buffer);
                self.rewind();
            }
            EngineCommand::Attach => self.attached = true,
            EngineCommand::Detach => self.attached = false,
            EngineCommand::Stop => {
                self.attached = false;
                self.rewind();
            }
            EngineCommand::Seek { frame } => {
                let frame = frame.min(self.transform.source().total_frames());
                self.transform.set_cursor(frame);
                self.atomics.set_cursor(frame as u64);
            }
        }
    }

    fn sync_parameters(&mut self) {
        let pitch = self.atomics.pitch();
        if pitch != self.transform.pitch() {
            self.transform.set_pitch(pitch);
        }
        let tempo = self.atomics.tempo();
        if tempo != self.transform.tempo() {
            self.transform.set_tempo(tempo);
        }
    }

    fn rewind(&mut self) {
        self.transform.set_cursor(0);
        self.atomics.set_cursor(0);
        self.atomics.set_position(0);
    }

    fn end_of_stream(&mut self) {
        // An empty source is silence, not an ending
        if !self.transform.source().has_buffer() {
            return;
        }

        self.attached = false;
        self.rewind();

        // A full queue means the controller already has an unread end-of-stream
        let _ = self.events.push(EngineEvent::EndOfStream {
            seq: self.applied_seq,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::command::{command_channel, event_channel, CommandSender};
    use crate::engine::gc::gc_handle;
    use crate::source::tests::ramp_buffer;
    use crate::source::AudioSource;
    use crate::timestretch::PassthroughTransform;
    use basedrop::Shared;

    struct Harness {
        adapter: OutputCallbackAdapter,
        sender: CommandSender,
        events: rtrb::Consumer<EngineEvent>,
        atomics: Arc<SessionAtomics>,
        left: Vec<Sample>,
        right: Vec<Sample>,
    }

    impl Harness {
        fn new(batch_size: usize) -> Self {
            let atomics = Arc::new(SessionAtomics::default());
            let transform = Box::new(PassthroughTransform::new(AudioSource::new(atomics.clone())));
            let (command_tx, command_rx) = command_channel();
            let (event_tx, event_rx) = event_channel();

            Self {
                adapter: OutputCallbackAdapter::new(transform, command_rx, event_tx, atomics.clone(), batch_size),
                sender: CommandSender::new(command_tx),
                events: event_rx,
                atomics,
                left: vec![9.0; batch_size],
                right: vec![9.0; batch_size],
            }
        }

        fn load(&mut self, frames: usize) {
            let buffer = Shared::new(&gc_handle(), ramp_buffer(44100, frames));
            self.sender.send(EngineCommand::Load { buffer }).unwrap();
        }

        fn tick(&mut self) {
            self.adapter.process(&mut self.left, &mut self.right);
        }
    }

    #[test]
    fn test_detached_outputs_silence() {
        let mut h = Harness::new(64);
        h.load(1000);
        h.tick();

        assert!(!h.adapter.is_attached());
        assert!(h.left.iter().all(|&s| s == 0.0));
        assert!(h.right.iter().all(|&s| s == 0.0));
        assert_eq!(h.atomics.applied_seq(), 1);
    }

    #[test]
    fn test_attached_deinterleaves_source() {
        let mut h = Harness::new(64);
        h.load(1000);
        h.sender.send(EngineCommand::Attach).unwrap();
        h.tick();

        assert_eq!(h.left[0], 0.0);
        assert_eq!(h.left[63], 63.0);
        assert_eq!(h.right[63], -63.0);
        assert_eq!(h.atomics.cursor(), 64);
        assert_eq!(h.atomics.position(), 0);

        h.tick();
        assert_eq!(h.left[0], 64.0);
        assert_eq!(h.atomics.position(), 64);
    }

    #[test]
    fn test_exact_multiple_stops_on_following_callback() {
        let mut h = Harness::new(100);
        h.load(200);
        h.sender.send(EngineCommand::Attach).unwrap();

        h.tick();
        h.tick();
        // Last full batch is played, nothing signalled yet
        assert_eq!(h.left[99], 199.0);
        assert!(h.adapter.is_attached());
        assert!(h.events.pop().is_err());

        h.tick();
        assert!(!h.adapter.is_attached());
        assert!(h.left.iter().all(|&s| s == 0.0));
        assert_eq!(h.events.pop().unwrap(), EngineEvent::EndOfStream { seq: 2 });
        assert_eq!(h.atomics.cursor(), 0);
        assert_eq!(h.atomics.position(), 0);
    }

    #[test]
    fn test_partial_last_batch_plays_then_stops() {
        let mut h = Harness::new(100);
        h.load(150);
        h.sender.send(EngineCommand::Attach).unwrap();

        h.tick();
        h.tick();
        // 50 real frames, 50 frames of silence
        assert_eq!(h.left[49], 149.0);
        assert!(h.left[50..].iter().all(|&s| s == 0.0));
        assert!(h.adapter.is_attached());
        assert!(h.events.pop().is_err());

        h.tick();
        assert!(!h.adapter.is_attached());
        assert!(matches!(h.events.pop(), Ok(EngineEvent::EndOfStream { .. })));
    }

    #[test]
    fn test_no_buffer_never_signals_end() {
        let mut h = Harness::new(32);
        h.sender.send(EngineCommand::Attach).unwrap();

        for _ in 0..5 {
            h.tick();
            assert!(h.left.iter().all(|&s| s == 0.0));
        }
        assert!(h.adapter.is_attached());
        assert!(h.events.pop().is_err());
    }

    #[test]
    fn test_seek_moves_next_pull() {
        let mut h = Harness::new(16);
        h.load(1000);
        h.sender.send(EngineCommand::Seek { frame: 500 }).unwrap();
        h.sender.send(EngineCommand::Attach).unwrap();
        h.tick();

        assert_eq!(h.left[0], 500.0);
        assert_eq!(h.atomics.position(), 500);
        assert_eq!(h.atomics.cursor(), 516);
    }

    #[test]
    fn test_seek_is_clamped_to_buffer() {
        let mut h = Harness::new(16);
        h.load(100);
        h.sender.send(EngineCommand::Seek { frame: 5000 }).unwrap();
        h.tick();
        assert_eq!(h.adapter.transform().cursor(), 100);
    }

    #[test]
    fn test_stop_detaches_and_rewinds() {
        let mut h = Harness::new(16);
        h.load(1000);
        h.sender.send(EngineCommand::Attach).unwrap();
        h.tick();
        h.tick();

        h.sender.send(EngineCommand::Stop).unwrap();
        h.tick();
        assert!(!h.adapter.is_attached());
        assert_eq!(h.adapter.transform().cursor(), 0);
        assert_eq!(h.atomics.cursor(), 0);
        assert_eq!(h.atomics.position(), 0);
        assert!(h.left.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_parameters_mirrored_from_atomics() {
        let mut h = Harness::new(16);
        h.atomics.set_pitch(0.8);
        h.atomics.set_tempo(1.5);
        h.tick();

        assert_eq!(h.adapter.transform().pitch(), 0.8);
        assert_eq!(h.adapter.transform().tempo(), 1.5);
    }

    #[test]
    fn test_long_callback_is_served_in_batches() {
        let mut h = Harness::new(16);
        h.load(1000);
        h.sender.send(EngineCommand::Attach).unwrap();

        let mut left = vec![0.0; 40];
        let mut right = vec![0.0; 40];
        h.adapter.process(&mut left, &mut right);

        assert_eq!(left[39], 39.0);
        assert_eq!(h.atomics.cursor(), 40);
    }
}
