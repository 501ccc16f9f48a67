//! Control-thread half of a playback session
//!
//! [`PlaybackController`] owns the stopped/playing/paused state machine. It is
//! the only writer of the published action: every transition queues a command
//! for the audio thread and updates the action right away, so reads on the
//! control thread never wait for a callback.
//!
//! The cursor and reported position have a single writer, the audio thread.
//! Until it has applied a queued stop, seek or load, the controller answers
//! with the frame that command will leave behind.
//!
//! End-of-stream travels the other way. The adapter detaches on its own and
//! posts the last sequence number it applied; [`PlaybackController::poll`]
//! turns that into `stop()` unless a newer command has been queued since, in
//! which case the user's action wins.

use std::path::Path;
use std::sync::Arc;

use basedrop::Shared;
use crossbeam::channel::Receiver;

use super::command::{CommandSender, EngineCommand, EngineEvent};
use super::event::{LoadFailure, PlaybackEvent, Subscribers};
use super::gc::gc_handle;
use super::position::{percent_to_frame, PositionTracker};
use super::SessionAtomics;
use crate::decode::DecodedBuffer;
use crate::loader::{BufferLoader, LoadResult};
use crate::timestretch::clamp_rate;
use crate::types::PlaybackAction;

pub const STATUS_READING: &str = "Reading file...";
pub const STATUS_PLAYING: &str = "Playing file...";
pub const STATUS_DONE: &str = "Done!";

/// State machine and control surface of a playback session
pub struct PlaybackController {
    atomics: Arc<SessionAtomics>,
    sender: CommandSender,
    events: rtrb::Consumer<EngineEvent>,
    loader: BufferLoader,
    subscribers: Subscribers,
    /// Id of the newest load request; older results are discarded
    pending_load: Option<u64>,
    has_buffer: bool,
    filename: Option<String>,
    /// Position (frames) last published as progress
    last_progress: Option<u64>,
    /// Cursor a queued command will leave behind, until the audio thread applies it
    expected: Option<ExpectedCursor>,
    /// Sequence of the newest queued command other than a pause
    last_non_pause_seq: u64,
}

#[derive(Debug, Clone, Copy)]
struct ExpectedCursor {
    seq: u64,
    frame: u64,
}

impl PlaybackController {
    pub(crate) fn new(
        atomics: Arc<SessionAtomics>,
        sender: CommandSender,
        events: rtrb::Consumer<EngineEvent>,
        loader: BufferLoader,
    ) -> Self {
        Self {
            atomics,
            sender,
            events,
            loader,
            subscribers: Subscribers::default(),
            pending_load: None,
            has_buffer: false,
            filename: None,
            last_progress: None,
            expected: None,
            last_non_pause_seq: 0,
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Transitions
    // ────────────────────────────────────────────────────────────────────────

    /// Start or resume playback; no-op when already playing
    ///
    /// Playing with nothing loaded is allowed and produces silence.
    pub fn play(&mut self) {
        if self.action() == PlaybackAction::Playing {
            return;
        }
        if self.send(EngineCommand::Attach).is_some() {
            self.set_action(PlaybackAction::Playing);
        }
    }

    /// Pause playback, keeping the cursor; no-op unless playing
    pub fn pause(&mut self) {
        if self.action() != PlaybackAction::Playing {
            return;
        }
        if self.send(EngineCommand::Detach).is_some() {
            self.set_action(PlaybackAction::Paused);
        }
    }

    /// Detach and rewind to frame 0 from any state
    ///
    /// The audio thread detaches before it rewinds, so no callback ever pulls
    /// from a half-reset session.
    pub fn stop(&mut self) {
        let Some(seq) = self.send(EngineCommand::Stop) else {
            return;
        };
        self.expect_cursor(seq, 0);
        self.set_action(PlaybackAction::Stopped);
    }

    /// Jump to `percent` (0..=100) of the buffer and make sure it is playing
    ///
    /// Ignored while no buffer is installed.
    pub fn seek(&mut self, percent: f64) {
        if !self.has_buffer {
            log::debug!("Seek ignored: no buffer loaded");
            return;
        }

        let frame = percent_to_frame(
            percent,
            self.atomics.duration_seconds(),
            self.atomics.sample_rate(),
            self.atomics.total_frames() as usize,
        );

        let Some(seq) = self.send(EngineCommand::Seek { frame }) else {
            return;
        };
        self.expect_cursor(seq, frame as u64);

        // Attach even if already playing: the audio thread may have
        // detached on end-of-stream in the meantime.
        if self.send(EngineCommand::Attach).is_some() {
            self.set_action(PlaybackAction::Playing);
        }
    }

    /// Set the pitch multiplier, clamped to the supported range
    pub fn set_pitch(&mut self, pitch: f64) {
        let Some(pitch) = clamp_rate(pitch) else {
            log::warn!("Ignoring non-finite pitch {}", pitch);
            return;
        };
        self.atomics.set_pitch(pitch);
        self.subscribers.publish(PlaybackEvent::PitchChanged(pitch));
    }

    /// Set the tempo multiplier, clamped to the supported range
    pub fn set_tempo(&mut self, tempo: f64) {
        let Some(tempo) = clamp_rate(tempo) else {
            log::warn!("Ignoring non-finite tempo {}", tempo);
            return;
        };
        self.atomics.set_tempo(tempo);
        self.subscribers.publish(PlaybackEvent::TempoChanged(tempo));
    }

    // ────────────────────────────────────────────────────────────────────────
    // Loading
    // ────────────────────────────────────────────────────────────────────────

    /// Decode `bytes` in the background
    ///
    /// The result is picked up by [`Self::poll`]: success installs the buffer
    /// and starts playback, failure publishes [`PlaybackEvent::LoadFailed`]
    /// and leaves the current session alone.
    pub fn load_bytes(&mut self, bytes: Vec<u8>, name: impl Into<String>) -> Option<u64> {
        let name = name.into();
        self.subscribers.publish(PlaybackEvent::Status(STATUS_READING.to_string()));
        self.subscribers.publish(PlaybackEvent::LoadStarted { name: name.clone() });

        let id = self.loader.load(bytes, name)?;
        self.pending_load = Some(id);
        Some(id)
    }

    /// Read a file and decode it in the background
    pub fn load_file(&mut self, path: &Path) -> std::io::Result<Option<u64>> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(self.load_bytes(bytes, name))
    }

    /// Replace the session's buffer and start playing it from frame 0
    pub fn install_buffer(&mut self, buffer: DecodedBuffer, name: impl Into<String>) {
        let name = name.into();
        self.stop();

        let sample_rate = buffer.sample_rate();
        let total_frames = buffer.frames() as u64;
        let duration_seconds = buffer.duration_seconds();

        let shared = Shared::new(&gc_handle(), buffer);
        let Some(seq) = self.send(EngineCommand::Load { buffer: shared }) else {
            return;
        };
        self.expect_cursor(seq, 0);

        self.atomics.set_buffer_info(sample_rate, total_frames, duration_seconds);
        self.has_buffer = true;
        self.filename = Some(name.clone());

        log::info!("Installed '{}' ({:.2}s @ {} Hz)", name, duration_seconds, sample_rate);
        self.subscribers.publish(PlaybackEvent::Status(STATUS_PLAYING.to_string()));
        self.subscribers.publish(PlaybackEvent::Loaded {
            name,
            duration_seconds,
        });

        self.play();
        self.subscribers.publish(PlaybackEvent::Status(STATUS_DONE.to_string()));
    }

    // ────────────────────────────────────────────────────────────────────────
    // Polling
    // ────────────────────────────────────────────────────────────────────────

    /// Apply finished loads and audio-thread events, then publish progress
    ///
    /// Call this regularly from the control thread (a UI tick or a timer).
    pub fn poll(&mut self) {
        while let Some(result) = self.loader.try_recv() {
            self.handle_load_result(result);
        }

        while let Ok(event) = self.events.pop() {
            match event {
                EngineEvent::EndOfStream { seq } => self.handle_end_of_stream(seq),
            }
        }

        self.publish_progress();
    }

    fn handle_load_result(&mut self, result: LoadResult) {
        if self.pending_load != Some(result.id) {
            log::debug!("Discarding superseded load #{} ('{}')", result.id, result.name);
            return;
        }
        self.pending_load = None;

        match result.result {
            Ok(buffer) => self.install_buffer(buffer, result.name),
            Err(e) => {
                log::warn!("Load of '{}' failed: {}", result.name, e);
                self.subscribers
                    .publish(PlaybackEvent::LoadFailed(LoadFailure::from(&e)));
            }
        }
    }

    fn handle_end_of_stream(&mut self, seq: u64) {
        // Pausing after the end leaves the audio thread rewound and detached,
        // which is a stop
        let paused_since =
            self.action() == PlaybackAction::Paused && self.last_non_pause_seq <= seq;

        if seq != self.sender.last_seq() && !paused_since {
            log::debug!(
                "End of stream at #{} superseded by #{}",
                seq,
                self.sender.last_seq()
            );
            return;
        }

        log::info!("End of stream");
        self.stop();
        self.subscribers.publish(PlaybackEvent::EndOfStream);
    }

    fn publish_progress(&mut self) {
        let position = self.tracker().position_frames();
        if self.last_progress == Some(position) {
            return;
        }
        self.last_progress = Some(position);

        let tracker = self.tracker();
        self.subscribers.publish(PlaybackEvent::Progress {
            seconds: tracker.current_seconds(),
            percent: tracker.percent_done(),
        });
    }

    // ────────────────────────────────────────────────────────────────────────
    // Observation
    // ────────────────────────────────────────────────────────────────────────

    /// Register for session events
    pub fn subscribe(&mut self) -> Receiver<PlaybackEvent> {
        self.subscribers.subscribe()
    }

    pub fn tracker(&self) -> PositionTracker {
        PositionTracker::with_pending(self.atomics.clone(), self.pending_frame())
    }

    pub fn atomics(&self) -> &Arc<SessionAtomics> {
        &self.atomics
    }

    #[inline]
    pub fn action(&self) -> PlaybackAction {
        self.atomics.action()
    }

    /// Transform cursor in frames
    pub fn cursor(&self) -> u64 {
        self.pending_frame().unwrap_or_else(|| self.atomics.cursor())
    }

    #[inline]
    pub fn pitch(&self) -> f64 {
        self.atomics.pitch()
    }

    #[inline]
    pub fn tempo(&self) -> f64 {
        self.atomics.tempo()
    }

    #[inline]
    pub fn duration_seconds(&self) -> f64 {
        self.atomics.duration_seconds()
    }

    #[inline]
    pub fn has_buffer(&self) -> bool {
        self.has_buffer
    }

    /// Name of the installed buffer
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    fn set_action(&mut self, action: PlaybackAction) {
        if self.atomics.action() == action {
            return;
        }
        log::debug!("Playback action: {} -> {}", self.atomics.action(), action);
        self.atomics.set_action(action);
        self.subscribers.publish(PlaybackEvent::ActionChanged(action));
    }

    fn expect_cursor(&mut self, seq: u64, frame: u64) {
        self.expected = Some(ExpectedCursor { seq, frame });
    }

    /// Frame of the newest stop/seek/load the audio thread hasn't applied yet
    fn pending_frame(&self) -> Option<u64> {
        self.expected
            .filter(|expected| self.atomics.applied_seq() < expected.seq)
            .map(|expected| expected.frame)
    }

    fn send(&mut self, command: EngineCommand) -> Option<u64> {
        let pause = matches!(command, EngineCommand::Detach);
        match self.sender.send(command) {
            Ok(seq) => {
                log::trace!("Queued engine command #{}", seq);
                if !pause {
                    self.last_non_pause_seq = seq;
                }
                Some(seq)
            }
            Err(rejected) => {
                log::warn!("Engine command queue full, dropping {:?}", rejected);
                None
            }
        }
    }
}
