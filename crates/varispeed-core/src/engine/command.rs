//! Lock-free command and event queues between control and audio threads
//!
//! The control thread pushes [`EngineCommand`]s into an `rtrb` SPSC ring; the
//! output callback drains it at the start of every invocation, so a command is
//! never applied halfway through a pull. The reverse direction carries
//! [`EngineEvent`]s (end-of-stream) back to the control thread.
//!
//! Both rings are allocated once at session creation. Push and pop are
//! wait-free, which keeps the callback free of locks and allocation.

use basedrop::Shared;

use crate::decode::DecodedBuffer;

/// Capacity of the control → audio command queue
///
/// The audio thread drains the queue every callback, so this only needs to
/// absorb bursts of user actions between two callbacks.
pub const COMMAND_QUEUE_CAPACITY: usize = 256;

/// Capacity of the audio → control event queue
pub const EVENT_QUEUE_CAPACITY: usize = 32;

/// Operation applied by the output callback
///
/// Pitch and tempo don't travel through here; they are mirrored from
/// [`super::SessionAtomics`] on every callback.
pub enum EngineCommand {
    /// Detach, install a new buffer and rewind to frame 0
    ///
    /// `Shared` keeps the enum pointer-sized and lets the old buffer be
    /// dropped on the audio thread without freeing there.
    Load { buffer: Shared<DecodedBuffer> },
    /// Start pulling from the transform into the sink
    Attach,
    /// Stop pulling; the cursor stays where it is
    Detach,
    /// Detach and rewind the cursor to 0
    Stop,
    /// Move the cursor to an absolute frame (already clamped)
    Seek { frame: usize },
}

impl std::fmt::Debug for EngineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineCommand::Load { buffer } => write!(f, "Load({} frames)", buffer.frames()),
            EngineCommand::Attach => write!(f, "Attach"),
            EngineCommand::Detach => write!(f, "Detach"),
            EngineCommand::Stop => write!(f, "Stop"),
            EngineCommand::Seek { frame } => write!(f, "Seek({})", frame),
        }
    }
}

/// A command tagged with the controller's sequence number
#[derive(Debug)]
pub struct SequencedCommand {
    pub seq: u64,
    pub command: EngineCommand,
}

/// Notification from the audio thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// The transform produced no frames; the engine detached and rewound.
    ///
    /// `seq` is the last command sequence applied before the end was hit, so
    /// the controller can ignore it if the user acted in the meantime.
    EndOfStream { seq: u64 },
}

/// Create the control → audio command channel
pub fn command_channel() -> (rtrb::Producer<SequencedCommand>, rtrb::Consumer<SequencedCommand>) {
    rtrb::RingBuffer::new(COMMAND_QUEUE_CAPACITY)
}

/// Create the audio → control event channel
pub fn event_channel() -> (rtrb::Producer<EngineEvent>, rtrb::Consumer<EngineEvent>) {
    rtrb::RingBuffer::new(EVENT_QUEUE_CAPACITY)
}

/// Sending half of the command queue, owned by the controller
pub struct CommandSender {
    producer: rtrb::Producer<SequencedCommand>,
    next_seq: u64,
}

impl CommandSender {
    pub fn new(producer: rtrb::Producer<SequencedCommand>) -> Self {
        Self {
            producer,
            next_seq: 1,
        }
    }

    /// Queue a command (non-blocking)
    ///
    /// Returns the sequence number assigned to it, or the command back if the
    /// queue is full.
    pub fn send(&mut self, command: EngineCommand) -> Result<u64, EngineCommand> {
        let seq = self.next_seq;
        match self.producer.push(SequencedCommand { seq, command }) {
            Ok(()) => {
                self.next_seq += 1;
                Ok(seq)
            }
            Err(rtrb::PushError::Full(rejected)) => Err(rejected.command),
        }
    }

    /// Sequence number of the most recently queued command (0 if none)
    pub fn last_seq(&self) -> u64 {
        self.next_seq - 1
    }

    pub fn has_space(&self) -> bool {
        self.producer.slots() > 0
    }
}
