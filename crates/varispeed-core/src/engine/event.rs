//! Notifications from the controller to the presentation layer
//!
//! Events are delivered over crossbeam channels; any number of subscribers can
//! register with [`super::PlaybackController::subscribe`].

use crossbeam::channel::{Receiver, Sender};

use crate::decode::DecodeError;
use crate::types::PlaybackAction;

/// A failed load as reported to the control surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    /// Error category, e.g. "Decoding error"
    pub kind: String,
    pub message: String,
}

impl From<&DecodeError> for LoadFailure {
    fn from(err: &DecodeError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.message.clone(),
        }
    }
}

impl std::fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Observable change in the playback session
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// Free-form status line ("Reading file...", "Playing file...", "Done!")
    Status(String),
    /// A load request was handed to the loader
    LoadStarted { name: String },
    /// A buffer was decoded and installed
    Loaded { name: String, duration_seconds: f64 },
    /// Decoding failed; playback is untouched
    LoadFailed(LoadFailure),
    ActionChanged(PlaybackAction),
    /// Reported position changed
    Progress { seconds: f64, percent: f64 },
    PitchChanged(f64),
    TempoChanged(f64),
    /// The transform ran dry and playback stopped on its own
    EndOfStream,
}

/// Fan-out list of event subscribers
///
/// Disconnected receivers are pruned on the next publish.
#[derive(Default)]
pub(crate) struct Subscribers {
    senders: Vec<Sender<PlaybackEvent>>,
}

impl Subscribers {
    pub(crate) fn subscribe(&mut self) -> Receiver<PlaybackEvent> {
        let (tx, rx) = crossbeam::channel::unbounded();
        self.senders.push(tx);
        rx
    }

    pub(crate) fn publish(&mut self, event: PlaybackEvent) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.senders.len()
    }
}
