//! Audio output error types

use thiserror::Error;

use crate::engine::EngineError;

/// Errors that can occur while opening the output device
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("No audio output devices found")]
    NoDevices,

    #[error("No default audio output device")]
    NoDefaultDevice,

    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    #[error("Failed to start audio stream: {0}")]
    StreamPlayError(String),

    /// The playback session behind the stream couldn't be created
    #[error("Failed to create playback session: {0}")]
    Session(#[from] EngineError),
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;
