//! Audio output: the external clock that drives the playback session
//!
//! The cpal backend opens an output stream at a fixed buffer size and moves
//! the session's [`crate::engine::OutputCallbackAdapter`] into its callback.
//! The caller gets the [`crate::engine::PlaybackController`] back.
//!
//! ```ignore
//! use varispeed_core::audio::{start_audio_system, AudioConfig};
//!
//! let mut audio = start_audio_system(&AudioConfig::default(), &engine_config, decoder)?;
//! audio.controller.load_file(path)?;
//! loop { audio.controller.poll(); }
//! ```

mod config;
mod cpal_backend;
mod device;
mod error;

pub use config::{AudioConfig, DeviceId, MAX_BUFFER_SIZE, MIN_BUFFER_SIZE};
pub use cpal_backend::{start_audio_system, AudioHandle, AudioSystemResult};
pub use device::{default_output_device, find_device_by_id, get_output_devices, OutputDevice};
pub use error::{AudioError, AudioResult};
