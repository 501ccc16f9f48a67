//! Varispeed core: real-time pitch/tempo playback
//!
//! A decoded buffer is wrapped in an [`source::AudioSource`], pulled through a
//! [`timestretch::StreamingTransform`] and written to an output device by the
//! [`engine::OutputCallbackAdapter`], while the
//! [`engine::PlaybackController`] runs the stopped/playing/paused state
//! machine on the control thread.
//!
//! # Modules
//!
//! - [`types`]: stereo sample buffers and the playback action
//! - [`decode`]: symphonia decoding and load-time resampling
//! - [`source`]: random-access pull source over a decoded buffer
//! - [`timestretch`]: pitch/tempo transforms (signalsmith-stretch, passthrough)
//! - [`engine`]: controller, real-time adapter, lock-free queues and atomics
//! - [`loader`]: background decode thread
//! - [`audio`]: cpal output backend
//! - [`config`]: YAML configuration

pub mod audio;
pub mod config;
pub mod decode;
pub mod engine;
pub mod loader;
pub mod source;
pub mod timestretch;
pub mod types;

pub use types::*;
