//! Player configuration
//!
//! Stored as YAML, by default at `~/.config/varispeed/config.yaml`:
//!
//! ```yaml
//! audio:
//!   device:
//!     name: default
//!     host: ALSA
//!   sample_rate: 44100
//! engine:
//!   batch_size: 4096
//!   transform: stretch
//!   default_pitch: 1.0
//!   default_tempo: 1.0
//! ```

use serde::{Deserialize, Serialize};

use varispeed_core::audio::AudioConfig;
use varispeed_core::config::EngineConfig;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Output device settings
    pub audio: AudioConfig,
    /// Playback engine settings
    pub engine: EngineConfig,
}
