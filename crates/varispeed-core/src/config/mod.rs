//! Engine configuration and YAML persistence
//!
//! ```ignore
//! use varispeed_core::config::{load_config, default_config_path, EngineConfig};
//!
//! let config: EngineConfig = load_config(&default_config_path());
//! ```

mod io;
mod paths;

pub use io::{load_config, parse_config, save_config};
pub use paths::{config_dir, default_config_path, APP_DIR};

use serde::{Deserialize, Serialize};

use crate::timestretch::TransformKind;

/// Default frames per pull from the transform
pub const DEFAULT_BATCH_SIZE: usize = 4096;

/// Playback engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Frames pulled from the transform per batch
    pub batch_size: usize,
    /// Which transform sits between source and sink
    pub transform: TransformKind,
    /// Pitch multiplier applied to a new session
    pub default_pitch: f64,
    /// Tempo multiplier applied to a new session
    pub default_tempo: f64,
    /// Convert decoded audio to the output rate before installing it
    pub resample_on_load: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            transform: TransformKind::default(),
            default_pitch: 1.0,
            default_tempo: 1.0,
            resample_on_load: true,
        }
    }
}
