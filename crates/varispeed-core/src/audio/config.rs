//! Output device configuration

use serde::{Deserialize, Serialize};

/// Largest callback the backend pre-allocates scratch space for (frames)
pub const MAX_BUFFER_SIZE: usize = 8192;

/// Smallest fixed buffer size requested from a device (frames)
pub const MIN_BUFFER_SIZE: u32 = 64;

/// Audio device identifier: device name plus the host that exposes it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceId {
    pub name: String,
    /// Audio host ("ALSA", "JACK", "CoreAudio", ...); None searches every host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl DeviceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
        }
    }

    pub fn with_host(name: &str, host: &str) -> Self {
        Self {
            name: name.to_string(),
            host: Some(host.to_string()),
        }
    }

    /// Display label, prefixed with the host when known: `[ALSA] hw:0,0`
    pub fn display_label(&self) -> String {
        match &self.host {
            Some(host) => format!("[{}] {}", host, self.name),
            None => self.name.clone(),
        }
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_label())
    }
}

/// Output stream settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output device (None = system default)
    pub device: Option<DeviceId>,
    /// Fixed callback size in frames (None = the engine batch size)
    pub buffer_size: Option<u32>,
    /// Preferred sample rate (None = 44.1 kHz)
    pub sample_rate: Option<u32>,
}

impl AudioConfig {
    pub fn with_device(mut self, device: DeviceId) -> Self {
        self.device = Some(device);
        self
    }

    pub fn with_buffer_frames(mut self, frames: u32) -> Self {
        self.buffer_size = Some(frames);
        self
    }

    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = Some(rate);
        self
    }

    /// Buffer size to request, falling back to `batch_size` and clamped to
    /// what the backend can serve without allocating
    pub fn resolve_buffer_size(&self, batch_size: usize) -> u32 {
        self.buffer_size
            .unwrap_or(batch_size as u32)
            .clamp(MIN_BUFFER_SIZE, MAX_BUFFER_SIZE as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_label() {
        assert_eq!(DeviceId::new("hw:0,0").display_label(), "hw:0,0");
        assert_eq!(DeviceId::with_host("hw:0,0", "ALSA").to_string(), "[ALSA] hw:0,0");
    }

    #[test]
    fn test_resolve_buffer_size() {
        let config = AudioConfig::default();
        assert_eq!(config.resolve_buffer_size(4096), 4096);
        assert_eq!(config.clone().with_buffer_frames(16).resolve_buffer_size(4096), MIN_BUFFER_SIZE);
        assert_eq!(config.resolve_buffer_size(100_000), MAX_BUFFER_SIZE as u32);
    }

    #[test]
    fn test_yaml_omits_missing_host() {
        let config = AudioConfig::default().with_device(DeviceId::new("pulse"));
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("host"));

        let parsed: AudioConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }
}
