//! Standard locations for configuration files

use std::path::PathBuf;

/// Directory name under the platform config dir
pub const APP_DIR: &str = "varispeed";

/// Platform configuration directory for varispeed
///
/// `~/.config/varispeed` on Linux; falls back to `./varispeed` when the
/// platform has no config dir.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Default config file path (`<config_dir>/config.yaml`)
pub fn default_config_path() -> PathBuf {
    config_dir().join("config.yaml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("varispeed/config.yaml"));
    }
}
