//! Command line arguments

use std::path::PathBuf;

use clap::Parser;

use crate::config::PlayerConfig;
use varispeed_core::timestretch::TransformKind;

#[derive(Debug, Parser, Clone, Default, PartialEq)]
#[command(name = "varispeed-player")]
#[command(about = "Play an audio file with live pitch and tempo control")]
pub struct CliArgs {
    /// Audio file to load on startup
    pub file: Option<PathBuf>,

    /// Initial pitch multiplier (0.05 - 2.0)
    #[arg(long, value_parser = parse_rate)]
    pub pitch: Option<f64>,

    /// Initial tempo multiplier (0.05 - 2.0)
    #[arg(long, value_parser = parse_rate)]
    pub tempo: Option<f64>,

    /// Config file (default: ~/.config/varispeed/config.yaml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Bypass pitch/tempo processing
    #[arg(long)]
    pub passthrough: bool,

    /// List audio output devices and exit
    #[arg(long)]
    pub list_devices: bool,
}

impl CliArgs {
    /// Override config values given on the command line
    pub fn apply(&self, config: &mut PlayerConfig) {
        if self.passthrough {
            config.engine.transform = TransformKind::Passthrough;
        }
        if let Some(pitch) = self.pitch {
            config.engine.default_pitch = pitch;
        }
        if let Some(tempo) = self.tempo {
            config.engine.default_tempo = tempo;
        }
    }
}

fn parse_rate(value: &str) -> Result<f64, String> {
    let rate: f64 = value
        .parse()
        .map_err(|_| format!("`{}` is not a number", value))?;
    if !(rate.is_finite() && rate > 0.0) {
        return Err("must be a positive number".to_string());
    }
    Ok(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from(std::iter::once("varispeed-player").chain(args.iter().copied()))
    }

    #[test]
    fn test_parse_full() {
        let args = parse(&["song.mp3", "--pitch", "0.8", "--tempo", "1.25", "--passthrough"]).unwrap();
        assert_eq!(args.file, Some(PathBuf::from("song.mp3")));
        assert_eq!(args.pitch, Some(0.8));
        assert_eq!(args.tempo, Some(1.25));
        assert!(args.passthrough);
        assert!(!args.list_devices);
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse(&[]).unwrap(), CliArgs::default());
    }

    #[test]
    fn test_parse_list_devices() {
        let args = parse(&["--list-devices", "--config", "/tmp/player.yaml"]).unwrap();
        assert!(args.list_devices);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/player.yaml")));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse(&["--pitch"]).is_err());
        assert!(parse(&["--pitch", "fast"]).is_err());
        assert!(parse(&["--tempo", "-1"]).is_err());
        assert!(parse(&["--tempo", "0"]).is_err());
        assert!(parse(&["--bogus"]).is_err());
        assert!(parse(&["a.mp3", "b.mp3"]).is_err());
    }

    #[test]
    fn test_apply_overrides_config() {
        let args = parse(&["--passthrough", "--pitch", "0.5"]).unwrap();
        let mut config = PlayerConfig::default();
        args.apply(&mut config);

        assert_eq!(config.engine.transform, TransformKind::Passthrough);
        assert_eq!(config.engine.default_pitch, 0.5);
        assert_eq!(config.engine.default_tempo, 1.0);
    }
}
