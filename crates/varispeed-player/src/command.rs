//! Interactive commands read from stdin

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};

pub const HELP: &str = "\
Commands:
  play | pause | stop
  seek <0-100>      Jump to a percentage of the track
  pitch <x>         Set pitch multiplier
  tempo <x>         Set tempo multiplier
  load <path>       Load another file
  status            Show playback state
  help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Stop,
    Seek(f64),
    Pitch(f64),
    Tempo(f64),
    Load(PathBuf),
    Status,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line; blank lines yield `None`
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "play" => Command::Play,
            "pause" => Command::Pause,
            "stop" => Command::Stop,
            "seek" => Command::Seek(number(word, rest)?),
            "pitch" => Command::Pitch(number(word, rest)?),
            "tempo" => Command::Tempo(number(word, rest)?),
            "load" => {
                if rest.is_empty() {
                    bail!("load needs a path");
                }
                Command::Load(PathBuf::from(rest))
            }
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(anyhow!("Unknown command: {} (try 'help')", other)),
        };

        Ok(Some(command))
    }
}

fn number(command: &str, arg: &str) -> Result<f64> {
    if arg.is_empty() {
        bail!("{} needs a number", command);
    }
    arg.parse()
        .with_context(|| format!("{}: not a number: {}", command, arg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Command::parse("play").unwrap(), Some(Command::Play));
        assert_eq!(Command::parse("  PAUSE ").unwrap(), Some(Command::Pause));
        assert_eq!(Command::parse("q").unwrap(), Some(Command::Quit));
        assert_eq!(Command::parse("").unwrap(), None);
    }

    #[test]
    fn test_parse_arguments() {
        assert_eq!(Command::parse("seek 50").unwrap(), Some(Command::Seek(50.0)));
        assert_eq!(Command::parse("pitch 0.8").unwrap(), Some(Command::Pitch(0.8)));
        assert_eq!(Command::parse("tempo   1.5").unwrap(), Some(Command::Tempo(1.5)));
        assert_eq!(
            Command::parse("load /tmp/my song.mp3").unwrap(),
            Some(Command::Load(PathBuf::from("/tmp/my song.mp3")))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse("seek").is_err());
        assert!(Command::parse("pitch high").is_err());
        assert!(Command::parse("load").is_err());
        assert!(Command::parse("rewind").is_err());
    }
}
