use std::path::PathBuf;

use arpeggio_core::{ChordType, PatternType, SourceIntent, MAX_OCTAVES, MIN_TEMPO_BPM};

/// One line of user input
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    Mode(SourceIntent),
    /// `None` when the file selection was cancelled
    Upload(Option<PathBuf>),
    Record,
    Play,
    Export(PathBuf),
    Chord(ChordType),
    Octaves(i32),
    Pattern(PatternType),
    Tempo(f64),
    Wait,
    Show,
    Save,
    Devices,
    Help,
    Quit,
}

pub(crate) const HELP: &str = "\
commands:
  mode upload|record|default   choose which sound to play
  upload [path]                load a WAV file (no path cancels the selection)
  record                       start or stop a microphone recording
  play                         play the arpeggio
  export <path>                render the arpeggio to a WAV file
  chord major|minor|diminished|augmented
  octaves <n>                  0 to 8
  pattern up|down|updown
  tempo <bpm>                  10 or faster
  wait                         wait for pending loads
  show                         print current settings
  save                         save settings to the config file
  devices                      show the default output device
  quit";

pub(crate) fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word.to_ascii_lowercase().as_str() {
        "mode" => match rest {
            "upload" => Ok(Command::Mode(SourceIntent::Upload)),
            "record" => Ok(Command::Mode(SourceIntent::Record)),
            "default" | "none" => Ok(Command::Mode(SourceIntent::None)),
            other => Err(format!("unknown mode '{other}'")),
        },
        "upload" => Ok(Command::Upload((!rest.is_empty()).then(|| PathBuf::from(rest)))),
        "record" | "stop" => Ok(Command::Record),
        "play" => Ok(Command::Play),
        "export" if rest.is_empty() => Err("export needs a path".into()),
        "export" => Ok(Command::Export(PathBuf::from(rest))),
        "chord" => Ok(Command::Chord(ChordType::from_name(rest))),
        "octaves" => match rest.parse::<i32>() {
            Ok(n) if n > MAX_OCTAVES => Err(format!("octaves must be at most {MAX_OCTAVES}, got {n}")),
            Ok(n) => Ok(Command::Octaves(n)),
            Err(_) => Err(format!("octaves must be a whole number, got '{rest}'")),
        },
        "pattern" => Ok(Command::Pattern(PatternType::from_name(rest))),
        "tempo" => match rest.parse::<f64>() {
            Ok(t) if t > 0.0 && t < MIN_TEMPO_BPM => {
                Err(format!("tempo must be at least {MIN_TEMPO_BPM} bpm, got {t}"))
            }
            Ok(t) => Ok(Command::Tempo(t)),
            Err(_) => Err(format!("tempo must be a number, got '{rest}'")),
        },
        "wait" => Ok(Command::Wait),
        "show" => Ok(Command::Show),
        "save" => Ok(Command::Save),
        "devices" => Ok(Command::Devices),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(format!("unknown command '{other}', try 'help'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_settings() {
        assert_eq!(parse("chord minor"), Ok(Command::Chord(ChordType::Minor)));
        assert_eq!(parse("chord weird"), Ok(Command::Chord(ChordType::Major)));
        assert_eq!(parse("octaves 3"), Ok(Command::Octaves(3)));
        assert_eq!(parse("octaves -1"), Ok(Command::Octaves(-1)));
        assert_eq!(parse("pattern  updown "), Ok(Command::Pattern(PatternType::UpDown)));
        assert_eq!(parse("tempo 92.5"), Ok(Command::Tempo(92.5)));
        assert!(parse("tempo fast").is_err());
        assert!(parse("octaves two").is_err());
        assert_eq!(parse("octaves 8"), Ok(Command::Octaves(MAX_OCTAVES)));
        assert!(parse("octaves 9").is_err());
        assert!(parse("octaves 1000000000").is_err());
        assert!(parse("tempo 1e-300").is_err());
        assert!(parse("tempo 0.01").is_err());
        assert_eq!(parse("tempo 10"), Ok(Command::Tempo(10.0)));
    }

    #[test]
    fn test_parse_sources() {
        assert_eq!(parse("mode upload"), Ok(Command::Mode(SourceIntent::Upload)));
        assert_eq!(parse("mode default"), Ok(Command::Mode(SourceIntent::None)));
        assert!(parse("mode tape").is_err());
        assert_eq!(parse("upload my sounds/pluck.wav"), Ok(Command::Upload(Some("my sounds/pluck.wav".into()))));
        assert_eq!(parse("upload"), Ok(Command::Upload(None)));
        assert_eq!(parse("record"), Ok(Command::Record));
    }

    #[test]
    fn test_parse_misc() {
        assert_eq!(parse("PLAY"), Ok(Command::Play));
        assert_eq!(parse("export out.wav"), Ok(Command::Export("out.wav".into())));
        assert!(parse("export").is_err());
        assert!(parse("dance").is_err());
        assert_eq!(parse("q"), Ok(Command::Quit));
    }
}
