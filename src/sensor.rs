//! Line-oriented sensor feed.
//!
//! Reads the distance stream from any `BufRead` (stdin in production) on a
//! dedicated thread and forwards each line through a channel. A line is
//! either a control command or a raw reading passed to the engine as-is,
//! so `unavailable` and other sensor states flow through untouched.

use std::io::BufRead;
use std::sync::mpsc;

use reptrack::Parameter;
use tracing::{trace, warn};

use crate::error::{Error, Result};

// ── Public types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    StartCalibration,
    StopCalibration,
    Set(Parameter, f64),
    Reset,
    Status,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Sample(String),
    Command(Command),
}

impl Input {
    pub fn parse(line: &str) -> Result<Input> {
        let mut words = line.split_whitespace();
        let command = match words.next() {
            Some("calibrate") => match words.next() {
                Some("start") | Some("on") => Command::StartCalibration,
                Some("stop") | Some("off") => Command::StopCalibration,
                _ => return Err(Error::UnknownCommand(line.trim().to_string())),
            },
            Some("set") => {
                let param: Parameter = words
                    .next()
                    .ok_or_else(|| Error::UnknownCommand(line.trim().to_string()))?
                    .parse()?;
                let raw = words.next().unwrap_or_default();
                let value = raw
                    .parse::<f64>()
                    .map_err(|_| Error::InvalidValue(raw.to_string()))?;
                Command::Set(param, value)
            }
            Some("reset") => Command::Reset,
            Some("status") => Command::Status,
            _ => return Ok(Input::Sample(line.trim().to_string())),
        };
        Ok(Input::Command(command))
    }
}

// ── Public API ──────────────────────────────────────────────────────────────

/// Read `reader` until EOF, sending every non-blank line through `tx`.
/// Lines that are not UTF-8 and malformed commands are logged and skipped;
/// only a failing reader ends the feed early, or a receiver that is gone.
///
/// Must be called from a dedicated thread.
pub fn start<R: BufRead>(reader: R, tx: mpsc::Sender<Input>) -> Result<()> {
    for bytes in reader.split(b'\n') {
        let bytes = bytes?;
        let line = match std::str::from_utf8(&bytes) {
            Ok(line) => line,
            Err(e) => {
                warn!("ignoring undecodable input line: {e}");
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let input = match Input::parse(line) {
            Ok(input) => input,
            Err(e) => {
                warn!("ignoring input line: {e}");
                continue;
            }
        };

        trace!(?input, "input");
        if tx.send(input).is_err() {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Input::parse("calibrate start").unwrap(),
            Input::Command(Command::StartCalibration)
        );
        assert_eq!(
            Input::parse("calibrate off").unwrap(),
            Input::Command(Command::StopCalibration)
        );
        assert_eq!(
            Input::parse("set rise_time 0.5").unwrap(),
            Input::Command(Command::Set(Parameter::RiseTime, 0.5))
        );
        assert_eq!(Input::parse("reset").unwrap(), Input::Command(Command::Reset));
        assert_eq!(Input::parse(" status ").unwrap(), Input::Command(Command::Status));
    }

    #[test]
    fn test_everything_else_is_a_sample() {
        assert_eq!(Input::parse("42.5").unwrap(), Input::Sample("42.5".into()));
        assert_eq!(
            Input::parse("unavailable").unwrap(),
            Input::Sample("unavailable".into())
        );
    }

    #[test]
    fn test_bad_commands() {
        assert!(matches!(
            Input::parse("calibrate sideways"),
            Err(Error::UnknownCommand(_))
        ));
        assert!(matches!(Input::parse("set speed 3"), Err(Error::Config(_))));
        assert!(matches!(
            Input::parse("set tolerance lots"),
            Err(Error::InvalidValue(_))
        ));
        assert!(matches!(Input::parse("set"), Err(Error::UnknownCommand(_))));
    }

    #[test]
    fn test_start_forwards_lines_until_eof() {
        let feed = Cursor::new("calibrate start\n10\n\n90\nset bogus 1\ncalibrate stop\n");
        let (tx, rx) = mpsc::channel();
        start(feed, tx).unwrap();

        let received: Vec<Input> = rx.iter().collect();
        assert_eq!(
            received,
            vec![
                Input::Command(Command::StartCalibration),
                Input::Sample("10".into()),
                Input::Sample("90".into()),
                Input::Command(Command::StopCalibration),
            ]
        );
    }

    #[test]
    fn test_start_skips_undecodable_lines() {
        let feed = Cursor::new(b"10\n\xff\xfe\n90\r\n".to_vec());
        let (tx, rx) = mpsc::channel();
        start(feed, tx).unwrap();

        let received: Vec<Input> = rx.iter().collect();
        assert_eq!(
            received,
            vec![Input::Sample("10".into()), Input::Sample("90".into())]
        );
    }
}
