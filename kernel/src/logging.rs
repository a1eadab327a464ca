//! # Logging Module
//!
//! Colored `[LEVEL] message` lines on stderr, so diagnostics never mix with
//! the console output of the emulated programs.

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;

struct Logger;

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let color = match record.level() {
            Level::Error => 31, // Red
            Level::Warn => 93,  // Yellow
            Level::Info => 34,  // Blue
            Level::Debug => 32, // Green
            Level::Trace => 90, // Grey
        };
        let _ = writeln!(
            std::io::stderr(),
            "\u{1B}[{}m[{:>5}] {}\u{1B}[0m",
            color,
            record.level(),
            record.args(),
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Parses a `LOG` value, `None` when it names no level.
pub fn parse_level(value: &str) -> Option<LevelFilter> {
    match value.trim().to_ascii_uppercase().as_str() {
        "ERROR" => Some(LevelFilter::Error),
        "WARN" => Some(LevelFilter::Warn),
        "INFO" => Some(LevelFilter::Info),
        "DEBUG" => Some(LevelFilter::Debug),
        "TRACE" => Some(LevelFilter::Trace),
        "OFF" => Some(LevelFilter::Off),
        _ => None,
    }
}

/// Installs the logger, with the level taken from the `LOG` environment
/// variable at run time.
///
/// Falls back to `default` if the variable is unset or not recognized.
pub fn init(default: LevelFilter) -> Result<(), SetLoggerError> {
    static LOGGER: Logger = Logger;
    log::set_logger(&LOGGER)?;
    let level = std::env::var("LOG")
        .ok()
        .as_deref()
        .and_then(parse_level)
        .unwrap_or(default);
    log::set_max_level(level);
    Ok(())
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("TRACE"), Some(LevelFilter::Trace));
        assert_eq!(parse_level("warn"), Some(LevelFilter::Warn));
        assert_eq!(parse_level("OFF"), Some(LevelFilter::Off));
        assert_eq!(parse_level("verbose"), None);
    }
}
