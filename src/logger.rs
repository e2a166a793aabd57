//! Console backend for the `log` facade.
//!
//! Prints `LEVEL target: message` to stderr with the level tag painted bold in
//! its colour (green INFO, red ERROR, ...).

use ansi_term::{
    Colour::{Blue, Green, Purple, Red, Yellow},
    Style,
};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

pub struct ConsoleLogger {
    level: LevelFilter,
}

impl ConsoleLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self { level }
    }

    fn style(level: Level) -> Style {
        match level {
            Level::Error => Red.bold(),
            Level::Warn => Yellow.bold(),
            Level::Info => Green.bold(),
            Level::Debug => Blue.bold(),
            Level::Trace => Purple.bold(),
        }
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = format!("{:<5}", record.level());
        eprintln!(
            "{} {}: {}",
            Self::style(record.level()).paint(tag),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {}
}

/// Install the console logger as the global logger.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(Box::new(ConsoleLogger::new(level)))?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_by_level() {
        let logger = ConsoleLogger::new(LevelFilter::Warn);
        let warn = Metadata::builder().level(Level::Warn).build();
        let info = Metadata::builder().level(Level::Info).build();
        assert!(logger.enabled(&warn));
        assert!(!logger.enabled(&info));
    }
}
