//! Opt-in colorized consumer for the `log` facade.
//!
//! The engine only ever emits through `log` macros; it never installs a
//! consumer itself. Binaries and tests that want to see the stream call
//! [`StandardLogger::setup`] once.

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use termcolor::{Buffer, BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// The logger instance installed by [`StandardLogger::setup`].
pub static LOGGER: StandardLogger = StandardLogger {
    max_level: LevelFilter::Trace,
};

///
/// Renders records as `LEVEL target message` lines, one per record, with
/// the level colorized by severity and the target dimmed. Errors go to
/// stderr, everything else to stdout.
///
pub struct StandardLogger {
    max_level: LevelFilter,
}

impl StandardLogger {
    /// Installs the logger as the global `log` consumer, enabling all
    /// levels.
    ///
    /// # Errors
    ///
    /// Fails if a global consumer is already installed.
    pub fn setup() -> Result<(), SetLoggerError> {
        log::set_logger(&LOGGER)?;
        log::set_max_level(LOGGER.max_level);
        Ok(())
    }

    fn severity_spec(level: Level) -> ColorSpec {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(match level {
            Level::Error => Color::Red,
            Level::Warn => Color::Yellow,
            Level::Info => Color::Green,
            Level::Debug => Color::Cyan,
            Level::Trace => Color::Blue,
        }));
        spec.set_bold(level <= Level::Warn);
        spec
    }

    /// Renders one record into `buffer`. Separated from [`Log::log`] so
    /// the line format is testable without touching process streams.
    fn write_record(&self, buffer: &mut Buffer, record: &Record<'_>) -> std::io::Result<()> {
        buffer.set_color(&Self::severity_spec(record.level()))?;
        write!(buffer, "{:>5}", record.level())?;
        buffer.reset()?;

        buffer.set_color(ColorSpec::new().set_dimmed(true))?;
        write!(buffer, " {}", record.target())?;
        buffer.reset()?;

        writeln!(buffer, " {}", record.args())
    }
}

impl Log for StandardLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let writer = match record.level() {
            Level::Error => BufferWriter::stderr(ColorChoice::Auto),
            _ => BufferWriter::stdout(ColorChoice::Auto),
        };
        let mut buffer = writer.buffer();

        // A failing process stream leaves no channel to report on.
        let _ = self
            .write_record(&mut buffer, record)
            .and_then(|()| writer.print(&buffer));
    }

    fn flush(&self) {}
}
