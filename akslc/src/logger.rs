//! A minimal logger which writes every record to the standard error stream.

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
	fn enabled(&self, metadata: &Metadata) -> bool {
		metadata.level() <= log::max_level()
	}

	fn log(&self, record: &Record) {
		if self.enabled(record.metadata()) {
			eprintln!(
				"[{}] {}: {}",
				record.level(),
				record.target(),
				record.args()
			);
		}
	}

	fn flush(&self) {}
}

/// Maps the number of `-v` flags to a level filter.
pub fn level(verbosity: u8) -> LevelFilter {
	match verbosity {
		0 => LevelFilter::Warn,
		1 => LevelFilter::Info,
		2 => LevelFilter::Debug,
		_ => LevelFilter::Trace,
	}
}

/// Installs the logger. Can only succeed once per process.
pub fn init(verbosity: u8) -> Result<(), SetLoggerError> {
	log::set_logger(&LOGGER)?;
	log::set_max_level(level(verbosity));
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn verbosity_levels() {
		assert_eq!(level(0), LevelFilter::Warn);
		assert_eq!(level(1), LevelFilter::Info);
		assert_eq!(level(2), LevelFilter::Debug);
		assert_eq!(level(3), LevelFilter::Trace);
		assert_eq!(level(u8::MAX), LevelFilter::Trace);
	}
}
