use std::io::{self, Write};

use colored::Colorize;
use log::{Level, LevelFilter, Metadata, Record};

/// stderr logger with colored level prefixes.
///
/// `--quiet` silences everything, `--verbose` lets codec tracing through.
#[derive(Clone)]
pub struct ColorLogger {
    max_level: LevelFilter,
}

impl ColorLogger {
    pub fn new(quiet: bool, verbose: bool) -> Self {
        let max_level = if quiet {
            LevelFilter::Off
        } else if verbose {
            LevelFilter::Trace
        } else {
            LevelFilter::Info
        };
        Self { max_level }
    }

    pub fn max_level(&self) -> LevelFilter {
        self.max_level
    }
}

impl log::Log for ColorLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match record.level() {
            Level::Error => eprintln!(
                "{} {}",
                "[ERROR]".red().bold(),
                format!("{}", record.args()).red().bold()
            ),
            Level::Warn => eprintln!(
                "{} {}",
                "[WARN]".yellow().bold(),
                format!("{}", record.args()).yellow().bold()
            ),
            Level::Info => eprintln!("[{}] {}", "INFO".blue(), record.args()),
            level => eprintln!(
                "[{}] {} {}",
                level.to_string().dimmed(),
                record.target().dimmed(),
                record.args()
            ),
        }
        self.flush();
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}
