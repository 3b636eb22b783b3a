//! Logging setup
//!
//! With a log file configured, the crate's own `Logger` writes every record
//! to the file and echoes it to stderr. Without one, `env_logger` handles
//! console output and honours `RUST_LOG`.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record};

/// File logger with console echo
pub struct Logger {
    /// File handle for log output
    file: Mutex<Option<File>>,
    level: LevelFilter,
    echo: bool,
}

impl Logger {
    /// Creates a logger appending to `log_file`
    ///
    /// # Arguments
    /// * `log_file` - Path to the log file, created if missing
    /// * `level` - Most verbose level recorded
    pub fn new(log_file: &Path, level: LevelFilter) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(log_file)?;
        Ok(Logger {
            file: Mutex::new(Some(file)),
            level,
            echo: true,
        })
    }

    /// Disables the stderr echo
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    /// Writes one line to the log file
    pub fn write_line(&self, message: &str) -> io::Result<()> {
        let mut guard = self.file.lock().map_err(|_| io::Error::other("log file lock poisoned"))?;
        if let Some(file) = guard.as_mut() {
            writeln!(file, "{}", message)?;
            file.flush()?;
        }
        Ok(())
    }

    /// Installs this logger as the global `log` backend
    pub fn init_global_logger(self) -> io::Result<()> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self))
            .map_err(|e| io::Error::other(format!("logger already initialized: {}", e)))?;
        log::set_max_level(level);
        Ok(())
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let message = format!(
            "{} [{}] {}: {}",
            Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        );
        let _ = self.write_line(&message);

        if self.echo {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = file.flush();
            }
        }
    }
}

/// Sets up global logging
///
/// # Arguments
/// * `log_file` - File to log to; console only when `None`
/// * `level` - Default level, overridden by `RUST_LOG` for console logging
pub fn init_logging(log_file: Option<&Path>, level: LevelFilter) -> io::Result<()> {
    match log_file {
        Some(path) => Logger::new(path, level)?.init_global_logger(),
        None => env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_str()))
            .format_timestamp(None)
            .try_init()
            .map_err(|e| io::Error::other(e.to_string())),
    }
}
