use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub const LOG_FILE_NAME: &str = "codeops.log";

/// `log` backend that appends every record to a file.
///
/// Warnings and errors are also echoed to stderr unless `quiet_stderr` is
/// set, which the TUI needs while it owns the terminal.
pub struct FileLogger {
    file: Arc<Mutex<File>>,
    level: LevelFilter,
    quiet_stderr: bool,
}

impl FileLogger {
    pub fn new(log_path: &Path, level: LevelFilter, quiet_stderr: bool) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            file: Arc::new(Mutex::new(file)),
            level,
            quiet_stderr,
        })
    }

    pub fn init(
        log_path: &Path,
        level: LevelFilter,
        quiet_stderr: bool,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let logger = Self::new(log_path, level, quiet_stderr)?;
        log::set_boxed_logger(Box::new(logger))?;
        log::set_max_level(level);
        Ok(())
    }

    fn format_record(record: &Record) -> String {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARN ",
            Level::Info => "INFO ",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };

        format!(
            "[{}] {} [{}:{}] {}\n",
            timestamp,
            level_str,
            record.module_path().unwrap_or("<unknown>"),
            record.line().unwrap_or(0),
            record.args()
        )
    }
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = Self::format_record(record);
        if let Ok(mut file) = self.file.lock() {
            let _ = file.write_all(message.as_bytes());
            let _ = file.flush();
        }
        if !self.quiet_stderr && record.level() <= Level::Warn {
            eprintln!("{}", record.args());
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}
