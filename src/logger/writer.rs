//! Access log writer module
//!
//! Thread-safe access log output to a file or stdout. Diagnostic logs go through
//! `tracing` instead.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, OnceLock, PoisonError};

/// Global access log writer instance
static ACCESS_WRITER: OnceLock<AccessLogWriter> = OnceLock::new();

/// Log output target
enum LogTarget {
    Stdout,
    File(Mutex<File>),
}

pub struct AccessLogWriter {
    target: LogTarget,
}

impl AccessLogWriter {
    fn new(access_log_file: Option<&str>) -> io::Result<Self> {
        let target = match access_log_file {
            Some(path) => LogTarget::File(Mutex::new(open_log_file(path)?)),
            None => LogTarget::Stdout,
        };
        Ok(Self { target })
    }

    pub fn write(&self, message: &str) {
        match &self.target {
            LogTarget::Stdout => println!("{message}"),
            LogTarget::File(file) => {
                let mut f = file.lock().unwrap_or_else(PoisonError::into_inner);
                if let Err(e) = writeln!(f, "{message}") {
                    tracing::warn!(error = %e, "Failed to write access log");
                }
            }
        }
    }
}

/// Open or create a log file for appending
pub fn open_log_file(path: &str) -> io::Result<File> {
    // Create parent directories if they don't exist
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

/// Initialize the global access log writer
///
/// This should be called once at application startup.
pub fn init(access_log_file: Option<&str>) -> io::Result<()> {
    let writer = AccessLogWriter::new(access_log_file)?;
    ACCESS_WRITER.set(writer).map_err(|_| {
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "Access log writer already initialized",
        )
    })
}

/// Get the global access log writer, if initialized
pub fn get() -> Option<&'static AccessLogWriter> {
    ACCESS_WRITER.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_target_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/nested/access.log");
        let path_str = path.to_str().unwrap();

        let writer = AccessLogWriter::new(Some(path_str)).unwrap();
        writer.write("first");
        writer.write("second");
        drop(writer);

        let writer = AccessLogWriter::new(Some(path_str)).unwrap();
        writer.write("third");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "first\nsecond\nthird\n");
    }
}
