//! # NMEA Log Writer
//!
//! Write-only audit trail: one append-only file per run.
//!
//! File layout: `<log_dir>/<YYYY-MM-DD_HH-MM-SS>.nmea`, one line per entry:
//!
//! ```text
//! 2024-05-01 12:00:00 - $GNGGA,120000.00,4807.03800,N,01137.01800,E,1,12,0.60,545.4,M,46.9,M,,*6F
//! ```

use chrono::{DateTime, Local};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{GnssLoggerError, Result};

/// Default directory for log files, relative to the working directory
pub const DEFAULT_LOG_DIR: &str = "ublox-gps-log";

/// Extension of log files
pub const LOG_FILE_EXTENSION: &str = "nmea";

/// strftime format of the per-run file name
pub const FILE_NAME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// strftime format of the capture timestamp prefixed to each line
pub const LINE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Creates the log session for a run
#[derive(Debug, Clone)]
pub struct LogWriter {
    dir: PathBuf,
}

impl LogWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Start the log session for a run beginning now
    ///
    /// # Errors
    ///
    /// Returns [`GnssLoggerError::LogFile`] if the directory or file cannot be
    /// created. A run cannot continue without it.
    pub fn start(&self) -> Result<LogSession> {
        self.start_at(Local::now())
    }

    /// Start the log session for a run that began at `created_at`
    pub fn start_at(&self, created_at: DateTime<Local>) -> Result<LogSession> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|source| GnssLoggerError::LogFile {
                path: self.dir.clone(),
                source,
            })?;
            info!("Created folder {}.", self.dir.display());
        }

        let file_name = format!(
            "{}.{}",
            created_at.format(FILE_NAME_FORMAT),
            LOG_FILE_EXTENSION
        );
        let file_path = self.dir.join(file_name);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)
            .map_err(|source| GnssLoggerError::LogFile {
                path: file_path.clone(),
                source,
            })?;

        info!("Log file created at {}", file_path.display());

        Ok(LogSession {
            file_path,
            created_at,
            file: Some(file),
            lines_written: 0,
        })
    }
}

/// Open log file for the current run
///
/// Released by [`close`](Self::close) or on drop.
#[derive(Debug)]
pub struct LogSession {
    file_path: PathBuf,
    created_at: DateTime<Local>,
    file: Option<File>,
    lines_written: u64,
}

impl LogSession {
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Append one line stamped with the current time
    pub fn append(&mut self, line: &str) -> Result<()> {
        self.append_at(line, Local::now())
    }

    /// Append `"<timestamp> - <line>\n"` in a single write
    ///
    /// # Errors
    ///
    /// Returns [`GnssLoggerError::LogFile`] if the session is closed or the write
    /// fails.
    pub fn append_at(&mut self, line: &str, at: DateTime<Local>) -> Result<()> {
        let Some(file) = self.file.as_mut() else {
            return Err(GnssLoggerError::LogFile {
                path: self.file_path.clone(),
                source: io::Error::new(io::ErrorKind::NotConnected, "log file is closed"),
            });
        };

        let entry = format!("{} - {}\n", at.format(LINE_TIMESTAMP_FORMAT), line);
        file.write_all(entry.as_bytes())
            .map_err(|source| GnssLoggerError::LogFile {
                path: self.file_path.clone(),
                source,
            })?;

        self.lines_written += 1;
        Ok(())
    }

    /// Flush to disk and release the file
    ///
    /// Idempotent. The handle is released even if the flush fails.
    pub fn close(&mut self) -> Result<()> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };

        let synced = file.sync_all();
        drop(file);
        info!("Closed log file.");

        synced.map_err(|source| GnssLoggerError::LogFile {
            path: self.file_path.clone(),
            source,
        })
    }
}

impl Drop for LogSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to flush log file on drop: {}", e);
        }
    }
}
