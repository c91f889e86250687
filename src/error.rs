//! # Error Types
//!
//! Custom error types for GNSS Logger using `thiserror`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for GNSS Logger
#[derive(Debug, Error)]
pub enum GnssLoggerError {
    /// Serial port could not be opened (missing device, permissions, busy)
    #[error("Failed to open serial port {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    /// I/O fault on an open serial port
    #[error("Serial transport error on {path}: {source}")]
    Transport {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Read or write attempted on a session that is not open
    #[error("Serial port {0} is not open")]
    NotOpen(String),

    /// Log file could not be created or written
    #[error("Log file error at {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reopen policy gave up on a failed serial port
    #[error("Gave up reopening serial port {path} after {attempts} attempts")]
    ReconnectExhausted { path: String, attempts: u32 },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for GNSS Logger
pub type Result<T> = std::result::Result<T, GnssLoggerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_error_message_names_port() {
        let err = GnssLoggerError::Open {
            path: "/dev/ttyACM0".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/dev/ttyACM0"));
        assert!(msg.contains("No such file or directory"));
    }

    #[test]
    fn test_log_file_error_message_names_path() {
        let err = GnssLoggerError::LogFile {
            path: PathBuf::from("ublox-gps-log/2024-01-01_00-00-00.nmea"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("ublox-gps-log/2024-01-01_00-00-00.nmea"));
    }

    #[test]
    fn test_reconnect_exhausted_message() {
        let err = GnssLoggerError::ReconnectExhausted {
            path: "/dev/ttyUSB0".to_string(),
            attempts: 5,
        };
        assert_eq!(
            err.to_string(),
            "Gave up reopening serial port /dev/ttyUSB0 after 5 attempts"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let err: GnssLoggerError = io::Error::new(io::ErrorKind::Other, "boom").into();
        assert!(matches!(err, GnssLoggerError::Io(_)));
    }
}
