//! # Configuration Module
//!
//! Handles parsing and validating the command line.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::capture::{CaptureSettings, ReconnectPolicy};
use crate::error::{GnssLoggerError, Result};
use crate::serial::SerialEndpoint;
use crate::telemetry::logger::DEFAULT_LOG_DIR;

/// Baud rates accepted for the GNSS receiver and the RF module
pub const SUPPORTED_BAUD_RATES: &[u32] = &[4800, 9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600];

/// Command line arguments
#[derive(Debug, Clone, Parser)]
#[command(name = "gnss-logger", version)]
#[command(about = "Log NMEA position fixes from a GNSS receiver and optionally forward them to an RF module")]
pub struct Cli {
    /// Serial device of the GNSS receiver
    #[arg(long, default_value_t = default_gps_port())]
    pub gps_port: String,

    /// Serial device of the RF telemetry module; enables forwarding
    #[arg(long)]
    pub forward_port: Option<String>,

    /// Baud rate used for both serial ports
    #[arg(long, default_value_t = default_baud_rate())]
    pub baud_rate: u32,

    /// Read timeout in milliseconds
    #[arg(long, default_value_t = default_timeout_ms())]
    pub timeout_ms: u64,

    /// Directory for the per-run .nmea log files
    #[arg(long, default_value_t = default_log_dir())]
    pub log_dir: String,

    /// Pause after a read timeout, in milliseconds
    #[arg(long, default_value_t = default_idle_delay_ms())]
    pub idle_delay_ms: u64,

    /// Attempts to reopen a failed serial port before giving up
    #[arg(long, default_value_t = default_reconnect_attempts())]
    pub reconnect_attempts: u32,

    /// Delay before the first reopen attempt, in milliseconds (doubles per attempt)
    #[arg(long, default_value_t = default_reconnect_backoff_ms())]
    pub reconnect_backoff_ms: u64,

    /// Upper bound for the reopen delay, in milliseconds
    #[arg(long, default_value_t = default_reconnect_max_backoff_ms())]
    pub reconnect_max_backoff_ms: u64,

    /// Echo every received sentence (DEBUG level)
    #[arg(short, long)]
    pub verbose: bool,
}

/// Validated runtime configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub gps: SerialEndpoint,
    pub forward: Option<SerialEndpoint>,
    pub log_dir: PathBuf,
    pub capture: CaptureSettings,
    pub verbose: bool,
}

// Default value functions
fn default_gps_port() -> String { "/dev/ttyACM0".to_string() }
fn default_baud_rate() -> u32 { 115200 }
fn default_timeout_ms() -> u64 { 1000 }
fn default_log_dir() -> String { DEFAULT_LOG_DIR.to_string() }
fn default_idle_delay_ms() -> u64 { 1000 }
fn default_reconnect_attempts() -> u32 { 5 }
fn default_reconnect_backoff_ms() -> u64 { 500 }
fn default_reconnect_max_backoff_ms() -> u64 { 8000 }

impl Config {
    /// Build configuration from parsed arguments
    ///
    /// # Errors
    ///
    /// Returns [`GnssLoggerError::Config`] if any value is out of its valid range
    ///
    /// # Examples
    ///
    /// ```
    /// use clap::Parser;
    /// use gnss_logger::config::{Cli, Config};
    ///
    /// let cli = Cli::parse_from(["gnss-logger", "--gps-port", "/dev/ttyUSB0"]);
    /// let config = Config::from_cli(cli).unwrap();
    /// assert_eq!(config.gps.baud_rate(), 115200);
    /// assert!(config.forward.is_none());
    /// ```
    pub fn from_cli(cli: Cli) -> Result<Self> {
        cli.validate()?;

        let read_timeout = Duration::from_millis(cli.timeout_ms);
        let gps = SerialEndpoint::new(cli.gps_port, cli.baud_rate, read_timeout);
        let forward = cli
            .forward_port
            .map(|path| SerialEndpoint::new(path, cli.baud_rate, read_timeout));

        Ok(Self {
            gps,
            forward,
            log_dir: PathBuf::from(cli.log_dir),
            capture: CaptureSettings {
                idle_delay: Duration::from_millis(cli.idle_delay_ms),
                reconnect: ReconnectPolicy {
                    max_attempts: cli.reconnect_attempts,
                    initial_backoff: Duration::from_millis(cli.reconnect_backoff_ms),
                    max_backoff: Duration::from_millis(cli.reconnect_max_backoff_ms),
                },
            },
            verbose: cli.verbose,
        })
    }
}

impl Cli {
    /// Validate argument values
    ///
    /// # Errors
    ///
    /// Returns error if any value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.gps_port.is_empty() {
            return Err(GnssLoggerError::Config("gps port cannot be empty".to_string()));
        }

        if let Some(forward_port) = &self.forward_port {
            if forward_port.is_empty() {
                return Err(GnssLoggerError::Config("forward port cannot be empty".to_string()));
            }
            if *forward_port == self.gps_port {
                return Err(GnssLoggerError::Config(
                    "forward port must differ from gps port".to_string(),
                ));
            }
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.baud_rate) {
            return Err(GnssLoggerError::Config(format!(
                "baud_rate must be one of: {}",
                SUPPORTED_BAUD_RATES
                    .iter()
                    .map(u32::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        if self.timeout_ms == 0 || self.timeout_ms > 10000 {
            return Err(GnssLoggerError::Config(
                "timeout_ms must be between 1 and 10000".to_string(),
            ));
        }

        if self.log_dir.is_empty() {
            return Err(GnssLoggerError::Config("log_dir cannot be empty".to_string()));
        }

        if self.idle_delay_ms == 0 || self.idle_delay_ms > 60000 {
            return Err(GnssLoggerError::Config(
                "idle_delay_ms must be between 1 and 60000".to_string(),
            ));
        }

        if self.reconnect_attempts > 100 {
            return Err(GnssLoggerError::Config(
                "reconnect_attempts must be at most 100".to_string(),
            ));
        }

        if self.reconnect_backoff_ms == 0 || self.reconnect_backoff_ms > 60000 {
            return Err(GnssLoggerError::Config(
                "reconnect_backoff_ms must be between 1 and 60000".to_string(),
            ));
        }

        if self.reconnect_max_backoff_ms < self.reconnect_backoff_ms
            || self.reconnect_max_backoff_ms > 300000 {
            return Err(GnssLoggerError::Config(
                "reconnect_max_backoff_ms must be between reconnect_backoff_ms and 300000".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_cli() -> Cli {
        Cli {
            gps_port: default_gps_port(),
            forward_port: None,
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            log_dir: default_log_dir(),
            idle_delay_ms: default_idle_delay_ms(),
            reconnect_attempts: default_reconnect_attempts(),
            reconnect_backoff_ms: default_reconnect_backoff_ms(),
            reconnect_max_backoff_ms: default_reconnect_max_backoff_ms(),
            verbose: false,
        }
    }

    #[test]
    fn test_default_cli_is_valid() {
        assert!(create_valid_cli().validate().is_ok());
    }

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["gnss-logger"]).unwrap();
        assert_eq!(cli.gps_port, "/dev/ttyACM0");
        assert_eq!(cli.forward_port, None);
        assert_eq!(cli.baud_rate, 115200);
        assert_eq!(cli.timeout_ms, 1000);
        assert_eq!(cli.log_dir, "ublox-gps-log");
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parse_forwarding_variant() {
        let cli = Cli::try_parse_from([
            "gnss-logger",
            "--gps-port",
            "/dev/ttyACM0",
            "--forward-port",
            "/dev/ttyUSB0",
            "--baud-rate",
            "57600",
            "--timeout-ms",
            "250",
            "--log-dir",
            "/var/log/gnss",
            "-v",
        ])
        .unwrap();

        let config = Config::from_cli(cli).unwrap();
        assert_eq!(config.gps.path(), "/dev/ttyACM0");
        assert_eq!(config.gps.read_timeout(), Duration::from_millis(250));

        let forward = config.forward.unwrap();
        assert_eq!(forward.path(), "/dev/ttyUSB0");
        assert_eq!(forward.baud_rate(), 57600);
        assert_eq!(forward.read_timeout(), Duration::from_millis(250));

        assert_eq!(config.log_dir, PathBuf::from("/var/log/gnss"));
        assert!(config.verbose);
    }

    #[test]
    fn test_parse_rejects_non_numeric_baud() {
        assert!(Cli::try_parse_from(["gnss-logger", "--baud-rate", "fast"]).is_err());
    }

    #[test]
    fn test_from_cli_maps_capture_settings() {
        let mut cli = create_valid_cli();
        cli.idle_delay_ms = 250;
        cli.reconnect_attempts = 7;
        cli.reconnect_backoff_ms = 100;
        cli.reconnect_max_backoff_ms = 1600;

        let config = Config::from_cli(cli).unwrap();
        assert_eq!(config.capture.idle_delay, Duration::from_millis(250));
        assert_eq!(
            config.capture.reconnect,
            ReconnectPolicy {
                max_attempts: 7,
                initial_backoff: Duration::from_millis(100),
                max_backoff: Duration::from_millis(1600),
            }
        );
    }

    #[test]
    fn test_from_cli_rejects_invalid() {
        let mut cli = create_valid_cli();
        cli.timeout_ms = 0;
        assert!(matches!(Config::from_cli(cli), Err(GnssLoggerError::Config(_))));
    }

    #[test]
    fn test_empty_gps_port() {
        let mut cli = create_valid_cli();
        cli.gps_port = String::new();
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_empty_forward_port() {
        let mut cli = create_valid_cli();
        cli.forward_port = Some(String::new());
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_forward_port_same_as_gps_port() {
        let mut cli = create_valid_cli();
        cli.forward_port = Some(cli.gps_port.clone());
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_distinct_forward_port() {
        let mut cli = create_valid_cli();
        cli.forward_port = Some("/dev/ttyUSB0".to_string());
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut cli = create_valid_cli();
        cli.baud_rate = 420000;
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in SUPPORTED_BAUD_RATES {
            let mut cli = create_valid_cli();
            cli.baud_rate = baud;
            assert!(cli.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_timeout_ms_zero() {
        let mut cli = create_valid_cli();
        cli.timeout_ms = 0;
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_timeout_ms_too_high() {
        let mut cli = create_valid_cli();
        cli.timeout_ms = 10001;
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir() {
        let mut cli = create_valid_cli();
        cli.log_dir = String::new();
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_idle_delay_zero() {
        let mut cli = create_valid_cli();
        cli.idle_delay_ms = 0;
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_idle_delay_too_high() {
        let mut cli = create_valid_cli();
        cli.idle_delay_ms = 60001;
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_reconnect_attempts_zero_allowed() {
        let mut cli = create_valid_cli();
        cli.reconnect_attempts = 0;
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_reconnect_attempts_too_high() {
        let mut cli = create_valid_cli();
        cli.reconnect_attempts = 101;
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_reconnect_backoff_zero() {
        let mut cli = create_valid_cli();
        cli.reconnect_backoff_ms = 0;
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_reconnect_max_backoff_below_initial() {
        let mut cli = create_valid_cli();
        cli.reconnect_backoff_ms = 2000;
        cli.reconnect_max_backoff_ms = 1000;
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_reconnect_max_backoff_too_high() {
        let mut cli = create_valid_cli();
        cli.reconnect_max_backoff_ms = 300001;
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_gps_port(), "/dev/ttyACM0");
        assert_eq!(default_baud_rate(), 115200);
        assert_eq!(default_timeout_ms(), 1000);
        assert_eq!(default_log_dir(), "ublox-gps-log");
        assert_eq!(default_idle_delay_ms(), 1000);
        assert_eq!(default_reconnect_attempts(), 5);
        assert_eq!(default_reconnect_backoff_ms(), 500);
        assert_eq!(default_reconnect_max_backoff_ms(), 8000);
    }

    #[test]
    fn test_defaults_match_library_constants() {
        let config = Config::from_cli(create_valid_cli()).unwrap();
        assert_eq!(config.gps.baud_rate(), crate::serial::DEFAULT_BAUD_RATE);
        assert_eq!(config.gps.read_timeout(), crate::serial::DEFAULT_READ_TIMEOUT);
        assert_eq!(config.capture, CaptureSettings::default());
    }
}
