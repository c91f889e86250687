//! # GNSS Logger
//!
//! Log NMEA position fixes from a GNSS receiver and optionally forward them
//! to an RF telemetry module.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

use gnss_logger::capture::CaptureLoop;
use gnss_logger::config::{Cli, Config};
use gnss_logger::serial::port_trait::TokioSerialOpener;
use gnss_logger::serial::{SerialSession, SharedOpener};
use gnss_logger::telemetry::LogWriter;

/// Console timestamp format
const CONSOLE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Main entry point for GNSS Logger
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Parse and validate the command line
///    - Set up logging with tracing subscriber
///
/// 2. **Capture**
///    - Open the GNSS port (and the RF port when `--forward-port` is given)
///    - Create this run's `.nmea` log file
///    - Log every GGA fix, forward it, report idle periods
///
/// 3. **Graceful Shutdown**
///    - Ctrl+C closes the serial ports and the log file
///    - Print capture totals
///
/// # Errors
///
/// Returns error if:
/// - Arguments are invalid
/// - A serial port cannot be opened (no log file is created)
/// - The log file cannot be created
/// - A failed serial port could not be reopened
///
/// # Examples
///
/// ```bash
/// gnss-logger --gps-port /dev/ttyACM0 --forward-port /dev/ttyUSB0
/// ```
///
/// Expected output:
/// ```text
/// 2024-05-01 12:00:00  INFO gnss_logger::serial: Opened serial port /dev/ttyACM0 at 115200 baudrate.
/// 2024-05-01 12:00:00  INFO gnss_logger::serial: Opened serial port /dev/ttyUSB0 at 115200 baudrate.
/// 2024-05-01 12:00:00  INFO gnss_logger::telemetry::logger: Log file created at ublox-gps-log/2024-05-01_12-00-00.nmea
/// 2024-05-01 12:00:01  INFO gnss_logger::capture: Latitude: 48.117300, Longitude: 11.616967
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_cli(cli).context("Invalid arguments")?;

    // Initialize logging
    let default_level = if config.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let (writer, _log_guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(default_level.into())
        )
        .with_timer(ChronoLocal::new(CONSOLE_TIME_FORMAT.to_string()))
        .with_writer(writer)
        .init();

    info!("GNSS Logger v{} starting...", env!("CARGO_PKG_VERSION"));

    let opener: SharedOpener = Arc::new(TokioSerialOpener);
    let gps = SerialSession::new(config.gps.clone(), Arc::clone(&opener));
    let forward = config
        .forward
        .clone()
        .map(|endpoint| SerialSession::new(endpoint, Arc::clone(&opener)));

    let mut capture = CaptureLoop::new(
        gps,
        forward,
        LogWriter::new(&config.log_dir),
        config.capture,
    );

    info!("Press Ctrl+C to exit");
    let stats = capture
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    info!(
        "Captured {} fixes from {} sentences ({} forwarded, {} idle periods, {} decode errors, {} transport errors, {} reconnects, {} log lines)",
        stats.fixes,
        stats.lines_read,
        stats.forwarded,
        stats.no_data,
        stats.decode_errors,
        stats.transport_errors,
        stats.reconnects,
        stats.log_lines
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_time_format_matches_log_lines() {
        assert_eq!(
            CONSOLE_TIME_FORMAT,
            gnss_logger::telemetry::logger::LINE_TIMESTAMP_FORMAT
        );
    }

    #[test]
    fn test_cli_builds_forwarding_sessions() {
        let cli = Cli::parse_from(["gnss-logger", "--forward-port", "/dev/ttyUSB0"]);
        let config = Config::from_cli(cli).unwrap();

        let opener: SharedOpener = Arc::new(TokioSerialOpener);
        let forward = config
            .forward
            .map(|endpoint| SerialSession::new(endpoint, Arc::clone(&opener)));
        assert_eq!(forward.unwrap().endpoint().path(), "/dev/ttyUSB0");
    }
}
