//! # Telemetry Module
//!
//! Handles persisting received NMEA sentences to per-run log files.
//!
//! This module handles:
//! - Creating the log directory on first use
//! - Naming one `.nmea` file per run from the run start time
//! - Appending capture-timestamped lines

pub mod logger;

pub use logger::{LogSession, LogWriter};
