//! # GNSS Logger Library
//!
//! Capture NMEA position fixes from a u-blox GNSS receiver over serial.
//!
//! This library provides the core functionality for reading GGA sentences,
//! persisting them to per-run log files and forwarding them to an RF telemetry
//! module on a second serial port.

pub mod capture;
pub mod config;
pub mod error;
pub mod nmea;
pub mod serial;
pub mod telemetry;
