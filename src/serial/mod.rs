//! # Serial Communication Module
//!
//! Handles the serial links to the GNSS receiver and the forwarding radio.
//!
//! This module handles:
//! - Opening serial ports at the configured baud rate
//! - Assembling received bytes into NMEA lines with a read timeout
//! - Writing sentences to the forwarding port
//! - Tracking whether a port is open, closed or failed

pub mod port_trait;

use bytes::BytesMut;
use chrono::{DateTime, Local};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{GnssLoggerError, Result};
use crate::nmea::decode_ascii_lossy;
use port_trait::{PortOpener, SerialPortIO};

/// Default baud rate for u-blox receivers configured for high-rate NMEA output
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default read timeout
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// A line that grows past this without a newline is handed over as-is
pub const MAX_LINE_LENGTH: usize = 1024;

/// Bytes requested from the port per read call
const READ_CHUNK_SIZE: usize = 256;

/// Shared handle to whatever opens the serial ports
pub type SharedOpener = Arc<dyn PortOpener + Send + Sync>;

/// One serial device reachable at a path and baud rate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialEndpoint {
    path: String,
    baud_rate: u32,
    read_timeout: Duration,
}

impl SerialEndpoint {
    pub fn new(path: impl Into<String>, baud_rate: u32, read_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            read_timeout,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}

/// Lifecycle state of a [`SerialSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Open,
    /// A transport fault was seen; the handle is gone until the next `open`
    Failed,
}

/// One line of text as received from the device
#[derive(Debug, Clone, PartialEq)]
pub struct RawSentence {
    /// Text including whatever terminator the device sent
    pub text: String,
    pub received_at: DateTime<Local>,
}

impl RawSentence {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            received_at: Local::now(),
        }
    }

    /// Sentence text without the line terminator
    pub fn trimmed(&self) -> &str {
        self.text.trim_end()
    }
}

/// Result of waiting for one line
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Line(RawSentence),
    /// Read timeout expired without any bytes
    NoData,
}

/// Serial session for one endpoint
///
/// Owns the port handle exclusively. The handle is released by [`close`](Self::close),
/// by a transport fault, or when the session is dropped.
pub struct SerialSession {
    endpoint: SerialEndpoint,
    opener: SharedOpener,
    port: Option<Box<dyn SerialPortIO>>,
    state: ConnectionState,
    buffer: BytesMut,
}

impl std::fmt::Debug for SerialSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialSession")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl SerialSession {
    /// Create a closed session; nothing is opened until [`open`](Self::open)
    pub fn new(endpoint: SerialEndpoint, opener: SharedOpener) -> Self {
        Self {
            endpoint,
            opener,
            port: None,
            state: ConnectionState::Closed,
            buffer: BytesMut::with_capacity(MAX_LINE_LENGTH),
        }
    }

    pub fn endpoint(&self) -> &SerialEndpoint {
        &self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Open the port at the configured baud rate and timeout
    ///
    /// A no-op when already open. A failed session drops its stale handle and
    /// reopens.
    ///
    /// # Errors
    ///
    /// Returns [`GnssLoggerError::Open`] if the device is missing, inaccessible or
    /// busy. The session is left `Closed`.
    pub fn open(&mut self) -> Result<()> {
        if self.is_alive() {
            return Ok(());
        }

        self.port = None;
        self.buffer.clear();

        match self.opener.open(&self.endpoint) {
            Ok(port) => {
                self.port = Some(port);
                self.state = ConnectionState::Open;
                info!(
                    "Opened serial port {} at {} baudrate.",
                    self.endpoint.path, self.endpoint.baud_rate
                );
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Closed;
                warn!("Error opening serial port {}: {}", self.endpoint.path, e);
                Err(GnssLoggerError::Open {
                    path: self.endpoint.path.clone(),
                    source: e,
                })
            }
        }
    }

    /// Wait up to the read timeout for one line
    ///
    /// Bytes after the first newline stay buffered for the next call. If the
    /// timeout expires with a partial line buffered, the partial line is
    /// returned.
    ///
    /// # Errors
    ///
    /// * [`GnssLoggerError::NotOpen`] - session is closed or failed
    /// * [`GnssLoggerError::Transport`] - I/O fault or end of stream; the session
    ///   moves to `Failed`
    pub async fn read_line(&mut self) -> Result<ReadOutcome> {
        let deadline = tokio::time::Instant::now() + self.endpoint.read_timeout;
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        loop {
            if let Some(line) = self.take_line() {
                return Ok(ReadOutcome::Line(line));
            }

            if self.state != ConnectionState::Open {
                return Err(GnssLoggerError::NotOpen(self.endpoint.path.clone()));
            }
            let Some(port) = self.port.as_mut() else {
                return Err(GnssLoggerError::NotOpen(self.endpoint.path.clone()));
            };

            let result = tokio::time::timeout_at(deadline, port.read(&mut chunk)).await;
            match result {
                Err(_elapsed) => return Ok(self.take_partial()),
                Ok(Ok(0)) => {
                    return Err(self.fail(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "device closed the stream",
                    )))
                }
                Ok(Ok(n)) => self.buffer.extend_from_slice(&chunk[..n]),
                Ok(Err(e)) => return Err(self.fail(e)),
            }
        }
    }

    /// Write `text` to the port exactly as given and flush
    ///
    /// No terminator is added; callers pass the sentence as it was received.
    ///
    /// # Errors
    ///
    /// * [`GnssLoggerError::NotOpen`] - session is closed or failed
    /// * [`GnssLoggerError::Transport`] - write or flush failed; the session moves
    ///   to `Failed`
    pub async fn write_line(&mut self, text: &str) -> Result<()> {
        if self.state != ConnectionState::Open {
            return Err(GnssLoggerError::NotOpen(self.endpoint.path.clone()));
        }
        let Some(port) = self.port.as_mut() else {
            return Err(GnssLoggerError::NotOpen(self.endpoint.path.clone()));
        };

        let mut result = port.write_all(text.as_bytes()).await;
        if result.is_ok() {
            result = port.flush().await;
        }

        match result {
            Ok(()) => {
                debug!("TX {} ({} bytes)", self.endpoint.path, text.len());
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// True when the port is open and has not faulted
    pub fn is_alive(&self) -> bool {
        self.state == ConnectionState::Open && self.port.is_some()
    }

    /// Release the port
    ///
    /// Idempotent: closing a closed or failed session does nothing.
    pub fn close(&mut self) {
        if self.port.take().is_some() {
            info!("Closed serial port {}.", self.endpoint.path);
        }
        self.buffer.clear();
        self.state = ConnectionState::Closed;
    }

    fn fail(&mut self, source: io::Error) -> GnssLoggerError {
        self.port = None;
        self.buffer.clear();
        self.state = ConnectionState::Failed;
        GnssLoggerError::Transport {
            path: self.endpoint.path.clone(),
            source,
        }
    }

    /// Split off the first complete line, or an overlong unterminated one
    fn take_line(&mut self) -> Option<RawSentence> {
        let end = match self.buffer.iter().position(|&b| b == b'\n') {
            Some(pos) => pos + 1,
            None if self.buffer.len() >= MAX_LINE_LENGTH => MAX_LINE_LENGTH,
            None => return None,
        };
        let bytes = self.buffer.split_to(end);
        Some(RawSentence::new(decode_ascii_lossy(&bytes)))
    }

    fn take_partial(&mut self) -> ReadOutcome {
        if self.buffer.is_empty() {
            return ReadOutcome::NoData;
        }
        let bytes = self.buffer.split();
        ReadOutcome::Line(RawSentence::new(decode_ascii_lossy(&bytes)))
    }
}

impl Drop for SerialSession {
    fn drop(&mut self) {
        self.close();
    }
}
