//! # Capture Loop
//!
//! Reads sentences from the GNSS receiver, logs every position fix and, when a
//! forwarding port is configured, retransmits the fix to the RF module.
//!
//! ```text
//! Starting ──open failure──────────────────────────┐
//!    │                                             ▼
//!    └──► Running ──interrupt / fatal error──► Draining ──► Stopped
//! ```
//!
//! Per-sentence and per-iteration faults (timeouts, decode errors, transport
//! errors) never leave `Running`. A faulted port is reopened at the start of the
//! next iteration using the [`ReconnectPolicy`]; running out of attempts is fatal.

pub mod reconnect;

use std::future::Future;
use std::path::Path;
use std::time::Duration;
use chrono::{DateTime, Local};
use tracing::{debug, error, info, trace, warn};

use crate::error::Result;
use crate::nmea::{self, Sentence};
use crate::serial::{RawSentence, ReadOutcome, SerialSession};
use crate::telemetry::{LogSession, LogWriter};
pub use reconnect::{reopen, ReconnectPolicy};

/// Console and log marker for a read timeout
pub const NO_DATA_MARKER: &str = "RX: No GPS data coming in. No data received.";

/// Pause after a read timeout before reading again
pub const DEFAULT_IDLE_DELAY: Duration = Duration::from_secs(1);

/// Loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Starting,
    Running,
    Draining,
    Stopped,
}

/// Tunables of the capture loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    pub idle_delay: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            idle_delay: DEFAULT_IDLE_DELAY,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// Counters reported when the run ends
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub lines_read: u64,
    pub fixes: u64,
    pub no_data: u64,
    pub decode_errors: u64,
    pub transport_errors: u64,
    pub forwarded: u64,
    pub reconnects: u64,
    /// Lines in this run's log file, fixes and no-data markers alike
    pub log_lines: u64,
}

/// Read-decode-log-forward cycle for one run
#[derive(Debug)]
pub struct CaptureLoop {
    gps: SerialSession,
    forward: Option<SerialSession>,
    log_writer: LogWriter,
    log: Option<LogSession>,
    settings: CaptureSettings,
    state: LoopState,
    stats: CaptureStats,
}

impl CaptureLoop {
    /// Build a loop; no port or file is touched until [`run`](Self::run)
    ///
    /// Passing a `forward` session enables forwarding.
    pub fn new(
        gps: SerialSession,
        forward: Option<SerialSession>,
        log_writer: LogWriter,
        settings: CaptureSettings,
    ) -> Self {
        Self {
            gps,
            forward,
            log_writer,
            log: None,
            settings,
            state: LoopState::Starting,
            stats: CaptureStats::default(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }

    pub fn gps(&self) -> &SerialSession {
        &self.gps
    }

    pub fn forward(&self) -> Option<&SerialSession> {
        self.forward.as_ref()
    }

    /// Path of this run's log file, once it has been created
    pub fn log_path(&self) -> Option<&Path> {
        self.log.as_ref().map(LogSession::file_path)
    }

    /// Run until `shutdown` completes or a fatal error occurs
    ///
    /// `shutdown` is checked before every iteration and also cancels a pending
    /// read or idle pause. Every port and the log file are closed before this
    /// returns, whatever the outcome.
    ///
    /// # Errors
    ///
    /// * [`GnssLoggerError::Open`](crate::error::GnssLoggerError::Open) - a port
    ///   could not be opened at startup; no log file is created
    /// * [`GnssLoggerError::LogFile`](crate::error::GnssLoggerError::LogFile) - the
    ///   log file could not be created
    /// * [`GnssLoggerError::ReconnectExhausted`](crate::error::GnssLoggerError::ReconnectExhausted)
    ///   - a faulted port could not be reopened
    pub async fn run<F>(&mut self, shutdown: F) -> Result<CaptureStats>
    where
        F: Future<Output = ()>,
    {
        self.state = LoopState::Starting;
        if let Err(e) = self.start() {
            error!("Startup failed: {}. Exiting...", e);
            self.drain();
            return Err(e);
        }

        self.state = LoopState::Running;
        info!("Capturing NMEA from {}", self.gps.endpoint().path());
        if let Some(forward) = &self.forward {
            info!("Forwarding position fixes to {}", forward.endpoint().path());
        }

        tokio::pin!(shutdown);
        let outcome = loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Keyboard interrupt detected, Exiting ...");
                    break Ok(());
                }

                result = self.step() => {
                    if let Err(e) = result {
                        error!("Capture stopped: {}", e);
                        break Err(e);
                    }
                }
            }
        };

        self.drain();
        outcome.map(|()| self.stats.clone())
    }

    /// Open every required port, then the log file
    fn start(&mut self) -> Result<()> {
        self.gps.open()?;
        if let Some(forward) = self.forward.as_mut() {
            forward.open()?;
        }
        self.log = Some(self.log_writer.start()?);
        Ok(())
    }

    /// One iteration of the running state
    async fn step(&mut self) -> Result<()> {
        if !self.gps.is_alive() {
            reopen(&mut self.gps, &self.settings.reconnect).await?;
            self.stats.reconnects += 1;
        }

        match self.gps.read_line().await {
            Ok(ReadOutcome::NoData) => self.on_no_data().await,
            Ok(ReadOutcome::Line(sentence)) => self.on_sentence(sentence).await?,
            Err(e) => {
                self.stats.transport_errors += 1;
                error!("Serial Error: {}", e);
            }
        }

        Ok(())
    }

    async fn on_no_data(&mut self) {
        self.stats.no_data += 1;
        info!("{}", NO_DATA_MARKER);
        self.append_log(NO_DATA_MARKER, Local::now());
        tokio::time::sleep(self.settings.idle_delay).await;
    }

    async fn on_sentence(&mut self, sentence: RawSentence) -> Result<()> {
        self.stats.lines_read += 1;
        let text = sentence.trimmed();
        debug!("RX: {}", text);

        match nmea::decode(text) {
            Ok(Sentence::Fix(fix)) => {
                self.stats.fixes += 1;
                info!("{}", fix);
                self.append_log(text, sentence.received_at);
                self.forward_sentence(&sentence).await?;
            }
            Ok(Sentence::NotAFix) => trace!("Skipping non-fix sentence"),
            Err(e) if e.is_no_position() => {
                self.stats.decode_errors += 1;
                debug!("Fix sentence without position ({}): {}", e, text);
            }
            Err(e) => {
                self.stats.decode_errors += 1;
                warn!("NMEA Parse error: {}: {}", e, text);
            }
        }

        Ok(())
    }

    fn append_log(&mut self, line: &str, at: DateTime<Local>) {
        if let Some(log) = self.log.as_mut() {
            if let Err(e) = log.append_at(line, at) {
                error!("Error: {}", e);
            }
        }
    }

    /// Send the sentence to the RF module exactly as received
    async fn forward_sentence(&mut self, sentence: &RawSentence) -> Result<()> {
        let Some(forward) = self.forward.as_mut() else {
            return Ok(());
        };

        if !forward.is_alive() {
            reopen(forward, &self.settings.reconnect).await?;
            self.stats.reconnects += 1;
        }

        match forward.write_line(&sentence.text).await {
            Ok(()) => {
                self.stats.forwarded += 1;
                debug!("Transmitted GPS data to RF module: {}", sentence.trimmed());
            }
            Err(e) => {
                self.stats.transport_errors += 1;
                error!("Serial Error: {}", e);
            }
        }

        Ok(())
    }

    /// Close GPS port, forward port, then the log file
    fn drain(&mut self) {
        self.state = LoopState::Draining;

        self.gps.close();
        if let Some(forward) = self.forward.as_mut() {
            forward.close();
        }
        if let Some(log) = self.log.as_mut() {
            if log.is_open() {
                self.stats.log_lines = log.lines_written();
                info!("Wrote {} lines to {}", log.lines_written(), log.file_path().display());
            }
            if let Err(e) = log.close() {
                error!("Error: {}", e);
            }
        }

        self.state = LoopState::Stopped;
    }
}
