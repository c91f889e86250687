//! # Reopen Policy
//!
//! Bounded exponential backoff for serial ports that faulted during capture.

use std::time::Duration;
use tracing::{info, warn};

use crate::error::{GnssLoggerError, Result};
use crate::serial::SerialSession;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(8);

/// How often and how patiently a failed port is reopened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Attempts before giving up; 0 gives up immediately
    pub max_attempts: u32,
    /// Delay before the first attempt
    pub initial_backoff: Duration,
    /// Upper bound for the doubled delay
    pub max_backoff: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before attempt `attempt` (0-based): `initial * 2^attempt`, capped
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Reopen `session` following `policy`
///
/// # Returns
///
/// * `Ok(n)` - the session is open again after `n` attempts
///
/// # Errors
///
/// Returns [`GnssLoggerError::ReconnectExhausted`] once every attempt failed.
/// The session is left closed.
pub async fn reopen(session: &mut SerialSession, policy: &ReconnectPolicy) -> Result<u32> {
    let path = session.endpoint().path().to_string();
    session.close();

    for attempt in 0..policy.max_attempts {
        let delay = policy.backoff(attempt);
        warn!(
            "Reopening serial port {} in {} ms (attempt {}/{})",
            path,
            delay.as_millis(),
            attempt + 1,
            policy.max_attempts
        );
        tokio::time::sleep(delay).await;

        if session.open().is_ok() {
            info!("Serial port {} is back after {} attempt(s)", path, attempt + 1);
            return Ok(attempt + 1);
        }
    }

    Err(GnssLoggerError::ReconnectExhausted {
        path,
        attempts: policy.max_attempts,
    })
}
