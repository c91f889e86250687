//! # NMEA Sentence Module
//!
//! Decoding of the GGA position-fix sentence emitted by the GNSS receiver.
//!
//! This module handles:
//! - Turning raw serial bytes into sentence text (lossy ASCII)
//! - Recognizing the fix sentence by its talker/type prefix
//! - Extracting latitude/longitude in decimal degrees

pub mod protocol;
pub mod decoder;

pub use decoder::{decode, decode_ascii_lossy, DecodeError};
pub use protocol::{PositionFix, Sentence};
