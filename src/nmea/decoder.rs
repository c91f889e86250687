//! # NMEA Sentence Decoder
//!
//! Decodes the GGA fix sentence into a [`PositionFix`].

use super::protocol::*;
use thiserror::Error;

/// Why a fix sentence could not be decoded
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("expected {expected} fields, got {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("{0} field is empty")]
    EmptyField(&'static str),

    #[error("{field} is not a valid number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("{field} minutes out of range: {value:?}")]
    InvalidMinutes { field: &'static str, value: String },

    #[error("{field} out of range: {value:?}")]
    OutOfRange { field: &'static str, value: String },

    #[error("invalid {field} hemisphere: {value:?}")]
    InvalidHemisphere { field: &'static str, value: String },

    #[error("sentence contains non-ASCII bytes")]
    NonAscii,
}

impl DecodeError {
    /// True when the receiver sent the sentence with empty position fields
    ///
    /// Receivers emit such sentences until they acquire their first fix.
    pub fn is_no_position(&self) -> bool {
        matches!(self, DecodeError::EmptyField(_))
    }
}

/// Convert raw serial bytes to text, replacing anything that is not ASCII
///
/// Never fails: each non-ASCII byte becomes `U+FFFD`.
pub fn decode_ascii_lossy(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { char::REPLACEMENT_CHARACTER })
        .collect()
}

/// Decode one line received from the GNSS receiver
///
/// # Arguments
///
/// * `raw` - One sentence, optionally with a trailing `\r\n` and `*hh` checksum
///
/// # Returns
///
/// * `Ok(Sentence::Fix)` - The line is a GGA fix with both coordinates
/// * `Ok(Sentence::NotAFix)` - Any other sentence type
/// * `Err(DecodeError)` - The line is a GGA sentence but its payload is unusable
///
/// The checksum suffix is stripped but not verified. A GGA sentence carrying
/// bytes that were not ASCII on the wire is rejected as a whole.
///
/// # Examples
///
/// ```
/// use gnss_logger::nmea::{decode, Sentence};
///
/// let sentence = decode("$GNGGA,123519,4807.038,N,01137.018,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n").unwrap();
/// let fix = sentence.fix().unwrap();
/// assert!((fix.latitude - 48.1173).abs() < 1e-4);
///
/// assert_eq!(decode("$GNRMC,123519,A").unwrap(), Sentence::NotAFix);
/// ```
pub fn decode(raw: &str) -> Result<Sentence, DecodeError> {
    let line = raw.trim_end();

    if !line.starts_with(FIX_SENTENCE_ID) {
        return Ok(Sentence::NotAFix);
    }

    let body = line
        .split(CHECKSUM_DELIMITER)
        .next()
        .unwrap_or(line);
    let fields: Vec<&str> = body.split(FIELD_SEPARATOR).collect();

    // "$GNGGAX,..." shares the prefix but is a different sentence
    if fields[0] != FIX_SENTENCE_ID {
        return Ok(Sentence::NotAFix);
    }

    if !line.is_ascii() {
        return Err(DecodeError::NonAscii);
    }

    if fields.len() < GGA_FIELD_COUNT {
        return Err(DecodeError::FieldCount {
            expected: GGA_FIELD_COUNT,
            found: fields.len(),
        });
    }

    let latitude = parse_coordinate("latitude", fields[GGA_LATITUDE], 90.0)?
        * hemisphere_sign("latitude", fields[GGA_LATITUDE_HEMISPHERE], 'N', 'S')?;
    let longitude = parse_coordinate("longitude", fields[GGA_LONGITUDE], 180.0)?
        * hemisphere_sign("longitude", fields[GGA_LONGITUDE_HEMISPHERE], 'E', 'W')?;

    Ok(Sentence::Fix(PositionFix {
        latitude,
        longitude,
        fix_quality: fields[GGA_FIX_QUALITY].parse().ok(),
        satellites: fields[GGA_SATELLITES].parse().ok(),
    }))
}

/// Convert `ddmm.mmmm` / `dddmm.mmmm` into unsigned decimal degrees
fn parse_coordinate(field: &'static str, value: &str, max_degrees: f64) -> Result<f64, DecodeError> {
    if value.is_empty() {
        return Err(DecodeError::EmptyField(field));
    }

    let raw: f64 = value.parse().map_err(|_| DecodeError::InvalidNumber {
        field,
        value: value.to_string(),
    })?;

    if !raw.is_finite() || raw < 0.0 {
        return Err(DecodeError::InvalidNumber {
            field,
            value: value.to_string(),
        });
    }

    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;

    if minutes >= 60.0 {
        return Err(DecodeError::InvalidMinutes {
            field,
            value: value.to_string(),
        });
    }

    let decimal = degrees + minutes / 60.0;
    if decimal > max_degrees {
        return Err(DecodeError::OutOfRange {
            field,
            value: value.to_string(),
        });
    }

    Ok(decimal)
}

fn hemisphere_sign(field: &'static str, value: &str, positive: char, negative: char) -> Result<f64, DecodeError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Err(DecodeError::EmptyField(field)),
        (Some(c), None) if c == positive => Ok(1.0),
        (Some(c), None) if c == negative => Ok(-1.0),
        _ => Err(DecodeError::InvalidHemisphere {
            field,
            value: value.to_string(),
        }),
    }
}
