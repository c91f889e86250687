//! # NMEA Protocol Definitions
//!
//! Constants and types for the GGA (Global Positioning System Fix Data) sentence.
//!
//! Layout of a GGA sentence (fields separated by `,`):
//!
//! | Index | Field                      | Example    |
//! |-------|----------------------------|------------|
//! | 0     | Talker + sentence type     | `$GNGGA`   |
//! | 1     | UTC time                   | `123519`   |
//! | 2     | Latitude `ddmm.mmmm`       | `4807.038` |
//! | 3     | N/S                        | `N`        |
//! | 4     | Longitude `dddmm.mmmm`     | `01137.018`|
//! | 5     | E/W                        | `E`        |
//! | 6     | Fix quality                | `1`        |
//! | 7     | Satellites in use          | `08`       |
//! | 8     | HDOP                       | `0.9`      |
//! | 9-10  | Altitude, unit             | `545.4,M`  |
//! | 11-12 | Geoid separation, unit     | `46.9,M`   |
//! | 13    | Age of differential data   |            |
//! | 14    | Differential station ID    | `*47` follows |

use std::fmt;

/// Identifier of the only sentence this logger decodes
pub const FIX_SENTENCE_ID: &str = "$GNGGA";

/// Number of comma-separated fields in a complete GGA sentence (checksum excluded)
pub const GGA_FIELD_COUNT: usize = 15;

/// Field separator
pub const FIELD_SEPARATOR: char = ',';

/// Start of the checksum suffix
pub const CHECKSUM_DELIMITER: char = '*';

pub const GGA_LATITUDE: usize = 2;
pub const GGA_LATITUDE_HEMISPHERE: usize = 3;
pub const GGA_LONGITUDE: usize = 4;
pub const GGA_LONGITUDE_HEMISPHERE: usize = 5;
pub const GGA_FIX_QUALITY: usize = 6;
pub const GGA_SATELLITES: usize = 7;

/// Position solution decoded from a fix sentence
///
/// Both coordinates are always present; a sentence that cannot produce both
/// never yields a `PositionFix`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionFix {
    /// Decimal degrees, negative in the southern hemisphere
    pub latitude: f64,
    /// Decimal degrees, negative west of Greenwich
    pub longitude: f64,
    /// GGA fix quality indicator (0 = invalid, 1 = GPS, 2 = DGPS, 4 = RTK fixed, ...)
    pub fix_quality: Option<u8>,
    /// Number of satellites used in the solution
    pub satellites: Option<u8>,
}

impl PositionFix {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            fix_quality: None,
            satellites: None,
        }
    }
}

impl fmt::Display for PositionFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Latitude: {:.6}, Longitude: {:.6}", self.latitude, self.longitude)
    }
}

/// Outcome of decoding one line
#[derive(Debug, Clone, PartialEq)]
pub enum Sentence {
    /// The line is the fix sentence and carried a position
    Fix(PositionFix),
    /// The line is some other sentence; nothing to extract
    NotAFix,
}

impl Sentence {
    pub fn fix(&self) -> Option<&PositionFix> {
        match self {
            Sentence::Fix(fix) => Some(fix),
            Sentence::NotAFix => None,
        }
    }
}
