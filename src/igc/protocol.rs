//! # IGC Protocol Constants and Types
//!
//! Record prefixes and the coordinate encoding shared by point (`B`) and
//! declaration (`C`) records.

/// Default three-letter manufacturer code
pub const DEFAULT_MANUFACTURER: &str = "XLK";

/// Manufacturer character used by compact file names
pub const COMPACT_MANUFACTURER: char = 'X';

/// Record terminator
pub const CRLF: &str = "\r\n";

/// Pressure altitude datum header
pub const HEADER_ALT_PRESSURE: &str = "HFALPALTPRESSURE:ISA";

/// GNSS altitude datum header
pub const HEADER_ALT_GPS: &str = "HFALGALTGPS:GEO";

/// Fixed geodetic datum header
pub const HEADER_DATUM: &str = "HFDTM100GPSDATUM:WGS-84";

/// Takeoff sentinel used when no home waypoint exists
pub const DECL_TAKEOFF_SENTINEL: &str = "C0000000N00000000ETAKEOFF";

/// Landing sentinel used when no home waypoint exists
pub const DECL_LANDING_SENTINEL: &str = "C0000000N00000000ELANDING";

/// GNSS altitude range representable in a point record
pub const MAX_GPS_ALTITUDE: i32 = 99_999;

/// Longest sidecar remark line copied into the header
pub const MAX_REMARK_LEN: usize = 100;

/// One coordinate axis in IGC form: whole degrees, minutes x 1000, hemisphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IgcAngle {
    pub degrees: i32,
    /// Minutes scaled by 1000, not yet rounded
    pub milli_minutes: f64,
    pub hemisphere: char,
}

/// Split a signed angle into degrees, scaled minutes and a hemisphere letter
///
/// `positive`/`negative` are the hemisphere letters (`N`/`S` or `E`/`W`).
/// The sign is folded into the letter and both parts are made non-negative.
pub fn encode_angle(value: f64, positive: char, negative: char) -> IgcAngle {
    let mut degrees = value.trunc() as i32;
    let mut minutes = value - value.trunc();
    let mut hemisphere = positive;

    if minutes < 0.0 || (minutes == 0.0 && degrees < 0) {
        hemisphere = negative;
        degrees = -degrees;
        minutes = -minutes;
    }

    IgcAngle {
        degrees,
        milli_minutes: minutes * 60.0 * 1000.0,
        hemisphere,
    }
}

/// Latitude as `N`/`S`
pub fn encode_latitude(latitude: f64) -> IgcAngle {
    encode_angle(latitude, 'N', 'S')
}

/// Longitude as `E`/`W`
pub fn encode_longitude(longitude: f64) -> IgcAngle {
    encode_angle(longitude, 'E', 'W')
}

/// `DDMMMMMh`, as used for latitudes
pub fn format_latitude(latitude: f64) -> String {
    let a = encode_latitude(latitude);
    format!("{:02}{:05.0}{}", a.degrees, a.milli_minutes, a.hemisphere)
}

/// `DDDMMMMMh`, as used for longitudes
pub fn format_longitude(longitude: f64) -> String {
    let a = encode_longitude(longitude);
    format!("{:03}{:05.0}{}", a.degrees, a.milli_minutes, a.hemisphere)
}

/// Whether `c` is an ASCII letter or digit
pub fn is_alnum(c: char) -> bool {
    c.is_ascii_alphanumeric()
}

/// Replace every non-ASCII character so the record stays 7-bit clean
pub fn to_us_ascii(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .collect()
}
