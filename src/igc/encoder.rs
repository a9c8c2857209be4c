//! # IGC Record Encoder
//!
//! Builds header (`A`/`H`), declaration (`C`) and point (`B`) records.
//! Every record returned here is a complete line ending in CRLF.

use super::protocol::*;
use crate::config::PilotIdentity;
use crate::task::TaskSnapshot;
use crate::telemetry::FixTime;

/// Everything the header block needs
#[derive(Debug, Clone)]
pub struct HeaderInfo<'a> {
    /// Three-letter manufacturer code
    pub manufacturer: &'a str,
    /// Three-character device id (see [`asset_code`])
    pub asset: &'a str,
    /// Flight date
    pub date: FixTime,
    pub identity: &'a PilotIdentity,
    /// Flight recorder type, e.g. `NAVLOGGER LINUX`
    pub fr_type: &'a str,
    pub firmware_version: &'a str,
    /// Emit the pressure altitude datum record
    pub baro_available: bool,
    /// Non-zero offsets get their own header record
    pub gps_altitude_offset: f64,
    /// Remarks from the sidecar file, without the leading `$`
    pub remarks: &'a [String],
}

/// Encode a point record
///
/// Returns `None` when `second` is outside `0..=59`; such fixes come from a
/// rounding glitch in the time source and are dropped, not reported.
/// GNSS altitude is clamped to `0..=99999`, pressure altitude is written as is.
pub fn point_record(
    latitude: f64,
    longitude: f64,
    altitude: f64,
    baro_altitude: f64,
    hour: i32,
    minute: i32,
    second: i32,
) -> Option<String> {
    if !(0..60).contains(&second) {
        #[cfg(debug_assertions)]
        tracing::debug!(second, "wrong time fix for logger, point skipped");
        return None;
    }

    let lat = encode_latitude(latitude);
    let lon = encode_longitude(longitude);
    let gps_altitude = (altitude as i32).clamp(0, MAX_GPS_ALTITUDE);

    Some(format!(
        "B{:02}{:02}{:02}{:02}{:05.0}{}{:03}{:05.0}{}A{:05}{:05}{}",
        hour,
        minute,
        second,
        lat.degrees,
        lat.milli_minutes,
        lat.hemisphere,
        lon.degrees,
        lon.milli_minutes,
        lon.hemisphere,
        baro_altitude as i32,
        gps_altitude,
        CRLF
    ))
}

/// Derive the three-character device id from the pilot identity
///
/// First two characters of the pilot name (default `DU`), first character of
/// the aircraft type (default `M`), upper-cased; anything that is not
/// alphanumeric becomes `A` so the id is safe inside a file name.
pub fn asset_code(pilot_name: &str, aircraft_type: &str) -> String {
    let pick = |c: Option<char>| match c {
        Some(c) if is_alnum(c) => c.to_ascii_uppercase(),
        _ => 'A',
    };

    let mut code = String::with_capacity(3);
    if pilot_name.is_empty() {
        code.push_str("DU");
    } else {
        let mut chars = pilot_name.chars();
        code.push(pick(chars.next()));
        code.push(pick(chars.next()));
    }
    if aircraft_type.is_empty() {
        code.push('M');
    } else {
        code.push(pick(aircraft_type.chars().next()));
    }
    code
}

/// Header block, in the order the records must appear
pub fn header_records(info: &HeaderInfo<'_>) -> Vec<String> {
    let id = info.identity;
    let mut records = vec![
        // Recorder id must go first
        format!("A{}{}{}", info.manufacturer, info.asset, CRLF),
        format!(
            "HFDTE{:02}{:02}{:02}{}",
            info.date.day,
            info.date.month,
            info.date.year % 100,
            CRLF
        ),
        format!("HFPLTPILOT:{}{}", id.pilot_name, CRLF),
        format!("HFGTYGLIDERTYPE:{}{}", id.aircraft_type, CRLF),
        format!("HFGIDGLIDERID:{}{}", id.aircraft_rego, CRLF),
        format!("HFCCLCOMPETITIONCLASS:{}{}", id.competition_class, CRLF),
        format!("HFCIDCOMPETITIONID:{}{}", id.competition_id, CRLF),
        format!("HFFTYFRTYPE:{}{}", info.fr_type, CRLF),
        format!("HFRFWFIRMWAREVERSION:{}{}", info.firmware_version, CRLF),
        format!("{}{}", HEADER_ALT_GPS, CRLF),
    ];

    if info.baro_available {
        records.push(format!("{}{}", HEADER_ALT_PRESSURE, CRLF));
    }

    records.push(format!("{}{}", HEADER_DATUM, CRLF));

    if info.gps_altitude_offset != 0.0 {
        records.push(format!(
            "HFGPSALTITUDEOFFSET: {:+.0}{}",
            info.gps_altitude_offset, CRLF
        ));
    }

    records.extend(info.remarks.iter().map(|r| format!("HFREMARK:{}{}", r, CRLF)));
    records
}

/// Declaration start record: date/time of the first fix and turnpoint count
pub fn declaration_start(first: &FixTime, waypoint_count: usize) -> String {
    format!(
        "C{:02}{:02}{:02}{:02}{:02}{:02}0000000000{:02}{}",
        first.day,
        first.month,
        first.year % 100,
        first.hour,
        first.minute,
        first.second,
        waypoint_count as i64 - 2,
        CRLF
    )
}

/// One declared waypoint
pub fn declaration_point(latitude: f64, longitude: f64, name: &str) -> String {
    format!(
        "C{}{}{}{}",
        format_latitude(latitude),
        format_longitude(longitude),
        to_us_ascii(name),
        CRLF
    )
}

/// Complete declaration bracket for a task snapshot
///
/// Start record, takeoff (home or sentinel), every task point in order,
/// landing (home or sentinel).
pub fn declaration_records(first: &FixTime, task: &TaskSnapshot) -> Vec<String> {
    let home = task
        .home
        .as_ref()
        .map(|wp| declaration_point(wp.latitude, wp.longitude, &wp.name));

    let mut records = Vec::with_capacity(task.waypoints.len() + 3);
    records.push(declaration_start(first, task.waypoints.len()));
    records.push(
        home.clone()
            .unwrap_or_else(|| format!("{}{}", DECL_TAKEOFF_SENTINEL, CRLF)),
    );
    records.extend(
        task.waypoints
            .iter()
            .map(|wp| declaration_point(wp.latitude, wp.longitude, &wp.name)),
    );
    records.push(home.unwrap_or_else(|| format!("{}{}", DECL_LANDING_SENTINEL, CRLF)));
    records
}
