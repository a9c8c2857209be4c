//! # IGC File Names
//!
//! Two naming grammars are in use:
//!
//! - verbose: `YYYY-MM-DD-MFG-AAA-NN.IGC`
//! - compact: `YMDXAAAF.IGC`, where `Y` is the last year digit and `M`, `D`,
//!   `F` (flight of the day) use `1`-`9` then `A`-`Z` for 1..=35
//!
//! Both are parsed back to a timestamp (flight number as the hour) so the
//! oldest log can be found for space reclamation. Names matching neither
//! grammar are older than any parseable name.

use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, NaiveDateTime};

use super::protocol::COMPACT_MANUFACTURER;
use crate::error::{NavLoggerError, Result};
use crate::telemetry::FixTime;

/// Highest flight number of the verbose grammar
pub const MAX_FLIGHTS_VERBOSE: u32 = 99;

/// Highest flight number of the compact grammar
pub const MAX_FLIGHTS_COMPACT: u32 = 35;

/// Encode 0..=35 as a single character (`0`-`9`, then `A`-`Z`)
pub fn num_to_igc_char(n: u32) -> char {
    match n {
        0..=9 => char::from(b'0' + n as u8),
        10..=35 => char::from(b'A' + (n - 10) as u8),
        _ => 'Z',
    }
}

/// Decode a compact-name character; `None` outside `0`-`9`/`A`-`Z`
pub fn igc_char_to_num(c: char) -> Option<u32> {
    match c {
        '0'..='9' => Some(c as u32 - '0' as u32),
        'A'..='Z' => Some(c as u32 - 'A' as u32 + 10),
        _ => None,
    }
}

/// `YYYY-MM-DD-MFG-AAA-NN.IGC`
pub fn verbose_name(date: &FixTime, manufacturer: &str, asset: &str, flight: u32) -> String {
    format!(
        "{:04}-{:02}-{:02}-{}-{}-{:02}.IGC",
        date.year, date.month, date.day, manufacturer, asset, flight
    )
}

/// `YMDXAAAF.IGC`
pub fn compact_name(date: &FixTime, asset: &str, flight: u32) -> String {
    format!(
        "{}{}{}{}{}{}.IGC",
        num_to_igc_char(date.year.rem_euclid(10) as u32),
        num_to_igc_char(date.month.clamp(0, 35) as u32),
        num_to_igc_char(date.day.clamp(0, 35) as u32),
        COMPACT_MANUFACTURER,
        asset,
        num_to_igc_char(flight)
    )
}

/// First log path in `dir` for `date` that does not exist yet
///
/// # Errors
///
/// Returns `NoFreeLogName` when every flight number of the day is taken.
pub fn next_log_path(
    dir: &Path,
    date: &FixTime,
    manufacturer: &str,
    asset: &str,
    compact: bool,
) -> Result<PathBuf> {
    let max = if compact {
        MAX_FLIGHTS_COMPACT
    } else {
        MAX_FLIGHTS_VERBOSE
    };

    for flight in 1..=max {
        let name = if compact {
            compact_name(date, asset, flight)
        } else {
            verbose_name(date, manufacturer, asset, flight)
        };
        let path = dir.join(name);
        if !path.exists() {
            return Ok(path);
        }
    }

    Err(NavLoggerError::NoFreeLogName(dir.to_path_buf()))
}

fn strip_igc_extension(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    ext.eq_ignore_ascii_case("igc").then_some(stem)
}

fn at_flight(year: i32, month: u32, day: u32, flight: u32) -> Option<NaiveDateTime> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.and_hms_opt(0, 0, 0)? + Duration::hours(i64::from(flight)))
}

fn parse_verbose(stem: &str) -> Option<NaiveDateTime> {
    let parts: Vec<&str> = stem.split('-').collect();
    if parts.len() != 6 {
        return None;
    }
    let year: i32 = parts[0].parse().ok()?;
    let month: u32 = parts[1].parse().ok()?;
    let day: u32 = parts[2].parse().ok()?;
    let flight: u32 = parts[5].parse().ok()?;
    at_flight(year, month, day, flight)
}

fn parse_compact(stem: &str, reference_year: i32) -> Option<NaiveDateTime> {
    let chars: Vec<char> = stem.chars().collect();
    if chars.len() != 8 {
        return None;
    }

    let year_digit = chars[0].to_digit(10)? as i32;
    let month = igc_char_to_num(chars[1].to_ascii_uppercase())?;
    let day = igc_char_to_num(chars[2].to_ascii_uppercase())?;
    let flight = igc_char_to_num(chars[7].to_ascii_uppercase())?;

    // The year digit cycles every ten years; pick the most recent year not
    // after the reference year.
    let mut year = reference_year - reference_year.rem_euclid(10) + year_digit;
    if year > reference_year {
        year -= 10;
    }
    at_flight(year, month, day, flight)
}

/// Timestamp embedded in a log file name
///
/// `reference_year` anchors the single year digit of compact names.
/// Returns `None` for names matching neither grammar.
pub fn log_file_date(name: &str, reference_year: i32) -> Option<NaiveDateTime> {
    let stem = strip_igc_extension(name)?;
    parse_verbose(stem).or_else(|| parse_compact(stem, reference_year))
}

/// Age key used for ordering; unparseable names sort before every date
pub fn log_file_age(name: &str, reference_year: i32) -> Option<NaiveDateTime> {
    log_file_date(name, reference_year)
}

/// Whether `candidate` is older than the current `oldest`
pub fn log_file_is_older(oldest: &str, candidate: &str, reference_year: i32) -> bool {
    // `None` orders before any `Some`
    log_file_age(oldest, reference_year) > log_file_age(candidate, reference_year)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn june_first() -> FixTime {
        FixTime::new(2023, 6, 1, 10, 0, 0)
    }

    #[test]
    fn test_igc_char_round_trip() {
        for n in 1..=35 {
            assert_eq!(igc_char_to_num(num_to_igc_char(n)), Some(n));
        }
        assert_eq!(num_to_igc_char(9), '9');
        assert_eq!(num_to_igc_char(10), 'A');
        assert_eq!(num_to_igc_char(35), 'Z');
        assert_eq!(igc_char_to_num('-'), None);
    }

    #[test]
    fn test_verbose_name() {
        assert_eq!(
            verbose_name(&june_first(), "XLK", "ABC", 2),
            "2023-06-01-XLK-ABC-02.IGC"
        );
    }

    #[test]
    fn test_compact_name() {
        assert_eq!(compact_name(&june_first(), "ABC", 2), "361XABC2.IGC");
        let dec = FixTime::new(2030, 12, 31, 0, 0, 0);
        assert_eq!(compact_name(&dec, "DUM", 11), "0CVXDUMB.IGC");
    }

    #[test]
    fn test_verbose_and_compact_compare_equal() {
        let a = log_file_date("2023-06-01-XLK-ABC-02.IGC", 2023).unwrap();
        let b = log_file_date("361XABC2.IGC", 2023).unwrap();
        assert_eq!(a, b);
        assert!(!log_file_is_older("2023-06-01-XLK-ABC-02.IGC", "361XABC2.IGC", 2023));
        assert!(!log_file_is_older("361XABC2.IGC", "2023-06-01-XLK-ABC-02.IGC", 2023));
    }

    #[test]
    fn test_compact_year_wraps_to_previous_decade() {
        // In 2031 a '9' year digit means 2029
        let d = log_file_date("9BDX7B31.IGC", 2031).unwrap();
        assert_eq!(d, at_flight(2029, 11, 13, 1).unwrap());
    }

    #[test]
    fn test_flight_number_orders_same_day() {
        assert!(log_file_is_older(
            "2007-11-05-XXX-AAA-02.IGC",
            "2007-11-05-XXX-AAA-01.IGC",
            2008
        ));
        assert!(!log_file_is_older(
            "2007-11-05-XXX-AAA-01.IGC",
            "2008-01-05-XXX-AAA-01.IGC",
            2008
        ));
    }

    #[test]
    fn test_unparseable_is_oldest() {
        assert!(log_file_date("notes.txt", 2023).is_none());
        assert!(log_file_date("flight.IGC", 2023).is_none());
        assert!(log_file_date("2023-13-01-XLK-ABC-01.IGC", 2023).is_none());
        assert!(log_file_is_older("1980-01-01-XLK-ABC-01.IGC", "garbage.igc", 2023));
        assert!(!log_file_is_older("garbage.igc", "1980-01-01-XLK-ABC-01.IGC", 2023));
    }

    #[test]
    fn test_unparseable_is_older_than_pre_epoch_log() {
        assert!(log_file_is_older("1960-01-01-XLK-ABC-01.IGC", "garbage.igc", 2023));
        assert!(!log_file_is_older("garbage.igc", "1960-01-01-XLK-ABC-01.IGC", 2023));
        assert!(log_file_age("garbage.igc", 2023) < log_file_age("0001-01-01-XLK-ABC-01.IGC", 2023));
    }

    #[test]
    fn test_lower_case_extension() {
        assert!(log_file_date("2023-06-01-XLK-ABC-02.igc", 2023).is_some());
    }

    #[test]
    fn test_next_log_path_skips_existing() {
        let dir = TempDir::new().unwrap();
        let date = june_first();

        let first = next_log_path(dir.path(), &date, "XLK", "ABC", false).unwrap();
        assert!(first.ends_with("2023-06-01-XLK-ABC-01.IGC"));

        std::fs::write(&first, b"").unwrap();
        let second = next_log_path(dir.path(), &date, "XLK", "ABC", false).unwrap();
        assert!(second.ends_with("2023-06-01-XLK-ABC-02.IGC"));
    }

    #[test]
    fn test_next_log_path_exhausted() {
        let dir = TempDir::new().unwrap();
        let date = june_first();
        for flight in 1..=MAX_FLIGHTS_COMPACT {
            std::fs::write(dir.path().join(compact_name(&date, "ABC", flight)), b"").unwrap();
        }
        let result = next_log_path(dir.path(), &date, "XLK", "ABC", true);
        assert!(matches!(result, Err(NavLoggerError::NoFreeLogName(_))));
    }
}
