//! # Telemetry Module
//!
//! Shared data types crossing the boundary between the channel readers and
//! the flight recorder.
//!
//! This module handles:
//! - Position fixes (coordinates, altitudes and the UTC time they were taken)
//! - The shared navigation state written by sentence decoders
//! - The sentence decoder contract invoked from reader tasks

use std::sync::{Arc, RwLock};

/// UTC timestamp of a fix, decomposed as received from the GNSS
///
/// Fields are kept as plain integers because devices occasionally report
/// out-of-range values (e.g. `second == 60` after millisecond rounding) and the
/// recorder must be able to see and drop those.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixTime {
    pub day: i32,
    pub month: i32,
    pub year: i32,
    pub hour: i32,
    pub minute: i32,
    pub second: i32,
}

impl FixTime {
    /// Build a timestamp from date and time components
    pub fn new(year: i32, month: i32, day: i32, hour: i32, minute: i32, second: i32) -> Self {
        Self {
            day,
            month,
            year,
            hour,
            minute,
            second,
        }
    }
}

/// One decoded position + time sample
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PositionFix {
    /// Latitude in signed degrees (north positive)
    pub latitude: f64,

    /// Longitude in signed degrees (east positive)
    pub longitude: f64,

    /// GNSS altitude in metres
    pub altitude: f64,

    /// Pressure (QNE) altitude in metres, when the device provides one
    pub baro_altitude: Option<f64>,

    /// UTC time of the fix
    pub time: FixTime,

    /// Set when the receiver flags the navigation solution as invalid
    pub nav_warning: bool,
}

impl PositionFix {
    /// A valid fix at the given position and time
    pub fn new(latitude: f64, longitude: f64, altitude: f64, time: FixTime) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
            baro_altitude: None,
            time,
            nav_warning: false,
        }
    }

    /// Attach a pressure altitude
    pub fn with_baro_altitude(mut self, baro_altitude: f64) -> Self {
        self.baro_altitude = Some(baro_altitude);
        self
    }

    /// Whether this fix may be recorded
    pub fn is_valid(&self) -> bool {
        !self.nav_warning
    }
}

/// Latest navigation data published by the sentence decoders
#[derive(Debug, Clone, Default)]
pub struct NavigationState {
    /// Most recent fix, if any device produced one
    pub fix: Option<PositionFix>,

    /// Incremented every time `fix` is replaced
    pub sequence: u64,
}

impl NavigationState {
    /// Replace the current fix and bump the sequence number
    pub fn publish(&mut self, fix: PositionFix) {
        self.fix = Some(fix);
        self.sequence = self.sequence.wrapping_add(1);
    }
}

/// Navigation state shared between reader tasks and the processing loop
pub type SharedNavigation = Arc<RwLock<NavigationState>>;

/// Contract of the device-specific sentence decoder
///
/// Reader tasks of different channels call into the same decoder
/// concurrently, hence `Send + Sync`.
pub trait SentenceDecoder: Send + Sync {
    /// Offer raw bytes to stream-oriented devices before line framing
    ///
    /// Returns `true` when the bytes were consumed.
    fn parse_stream(&self, _port: usize, _bytes: &[u8]) -> bool {
        false
    }

    /// Decode one complete line (terminated by a single `\n`)
    ///
    /// Returns `true` when the line was recognised.
    fn parse_sentence(&self, port: usize, line: &str, navigation: &SharedNavigation) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_validity() {
        let mut fix = PositionFix::new(45.5, -122.25, 300.0, FixTime::new(2023, 6, 1, 12, 0, 0));
        assert!(fix.is_valid());

        fix.nav_warning = true;
        assert!(!fix.is_valid());
    }

    #[test]
    fn test_publish_bumps_sequence() {
        let mut state = NavigationState::default();
        assert!(state.fix.is_none());

        let fix = PositionFix::new(1.0, 2.0, 3.0, FixTime::default()).with_baro_altitude(4.0);
        state.publish(fix);
        state.publish(fix);

        assert_eq!(state.sequence, 2);
        assert_eq!(state.fix.and_then(|f| f.baro_altitude), Some(4.0));
    }
}
