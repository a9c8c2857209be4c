//! # Flight Recorder
//!
//! Turns the stream of position fixes into an IGC flight log.
//!
//! Until a log file is open, valid fixes are kept in a bounded pre-flight
//! buffer (most recent [`LOGGER_BUFFER_SIZE`] fixes). Once recording has been
//! requested with [`FlightRecorder::start`], the next valid fix opens the log:
//!
//! 1. the file name is derived from that fix's date
//! 2. header records and the task declaration are written
//! 3. buffered fixes are written oldest first, then the fix itself
//!
//! Every later fix is appended immediately. [`FlightRecorder::stop`] closes
//! the file and drops whatever is still buffered.

pub mod declaration;
pub mod space;

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{LoggerConfig, PilotIdentity};
use crate::error::Result;
use crate::igc::protocol::MAX_REMARK_LEN;
use crate::igc::{
    asset_code, declaration_records, header_records, next_log_path, point_record, HeaderInfo,
    IgcWriter,
};
use crate::task::TaskData;
use crate::telemetry::PositionFix;

/// Capacity of the pre-flight buffer
pub const LOGGER_BUFFER_SIZE: usize = 60;

/// Recorder mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    /// Not recording; fixes only feed the pre-flight buffer
    Idle,
    /// Recording requested, waiting for the fix that opens the log
    Buffering,
    /// Log file open, fixes are appended as they arrive
    Active,
}

/// IGC flight recorder
pub struct FlightRecorder {
    config: LoggerConfig,
    identity: PilotIdentity,
    task: Arc<dyn TaskData>,
    buffer: VecDeque<PositionFix>,
    writer: Option<IgcWriter>,
    armed: bool,
    create_log: fn(&Path) -> Result<IgcWriter>,
}

impl std::fmt::Debug for FlightRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightRecorder")
            .field("state", &self.state())
            .field("buffered", &self.buffer.len())
            .field("file", &self.file_path())
            .finish()
    }
}

impl FlightRecorder {
    pub fn new(config: LoggerConfig, identity: PilotIdentity, task: Arc<dyn TaskData>) -> Self {
        Self {
            config,
            identity,
            task,
            buffer: VecDeque::with_capacity(LOGGER_BUFFER_SIZE),
            writer: None,
            armed: false,
            create_log: IgcWriter::create,
        }
    }

    /// Request recording; the log opens on the next valid fix
    pub fn start(&mut self) {
        if !self.armed {
            info!(buffered = self.buffer.len(), "Logger armed");
        }
        self.armed = true;
    }

    /// Close the log and discard buffered fixes
    pub fn stop(&mut self) {
        if let Some(writer) = self.writer.take() {
            info!(
                path = %writer.path().display(),
                records = writer.records(),
                "Logger stopped"
            );
        }
        self.armed = false;
        self.buffer = VecDeque::new();
    }

    pub fn state(&self) -> RecorderState {
        if self.writer.is_some() {
            RecorderState::Active
        } else if self.armed {
            RecorderState::Buffering
        } else {
            RecorderState::Idle
        }
    }

    /// Path of the open log, if any
    pub fn file_path(&self) -> Option<&Path> {
        self.writer.as_ref().map(|w| w.path())
    }

    /// Number of fixes waiting in the pre-flight buffer
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Buffered fixes, oldest first
    pub fn pending(&self) -> impl Iterator<Item = &PositionFix> {
        self.buffer.iter()
    }

    /// Ingest one fix
    ///
    /// Invalid fixes are ignored. Fixes with an out-of-range second are
    /// accepted but never produce a point record.
    ///
    /// # Errors
    ///
    /// Returns error if the log file cannot be created or written. A fix
    /// that could not open the log stays buffered so the next fix retries.
    pub fn log_point(&mut self, fix: &PositionFix) -> Result<()> {
        if !fix.is_valid() {
            return Ok(());
        }

        let mut fix = *fix;
        if self.config.gps_altitude_offset != 0.0 {
            fix.altitude = 0.0;
        }

        // Only start after a first valid fix has been buffered
        if self.armed && self.writer.is_none() && !self.buffer.is_empty() {
            if let Err(e) = self.open_log(&fix) {
                warn!(target: "startup", "Logger start failed: {}", e);
                self.push_buffer(fix);
                return Err(e);
            }
        }

        match self.writer.as_mut() {
            Some(writer) => write_point(writer, &fix),
            None => {
                self.push_buffer(fix);
                Ok(())
            }
        }
    }

    fn push_buffer(&mut self, fix: PositionFix) {
        if self.buffer.len() >= LOGGER_BUFFER_SIZE {
            self.buffer.pop_front();
        }
        self.buffer.push_back(fix);
    }

    fn open_log(&mut self, current: &PositionFix) -> Result<()> {
        fs::create_dir_all(&self.config.log_dir)?;

        let asset = asset_code(&self.identity.pilot_name, &self.identity.aircraft_type);
        let path = next_log_path(
            &self.config.log_dir,
            &current.time,
            &self.config.manufacturer,
            &asset,
            self.config.short_file_names,
        )?;

        let mut writer = (self.create_log)(&path)?;
        if let Err(e) = self.write_preamble(&mut writer, current, &asset) {
            // A partially written log is removed
            if let Err(remove) = writer.discard() {
                warn!(target: "startup", "Cannot remove partial log <{}>: {}", path.display(), remove);
            }
            return Err(e);
        }

        info!(
            path = %path.display(),
            buffered = self.buffer.len(),
            "Logger started"
        );

        self.buffer = VecDeque::new();
        self.writer = Some(writer);
        Ok(())
    }

    /// Header block, task declaration and buffered points
    fn write_preamble(
        &self,
        writer: &mut IgcWriter,
        current: &PositionFix,
        asset: &str,
    ) -> Result<()> {
        let remarks = self.read_remarks();
        let fr_type = format!("NAV-LOGGER {}", std::env::consts::OS.to_ascii_uppercase());
        let header = header_records(&HeaderInfo {
            manufacturer: &self.config.manufacturer,
            asset,
            date: current.time,
            identity: &self.identity,
            fr_type: &fr_type,
            firmware_version: env!("CARGO_PKG_VERSION"),
            baro_available: current.baro_altitude.is_some(),
            gps_altitude_offset: self.config.gps_altitude_offset,
            remarks: &remarks,
        });
        writer.append_all(&header)?;

        // Declaration is dated by the oldest buffered fix
        let first = self
            .buffer
            .front()
            .map(|f| f.time)
            .unwrap_or(current.time);
        let task = self.task.snapshot();
        writer.append_all(declaration_records(&first, &task))?;

        debug!(waypoints = task.waypoints.len(), "Declaration written");

        for fix in &self.buffer {
            write_point(writer, fix)?;
        }
        Ok(())
    }

    /// `HFREMARK` lines from the sidecar file; a missing file means none
    fn read_remarks(&self) -> Vec<String> {
        let path = self.config.log_dir.join(&self.config.extra_headers_file);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No additional headers file <{}>", path.display());
                return Vec::new();
            }
            Err(e) => {
                warn!(target: "startup", "Cannot read headers file <{}>: {}", path.display(), e);
                return Vec::new();
            }
        };

        String::from_utf8_lossy(&bytes)
            .split(['\r', '\n'])
            .map(|line| truncate_at_boundary(line, MAX_REMARK_LEN))
            .filter(|line| line.len() >= 2 && line.starts_with('$'))
            .map(|line| line[1..].to_string())
            .collect()
    }
}

fn truncate_at_boundary(line: &str, max: usize) -> &str {
    if line.len() <= max {
        return line;
    }
    let mut end = max;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

fn write_point(writer: &mut IgcWriter, fix: &PositionFix) -> Result<()> {
    let record = point_record(
        fix.latitude,
        fix.longitude,
        fix.altitude,
        fix.baro_altitude.unwrap_or(0.0),
        fix.time.hour,
        fix.time.minute,
        fix.time.second,
    );
    match record {
        Some(record) => writer.append(&record),
        None => Ok(()),
    }
}
