//! # Device Registry
//!
//! Process-wide table of per-channel statistics and status.
//!
//! The table is sized once at application start. Every accessor takes the
//! channel index and silently ignores indices outside the table, so a channel
//! built with a stale or bogus index can never corrupt another entry.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Open/closed status of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortStatus {
    /// Port open and usable
    Opened,
    /// Port failed (open error or reader terminated)
    OpenKo,
    /// Never opened, or closed
    Closed,
}

impl PortStatus {
    fn to_u8(self) -> u8 {
        match self {
            Self::Closed => 0,
            Self::Opened => 1,
            Self::OpenKo => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Opened,
            2 => Self::OpenKo,
            _ => Self::Closed,
        }
    }
}

#[derive(Debug, Default)]
struct DeviceEntry {
    rx: AtomicU64,
    err_rx: AtomicU64,
    tx: AtomicU64,
    err_tx: AtomicU64,
    status: AtomicU8,
}

/// Copy of one registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceStats {
    pub index: usize,
    pub rx: u64,
    pub err_rx: u64,
    pub tx: u64,
    pub err_tx: u64,
    pub status: PortStatus,
}

/// Bounds-checked table of channel counters
#[derive(Debug)]
pub struct DeviceRegistry {
    devices: Vec<DeviceEntry>,
}

impl DeviceRegistry {
    /// Create a registry for `num_devices` channels, all `Closed` with zero counters
    pub fn new(num_devices: usize) -> Self {
        let devices = (0..num_devices).map(|_| DeviceEntry::default()).collect();
        Self { devices }
    }

    /// Number of slots in the table
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn add_received(&self, index: usize, bytes: u64) {
        if let Some(dev) = self.devices.get(index) {
            dev.rx.fetch_add(bytes, Ordering::Relaxed);
        }
    }

    pub fn add_received_error(&self, index: usize, bytes: u64) {
        if let Some(dev) = self.devices.get(index) {
            dev.err_rx.fetch_add(bytes, Ordering::Relaxed);
        }
    }

    pub fn add_sent(&self, index: usize, bytes: u64) {
        if let Some(dev) = self.devices.get(index) {
            dev.tx.fetch_add(bytes, Ordering::Relaxed);
        }
    }

    pub fn add_sent_error(&self, index: usize, bytes: u64) {
        if let Some(dev) = self.devices.get(index) {
            dev.err_tx.fetch_add(bytes, Ordering::Relaxed);
        }
    }

    pub fn set_status(&self, index: usize, status: PortStatus) {
        if let Some(dev) = self.devices.get(index) {
            dev.status.store(status.to_u8(), Ordering::Release);
        }
    }

    /// Status of a channel, `None` for an index outside the table
    pub fn status(&self, index: usize) -> Option<PortStatus> {
        self.devices
            .get(index)
            .map(|dev| PortStatus::from_u8(dev.status.load(Ordering::Acquire)))
    }

    /// Counters of a channel, `None` for an index outside the table
    pub fn stats(&self, index: usize) -> Option<DeviceStats> {
        self.devices.get(index).map(|dev| DeviceStats {
            index,
            rx: dev.rx.load(Ordering::Relaxed),
            err_rx: dev.err_rx.load(Ordering::Relaxed),
            tx: dev.tx.load(Ordering::Relaxed),
            err_tx: dev.err_tx.load(Ordering::Relaxed),
            status: PortStatus::from_u8(dev.status.load(Ordering::Acquire)),
        })
    }

    /// Counters of every channel, in index order
    pub fn snapshot(&self) -> Vec<DeviceStats> {
        (0..self.devices.len()).filter_map(|i| self.stats(i)).collect()
    }

    /// Return every slot to its initial state (application teardown)
    pub fn reset(&self) {
        for dev in &self.devices {
            dev.rx.store(0, Ordering::Relaxed);
            dev.err_rx.store(0, Ordering::Relaxed);
            dev.tx.store(0, Ordering::Relaxed);
            dev.err_tx.store(0, Ordering::Relaxed);
            dev.status.store(PortStatus::Closed.to_u8(), Ordering::Release);
        }
    }
}
