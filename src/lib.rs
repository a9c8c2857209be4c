//! # Nav Logger Library
//!
//! Telemetry ingestion and IGC flight recording for a navigation instrument.
//!
//! This library provides:
//! - Serial channels with a cancellable background reader that frames
//!   incoming bytes into sentences
//! - A flight recorder that buffers fixes before take-off, then writes
//!   headers, the task declaration and point records to an IGC file
//! - Task declaration to external logger devices
//! - Space reclamation by deleting the oldest flight logs

pub mod config;
pub mod error;
pub mod igc;
pub mod logger;
pub mod logging;
pub mod prompt;
pub mod serial;
pub mod task;
pub mod telemetry;
