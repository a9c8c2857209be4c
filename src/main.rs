//! # Nav Logger
//!
//! Reads instrument sentences from serial ports and records the flight as an
//! IGC log.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (first argument, default `config/default.toml`)
//!    - Set up console and startup-trail logging
//!    - Open every enabled port and start its reader task
//!    - Reclaim storage and arm the flight recorder
//!
//! 2. **Main Loop**
//!    - Once per second, feed the latest navigation fix to the recorder
//!    - Handle Ctrl+C for graceful shutdown
//!
//! 3. **Graceful Shutdown**
//!    - Close the flight log
//!    - Stop every reader task
//!    - Log final port statistics

use std::sync::{Arc, RwLock};

use anyhow::Result;
use chrono::{Datelike, Utc};
use tokio::time::{interval, Duration};
use tracing::{debug, info, trace, warn};

use nav_logger::config::Config;
use nav_logger::logger::space::{SpaceReclaimer, SystemFreeSpace};
use nav_logger::logger::FlightRecorder;
use nav_logger::logging::init_logging;
use nav_logger::prompt::{LogPrompt, UserPrompt};
use nav_logger::serial::registry::DeviceRegistry;
use nav_logger::serial::{Channel, ReaderContext};
use nav_logger::task::{TaskData, TaskStore};
use nav_logger::telemetry::{NavigationState, SentenceDecoder, SharedNavigation};

/// Configuration used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Rate at which fixes are handed to the recorder
const FIX_INTERVAL_MS: u64 = 1000;

/// Decoder that only traces what it receives
///
/// Device-specific decoding is plugged in by the host application.
struct SentenceTrace;

impl SentenceDecoder for SentenceTrace {
    fn parse_sentence(&self, port: usize, line: &str, _navigation: &SharedNavigation) -> bool {
        trace!(port, sentence = line.trim_end(), "rx");
        is_nmea_sentence(line)
    }
}

/// `$`-prefixed line carrying a `*` checksum separator
fn is_nmea_sentence(line: &str) -> bool {
    line.starts_with('$') && line.contains('*')
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)?;

    let _logging = init_logging(&config.logging)?;
    info!("Nav Logger v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", config_path);

    let ports: Vec<_> = config.enabled_ports().collect();
    let registry = Arc::new(DeviceRegistry::new(ports.len()));
    let navigation: SharedNavigation = Arc::new(RwLock::new(NavigationState::default()));
    let prompt: Arc<dyn UserPrompt> = Arc::new(LogPrompt::new(true));

    let ctx = ReaderContext {
        registry: registry.clone(),
        decoder: Arc::new(SentenceTrace),
        navigation: navigation.clone(),
    };

    let mut channels = Vec::with_capacity(ports.len());
    for (index, port) in ports.iter().enumerate() {
        match Channel::open_serial(index, port, ctx.clone()) {
            Ok(channel) => {
                let mut channel = channel.with_notifier(prompt.clone());
                if channel.start_reader().await {
                    info!("Reader started on {}", channel.name());
                }
                channels.push(channel);
            }
            Err(e) => warn!("{}", e),
        }
    }

    let mut recorder = if config.logger.enabled {
        let reclaimer = SpaceReclaimer::from_config(&config.logger);
        if !reclaimer.clear_free_space(&SystemFreeSpace, Utc::now().year()) {
            warn!("Low storage, flight log may not be written");
        }

        let task: Arc<dyn TaskData> = Arc::new(TaskStore::new());
        let mut recorder = FlightRecorder::new(config.logger.clone(), config.pilot.clone(), task);
        if config.logger.auto_start {
            recorder.start();
        }
        Some(recorder)
    } else {
        info!("Flight recorder disabled");
        None
    };

    let mut fix_interval = interval(Duration::from_millis(FIX_INTERVAL_MS));
    let mut last_sequence = 0;

    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = fix_interval.tick() => {
                let (sequence, fix) = match navigation.read() {
                    Ok(nav) => (nav.sequence, nav.fix),
                    Err(poisoned) => {
                        let nav = poisoned.into_inner();
                        (nav.sequence, nav.fix)
                    }
                };
                if sequence == last_sequence {
                    continue;
                }
                last_sequence = sequence;

                if let (Some(recorder), Some(fix)) = (recorder.as_mut(), fix) {
                    if let Err(e) = recorder.log_point(&fix) {
                        debug!("Fix not recorded: {}", e);
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    if let Some(recorder) = recorder.as_mut() {
        recorder.stop();
    }
    for channel in channels.iter_mut() {
        channel.close().await;
    }

    match serde_json::to_string(&registry.snapshot()) {
        Ok(stats) => info!(stats = %stats, "Final port statistics"),
        Err(e) => warn!("Could not serialize port statistics: {}", e),
    }

    Ok(())
}
