//! # Serial Communication Module
//!
//! Owns the full-duplex byte channels to external devices.
//!
//! This module handles:
//! - Opening serial ports with NMEA-style 8N1 settings
//! - A background reader task per channel, framing bytes into sentences
//! - Cooperative cancellation of a reader blocked on a read
//! - Write path and per-channel statistics

pub mod framing;
pub mod port_trait;
pub mod registry;

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_serial::SerialPortBuilderExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::PortConfig;
use crate::error::{NavLoggerError, Result};
use crate::prompt::UserPrompt;
use crate::telemetry::{SentenceDecoder, SharedNavigation};
use framing::SentenceFramer;
use port_trait::{PortReader, PortWriter, StreamReader, StreamWriter};
use registry::{DeviceRegistry, DeviceStats, PortStatus};

/// Collaborators shared by every channel's reader task
#[derive(Clone)]
pub struct ReaderContext {
    /// Per-channel counters and status
    pub registry: Arc<DeviceRegistry>,
    /// Device sentence decoder
    pub decoder: Arc<dyn SentenceDecoder>,
    /// Navigation state the decoder writes into
    pub navigation: SharedNavigation,
}

impl std::fmt::Debug for ReaderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderContext")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// One communication endpoint with its reader task
pub struct Channel {
    index: usize,
    name: String,
    ctx: ReaderContext,
    writer: Mutex<Box<dyn PortWriter>>,
    /// Present while no reader task owns it
    reader: Option<Box<dyn PortReader>>,
    stop: CancellationToken,
    task: Option<JoinHandle<Box<dyn PortReader>>>,
    notifier: Option<Arc<dyn UserPrompt>>,
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("running", &self.is_reader_running())
            .finish_non_exhaustive()
    }
}

impl Channel {
    /// Build a channel from an already opened transport
    ///
    /// The channel is marked `Opened` in the registry. The reader task is not
    /// started; call [`Channel::start_reader`].
    pub fn new(
        index: usize,
        name: impl Into<String>,
        reader: Box<dyn PortReader>,
        writer: Box<dyn PortWriter>,
        ctx: ReaderContext,
    ) -> Self {
        ctx.registry.set_status(index, PortStatus::Opened);
        Self {
            index,
            name: name.into(),
            ctx,
            writer: Mutex::new(writer),
            reader: Some(reader),
            stop: CancellationToken::new(),
            task: None,
            notifier: None,
        }
    }

    /// Build a channel over any bidirectional async byte stream
    pub fn from_stream<T>(index: usize, name: impl Into<String>, stream: T, ctx: ReaderContext) -> Self
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (rx, tx) = tokio::io::split(stream);
        Self::new(
            index,
            name,
            Box::new(StreamReader::new(rx)),
            Box::new(StreamWriter::new(tx)),
            ctx,
        )
    }

    /// Open a serial port described by `config`
    ///
    /// # Arguments
    ///
    /// * `index` - Registry slot of this channel
    /// * `config` - Port name, device path and baud rate
    /// * `ctx` - Shared reader collaborators
    ///
    /// # Errors
    ///
    /// Returns `PortOpen` if the device cannot be opened; the registry slot is
    /// then marked `OpenKo`.
    pub fn open_serial(index: usize, config: &PortConfig, ctx: ReaderContext) -> Result<Self> {
        debug!("Trying to open serial port: {}", config.path);

        match Self::open_port(&config.path, config.baud_rate) {
            Ok(port) => {
                info!("Opened {} at {} ({} baud)", config.name, config.path, config.baud_rate);
                Ok(Self::from_stream(index, config.name.clone(), port, ctx))
            }
            Err(e) => {
                ctx.registry.set_status(index, PortStatus::OpenKo);
                warn!(target: "startup", "Port {} <{}> open failed: {}", index + 1, config.path, e);
                Err(e)
            }
        }
    }

    /// Open a specific serial port with 8N1 settings
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| NavLoggerError::PortOpen {
                path: path.to_string(),
                message: e.to_string(),
            })
    }

    /// Surface reader start failures to the user through `notifier`
    pub fn with_notifier(mut self, notifier: Arc<dyn UserPrompt>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Registry slot of this channel
    pub fn index(&self) -> usize {
        self.index
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current status from the registry
    pub fn status(&self) -> PortStatus {
        self.ctx.registry.status(self.index).unwrap_or(PortStatus::Closed)
    }

    /// Current counters from the registry
    pub fn stats(&self) -> Option<DeviceStats> {
        self.ctx.registry.stats(self.index)
    }

    pub fn add_received(&self, bytes: u64) {
        self.ctx.registry.add_received(self.index, bytes);
    }

    pub fn add_received_error(&self, bytes: u64) {
        self.ctx.registry.add_received_error(self.index, bytes);
    }

    pub fn add_sent(&self, bytes: u64) {
        self.ctx.registry.add_sent(self.index, bytes);
    }

    pub fn add_sent_error(&self, bytes: u64) {
        self.ctx.registry.add_sent_error(self.index, bytes);
    }

    pub fn set_status(&self, status: PortStatus) {
        self.ctx.registry.set_status(self.index, status);
    }

    /// Send bytes to the device
    ///
    /// No retry is attempted; the caller decides what to do with a failure.
    /// Sent bytes are counted as `tx` on success and `err_tx` on failure.
    ///
    /// # Returns
    ///
    /// * `bool` - `true` if all bytes were written and flushed
    pub async fn write(&self, data: &[u8]) -> bool {
        let success = {
            let mut writer = self.writer.lock().await;
            match writer.write_all(data).await {
                Ok(()) => writer.flush().await.is_ok(),
                Err(_) => false,
            }
        };

        let len = data.len() as u64;
        if success {
            self.add_sent(len);
        } else {
            self.add_sent_error(len);
        }

        let status = if success { "success" } else { "failed" };
        debug!(
            port = self.index + 1,
            status,
            "write(\"{}\")",
            String::from_utf8_lossy(data)
        );

        success
    }

    /// Send a text command; empty strings are not written
    pub async fn write_str(&self, text: &str) -> bool {
        if text.is_empty() {
            return true;
        }
        self.write(text.as_bytes()).await
    }

    /// Whether a reader task is currently alive
    pub fn is_reader_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Start the background reader task
    ///
    /// Failures are reported to the startup trail and, when a notifier is
    /// attached, to the user. The channel stays usable for a later retry.
    ///
    /// # Returns
    ///
    /// * `bool` - `true` if a reader task is now running
    pub async fn start_reader(&mut self) -> bool {
        if self.is_reader_running() {
            warn!("Port {} <{}> reader already running", self.index + 1, self.name);
            return false;
        }

        // A reader that ended on its own still has to be joined to get the
        // transport back.
        self.join_reader().await;

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                self.report_start_failure(&e.to_string());
                return false;
            }
        };

        let Some(reader) = self.reader.take() else {
            self.report_start_failure("transport lost");
            return false;
        };

        self.stop = CancellationToken::new();
        let span = info_span!("reader", port = %self.name, index = self.index + 1);
        let task = run_reader(self.index, reader, self.ctx.clone(), self.stop.clone());
        self.task = Some(runtime.spawn(task.instrument(span)));

        true
    }

    fn report_start_failure(&self, reason: &str) {
        error!(
            target: "startup",
            "Port {} <{}> Failed to start Rx Thread: {}",
            self.index + 1,
            self.name,
            reason
        );
        if let Some(notifier) = &self.notifier {
            notifier.message(
                "Communication",
                &format!("Unable to Start RX Thread on Port {}", self.name),
            );
        }
    }

    /// Stop the reader task and wait for it to exit
    ///
    /// Cancelling the token both raises the stop flag and wakes a reader
    /// blocked in `read_byte`. Safe to call when nothing is running.
    pub async fn stop_reader(&mut self) -> bool {
        self.stop.cancel();

        if self.task.is_some() {
            debug!("Port {} StopRxThread: wait end of reader", self.index + 1);
        }
        self.join_reader().await;

        self.stop = CancellationToken::new();
        true
    }

    async fn join_reader(&mut self) {
        if let Some(task) = self.task.take() {
            match task.await {
                Ok(reader) => self.reader = Some(reader),
                Err(e) => {
                    // The transport went down with the task
                    self.set_status(PortStatus::OpenKo);
                    error!("Port {} reader task aborted: {}", self.index + 1, e);
                }
            }
        }
    }

    /// Stop reading from the device
    pub async fn close(&mut self) -> bool {
        self.stop_reader().await
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        let running = self.is_reader_running();
        if running {
            // Never leave an orphaned reader behind, even in release builds
            self.stop.cancel();
        }
        debug_assert!(!running, "channel dropped while its reader task is running");
    }
}

/// Read a single byte, `None` meaning the transport is gone
async fn read_byte(reader: &mut dyn PortReader) -> Option<u8> {
    match reader.read_byte().await {
        Ok(b) => Some(b),
        Err(e) => {
            debug!("read failed: {}", e);
            None
        }
    }
}

/// Reader task body
///
/// Runs until the token is cancelled or the transport fails, then marks the
/// channel `OpenKo` and hands the transport back. A failed read counts as one
/// `err_rx` byte.
async fn run_reader(
    index: usize,
    mut reader: Box<dyn PortReader>,
    ctx: ReaderContext,
    stop: CancellationToken,
) -> Box<dyn PortReader> {
    info!(target: "startup", "Port {} ReadThread : started", index + 1);

    let mut framer = SentenceFramer::new();
    loop {
        let byte = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            byte = read_byte(reader.as_mut()) => byte,
        };

        let Some(byte) = byte else {
            ctx.registry.add_received_error(index, 1);
            break;
        };

        ctx.registry.add_received(index, 1);
        process_byte(index, byte, &mut framer, &ctx);
    }

    ctx.registry.set_status(index, PortStatus::OpenKo);
    info!(target: "startup", "Port {} ReadThread : terminated", index + 1);
    reader
}

fn process_byte(index: usize, byte: u8, framer: &mut SentenceFramer, ctx: &ReaderContext) {
    // Stream devices see every byte; a consumed byte still goes through
    // framing since several devices may share one port.
    ctx.decoder.parse_stream(index, &[byte]);

    framer.push(byte, |line| {
        let sentence = String::from_utf8_lossy(line);
        ctx.decoder.parse_sentence(index, &sentence, &ctx.navigation);
    });
}
