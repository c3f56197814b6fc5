//! Serial line source
//!
//! The port is owned by a dedicated reader thread: `serialport` reads are
//! blocking, so the thread turns them into a channel of complete text lines
//! that the async ingest loop can poll without ever blocking.

use std::io::{BufRead, BufReader, ErrorKind};
use std::thread::JoinHandle;
use std::time::Duration;
use serialport::{ClearBuffer, SerialPortType};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio_util::sync::CancellationToken;
use crate::ingest::errors::IngestError;

/// Port name that asks for board auto-detection
pub const AUTO_PORT: &str = "auto";

#[cfg(windows)]
pub const DEFAULT_PORT: &str = "COM3";
#[cfg(not(windows))]
pub const DEFAULT_PORT: &str = "/dev/ttyACM0";

/// Lines buffered between the reader thread and the ingest loop
const LINE_BUFFER: usize = 64;

/// USB descriptions that identify a board (or the usual USB-UART bridges)
const BOARD_HINTS: [&str; 2] = ["Arduino", "USB Serial"];

#[derive(Clone, Debug)]
pub struct SerialOptions {
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout: Duration,
    /// Boards reset when the port opens; give them time before reading
    pub settle: Duration,
}

/// Result of polling a [`LineSource`]
#[derive(Debug, PartialEq)]
pub enum Poll {
    Line(String),
    /// Nothing pending right now
    Idle,
    /// The reader is gone; no more lines will ever arrive
    Closed,
}

/// Stream of raw telemetry lines
pub struct LineSource {
    name: String,
    rx: mpsc::Receiver<String>,
    stop: CancellationToken,
    reader: Option<JoinHandle<()>>,
}

impl LineSource {
    /// Open the serial device and start the reader thread.
    ///
    /// A single attempt is made; the caller decides what to do when the
    /// device is not there.
    pub fn open(opts: &SerialOptions) -> Result<Self, IngestError> {
        let port_name = resolve_port(&opts.port);
        tracing::info!("Opening serial port {} at {} baud", port_name, opts.baud_rate);

        let port = serialport::new(&port_name, opts.baud_rate)
            .timeout(opts.read_timeout)
            .open()
            .map_err(|e| IngestError::SourceUnavailable {
                port: port_name.clone(),
                source: e.into(),
            })?;

        let (tx, rx) = mpsc::channel(LINE_BUFFER);
        let stop = CancellationToken::new();
        let settle = opts.settle;
        let thread_stop = stop.clone();
        let thread_name = port_name.clone();
        let reader = std::thread::Builder::new()
            .name("serial-reader".to_string())
            .spawn(move || {
                std::thread::sleep(settle);
                if let Err(e) = port.clear(ClearBuffer::Input) {
                    tracing::warn!("Failed to clear serial input buffer: {}", e);
                }
                tracing::info!("Connected to {}", thread_name);
                read_lines(port, tx, thread_stop);
                tracing::info!("Serial port {} closed", thread_name);
            })
            .map_err(|e| IngestError::SourceUnavailable {
                port: port_name.clone(),
                source: e.into(),
            })?;

        Ok(Self {
            name: port_name,
            rx,
            stop,
            reader: Some(reader),
        })
    }

    /// Wrap an existing channel of lines (simulators, tests)
    pub fn from_channel(name: impl Into<String>, rx: mpsc::Receiver<String>) -> Self {
        Self {
            name: name.into(),
            rx,
            stop: CancellationToken::new(),
            reader: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Take the next pending line without waiting
    pub fn poll(&mut self) -> Poll {
        match self.rx.try_recv() {
            Ok(line) => Poll::Line(line),
            Err(TryRecvError::Empty) => Poll::Idle,
            Err(TryRecvError::Disconnected) => Poll::Closed,
        }
    }

    /// Stop the reader and wait until it has released the port
    pub async fn close(mut self) {
        self.stop.cancel();
        self.rx.close();
        if let Some(reader) = self.reader.take() {
            if !matches!(tokio::task::spawn_blocking(move || reader.join()).await, Ok(Ok(()))) {
                tracing::warn!("Serial reader for {} did not shut down cleanly", self.name);
            }
        }
    }
}

fn read_lines(port: Box<dyn serialport::SerialPort>, tx: mpsc::Sender<String>, stop: CancellationToken) {
    let mut reader = BufReader::new(port);
    let mut buf = Vec::with_capacity(128);

    while !stop.is_cancelled() {
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                tracing::error!("Serial device returned end of stream");
                return;
            }
            Ok(_) => {
                let raw = std::mem::take(&mut buf);
                let line = match String::from_utf8(raw) {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::warn!("Dropping non UTF-8 serial line: {}", e);
                        continue;
                    }
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                tracing::debug!("RAW data: {}", line);
                if tx.blocking_send(line.to_string()).is_err() {
                    return;
                }
            }
            // partial line stays in `buf` until the newline arrives
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted) => {}
            Err(e) => {
                tracing::error!("Serial read error: {}", e);
                return;
            }
        }
    }
}

/// Map the configured port name to a device path, auto-detecting when asked
pub fn resolve_port(configured: &str) -> String {
    if configured != AUTO_PORT {
        return configured.to_string();
    }
    match find_board_port() {
        Some(port) => port,
        None => {
            tracing::warn!("Could not automatically find a board port, using {}", DEFAULT_PORT);
            DEFAULT_PORT.to_string()
        }
    }
}

/// First USB serial port that looks like a sensor board
pub fn find_board_port() -> Option<String> {
    let ports = match serialport::available_ports() {
        Ok(ports) => ports,
        Err(e) => {
            tracing::warn!("Failed to enumerate serial ports: {}", e);
            return None;
        }
    };

    ports.into_iter().find_map(|info| {
        let SerialPortType::UsbPort(usb) = &info.port_type else {
            return None;
        };
        let described = [usb.product.as_deref(), usb.manufacturer.as_deref()]
            .into_iter()
            .flatten()
            .any(looks_like_board);
        if described {
            tracing::info!("Found potential board port: {}", info.port_name);
            Some(info.port_name)
        } else {
            None
        }
    })
}

fn looks_like_board(description: &str) -> bool {
    BOARD_HINTS.iter().any(|hint| description.contains(hint))
}
