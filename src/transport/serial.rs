//! Serial-port transport (USB CDC / UART to the sensor board).
//!
//! Wraps a `serialport` handle and a [`LineDecoder`].  Reads use the
//! port's own timeout so a silent or unplugged board can never block
//! the control loop indefinitely.

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use log::{debug, info};
use serialport::{ClearBuffer, SerialPort};

use super::Transport;
use super::line::LineDecoder;
use crate::error::{ConnectionError, TransportError};

/// Bytes requested from the driver per read call.
const READ_CHUNK: usize = 128;

/// Port timeout used until the first `read_line` sets its own.
const OPEN_TIMEOUT: Duration = Duration::from_millis(500);

pub struct SerialTransport {
    address: String,
    port: Option<Box<dyn SerialPort>>,
    decoder: LineDecoder,
}

impl SerialTransport {
    /// Open `address` at `baud_rate` (8N1, no flow control).
    pub fn open(address: &str, baud_rate: u32) -> Result<Self, ConnectionError> {
        let port = serialport::new(address, baud_rate)
            .timeout(OPEN_TIMEOUT)
            .open()
            .map_err(|e| connection_error(address, &e))?;
        info!("Serial: opened {address} at {baud_rate} baud");
        Ok(Self {
            address: address.to_string(),
            port: Some(port),
            decoder: LineDecoder::new(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Transport for SerialTransport {
    fn read_line(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        if let Some(line) = self.decoder.next_line() {
            return Ok(Some(line));
        }

        let port = self.port.as_mut().ok_or(TransportError::Closed)?;
        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; READ_CHUNK];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            port.set_timeout(remaining)
                .map_err(|e| TransportError::read(&io::Error::from(e)))?;

            match port.read(&mut buf) {
                // The driver reports "no data" as TimedOut; a zero-length
                // read means the device hung up.
                Ok(0) => {
                    return Err(TransportError::read(&io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "device closed the connection",
                    )));
                }
                Ok(n) => {
                    self.decoder.feed(&buf[..n]);
                    if let Some(line) = self.decoder.next_line() {
                        return Ok(Some(line));
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::TimedOut => return Ok(None),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(TransportError::read(&e)),
            }
        }
    }

    fn write_line(&mut self, line: &[u8]) -> Result<(), TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::Closed)?;
        port.write_all(line).map_err(|e| TransportError::write(&e))?;
        port.flush().map_err(|e| TransportError::write(&e))
    }

    fn discard_input(&mut self) -> Result<(), TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::Closed)?;
        port.clear(ClearBuffer::Input)
            .map_err(|e| TransportError::read(&io::Error::from(e)))?;
        self.decoder.reset();
        debug!("Serial: input buffer cleared");
        Ok(())
    }

    fn dropped_lines(&self) -> u64 {
        self.decoder.dropped_overlong() + self.decoder.dropped_backlog()
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            self.decoder.reset();
            info!("Serial: closed {}", self.address);
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }
}

/// Map a driver open failure onto the controller's connection taxonomy.
fn connection_error(address: &str, e: &serialport::Error) -> ConnectionError {
    let address = address.to_string();
    match e.kind() {
        serialport::ErrorKind::NoDevice
        | serialport::ErrorKind::Io(io::ErrorKind::NotFound) => {
            ConnectionError::NoDevice { address }
        }
        serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied) => {
            ConnectionError::PermissionDenied { address }
        }
        serialport::ErrorKind::InvalidInput => ConnectionError::InvalidSettings {
            address,
            detail: e.description.clone(),
        },
        _ => ConnectionError::Io {
            address,
            detail: e.description.clone(),
        },
    }
}
