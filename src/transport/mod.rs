//! Transport abstraction: a line-framed duplex channel to the sensor board.
//!
//! Concrete implementations:
//! - [`SerialTransport`](serial::SerialTransport): USB/UART serial port
//! - test doubles in `tests/integration/mock_transport.rs`
//!
//! The control loop is generic over `Transport`, so it never sees the
//! serial driver.  Transports know nothing about the telemetry protocol;
//! they only move lines.

pub mod line;
pub mod serial;

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use crate::error::TransportError;

/// Line-oriented transport channel.
pub trait Transport {
    /// Wait up to `timeout` for one complete line (terminator removed).
    ///
    /// Returns `Ok(None)` if no full line arrived in time; that is routine,
    /// not a fault.  `Err` means the channel itself failed.
    fn read_line(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, TransportError>;

    /// Write one already-terminated line.
    fn write_line(&mut self, line: &[u8]) -> Result<(), TransportError>;

    /// Drop bytes received but not yet read (e.g. boot noise from the
    /// board during the settle delay).
    fn discard_input(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Lines discarded by framing since the transport was opened.
    fn dropped_lines(&self) -> u64 {
        0
    }

    /// Release the channel.  Must be idempotent and never fail.
    fn close(&mut self);

    /// False once `close()` has run.
    fn is_open(&self) -> bool;
}

/// Scoped ownership of an open transport.
///
/// Closes the transport when dropped, so every exit path of the control
/// loop (including unwinding) releases the device.
pub struct TransportGuard<T: Transport> {
    inner: T,
}

impl<T: Transport> TransportGuard<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Close now.  Dropping the guard afterwards is a no-op on the device.
    pub fn close(&mut self) {
        self.inner.close();
    }
}

impl<T: Transport> Deref for TransportGuard<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: Transport> DerefMut for TransportGuard<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T: Transport> Drop for TransportGuard<T> {
    fn drop(&mut self) {
        self.inner.close();
    }
}
