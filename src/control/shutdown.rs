//! Operator shutdown signal.
//!
//! A shared flag set from the interrupt handler and polled by every
//! blocking wait in the control loop.  Waits are cut into slices so a
//! request is observed within one slice, not after the full delay.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use log::info;

#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the control loop to stop.  Safe from any thread, repeatable.
    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sleep for `total`, waking every `slice` to check the flag.
    /// Returns `true` if shutdown was requested before or during the wait.
    pub fn wait(&self, total: Duration, slice: Duration) -> bool {
        let deadline = Instant::now() + total;
        loop {
            if self.is_requested() {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            thread::sleep(remaining.min(slice));
        }
    }

    /// Route Ctrl-C / SIGTERM into this signal.  Call once per process.
    pub fn install_interrupt_handler(&self) -> Result<(), ctrlc::Error> {
        let signal = self.clone();
        ctrlc::set_handler(move || {
            if !signal.is_requested() {
                info!("Interrupt received, shutting down");
            }
            signal.request();
        })
    }
}
