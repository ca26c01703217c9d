//! Port traits: the boundary between the control loop and its observers.
//!
//! ```text
//!   ControlLoop ──▶ EventSink ──▶ Adapter (log, test recorder, ...)
//! ```
//!
//! Transport and estimator ports live beside their implementations in
//! [`crate::transport`] and [`crate::estimator`].

use super::events::ControlEvent;

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// Receives every structured event the control loop produces.
pub trait EventSink {
    fn emit(&mut self, event: &ControlEvent);
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: &ControlEvent) {
        (**self).emit(event);
    }
}

/// Sink that drops everything.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &ControlEvent) {}
}
