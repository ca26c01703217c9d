//! Application boundary: structured events out of the control loop.
//!
//! The control loop never decides where diagnostics go.  It emits
//! [`ControlEvent`](events::ControlEvent)s through the
//! [`EventSink`](ports::EventSink) port; adapters render them (the
//! shipped one writes log records).

pub mod events;
pub mod ports;
