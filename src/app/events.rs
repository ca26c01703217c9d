//! Outbound control-loop events.
//!
//! Every discarded reading, every suppressed dose and every command sent
//! produces one of these, carrying enough context to explain itself.

use crate::codec::SensorReading;
use crate::control::stats::SessionStats;
use crate::control::{ExitReason, StateId};
use crate::error::{ConnectionError, EstimationError, MalformedFrame, TransportError};

/// Structured events emitted by the control loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// The loop moved between lifecycle states.
    StateChanged { from: StateId, to: StateId },

    /// Opening the transport.
    Connecting { address: String, baud_rate: u32 },

    /// Transport open; settle delay starts.
    Connected { address: String },

    /// Transport could not be opened.
    ConnectFailed(ConnectionError),

    /// No complete line within the read timeout.
    ReadTimeout,

    /// Inbound line rejected by the codec.
    FrameDiscarded { error: MalformedFrame, line: String },

    /// The estimator failed for a decoded reading.
    EstimationFailed {
        reading: SensorReading,
        error: EstimationError,
    },

    /// Prediction below the minimum dose; nothing sent.
    DoseSuppressed {
        reading: SensorReading,
        predicted_ml: f64,
        min_ml: f64,
    },

    /// A pump command was written to the board.
    CommandSent {
        reading: SensorReading,
        predicted_ml: f64,
        effective_ml: f64,
        runtime_seconds: u32,
        capped: bool,
    },

    /// Read or write on the open transport failed.
    TransportFault(TransportError),

    /// Periodic session statistics.
    Telemetry(SessionStats),

    /// The session reached `Stopped`.
    Stopped {
        reason: ExitReason,
        stats: SessionStats,
    },
}
