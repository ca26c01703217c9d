//! Sensor-to-pump control loop.
//!
//! ```text
//!  CONNECTING ──[open + settle]──▶ RUNNING ──[interrupt | transport fault]──▶ SHUTTING DOWN ──▶ STOPPED
//!       │                                                                          ▲
//!       └──────────────────────[open failed | interrupt during settle]─────────────┘
//! ```
//!
//! `Running` repeats one cycle:
//!
//! ```text
//!  read_line ──▶ decode ──▶ predict ──▶ decide ──▶ encode ──▶ write_line ──▶ sleep
//!     │            │           │          │                       │
//!  timeout      malformed   model fault  suppressed          write fault
//!     └────────────┴───────────┴──────────┴──▶ sleep               └──▶ SHUTTING DOWN
//! ```
//!
//! Only this module decides whether a fault is per-cycle (log, discard,
//! carry on) or session-fatal.  Malformed frames and estimation faults
//! are skipped without bound; any read or write I/O error ends the
//! session, and restarting the process is the recovery path.

pub mod shutdown;
pub mod stats;

use std::time::Instant;

use crate::app::events::ControlEvent;
use crate::app::ports::EventSink;
use crate::codec::{self, ActuationCommand};
use crate::config::ControllerConfig;
use crate::error::{self, ConnectionError, EstimationError, MalformedFrame, TransportError};
use crate::estimator::Estimator;
use crate::policy::{ActuationPolicy, Decision};
use crate::transport::{Transport, TransportGuard};

use shutdown::ShutdownSignal;
use stats::SessionStats;

// ---------------------------------------------------------------------------
// Lifecycle states
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateId {
    Connecting,
    Running,
    ShuttingDown,
    Stopped,
}

impl StateId {
    pub fn name(self) -> &'static str {
        match self {
            Self::Connecting => "Connecting",
            Self::Running => "Running",
            Self::ShuttingDown => "ShuttingDown",
            Self::Stopped => "Stopped",
        }
    }
}

/// Why the session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ExitReason {
    /// Operator interrupt.  A clean exit.
    ShutdownRequested,
    /// The transport could not be opened.
    ConnectFailed(ConnectionError),
    /// The transport failed while running.
    TransportFault(TransportError),
}

impl ExitReason {
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::ShutdownRequested)
    }

    /// `Ok` for a clean stop, otherwise the fault as a process-level [`Error`](error::Error).
    pub fn into_result(self) -> error::Result<()> {
        match self {
            Self::ShutdownRequested => Ok(()),
            Self::ConnectFailed(e) => Err(e.into()),
            Self::TransportFault(e) => Err(e.into()),
        }
    }
}

/// Final result of [`ControlLoop::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub reason: ExitReason,
    pub stats: SessionStats,
}

impl SessionOutcome {
    pub fn is_clean(&self) -> bool {
        self.reason.is_clean()
    }
}

/// What a single cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// No line within the read timeout.
    NoData,
    /// The line failed to decode.
    Discarded(MalformedFrame),
    /// The estimator rejected the reading.
    EstimationFailed(EstimationError),
    /// Prediction below the minimum dose.
    Suppressed { predicted_ml: f64 },
    /// A command was written.
    CommandSent(ActuationCommand),
    /// Shutdown was requested while waiting for a line.
    Cancelled,
    /// Read or write failed; the session must end.
    TransportFault(TransportError),
}

enum LineWait {
    Line(Vec<u8>),
    TimedOut,
    Cancelled,
    Fault(TransportError),
}

// ---------------------------------------------------------------------------
// Control loop
// ---------------------------------------------------------------------------

/// Owns one control session: a transport, read-only config and model,
/// and the event sink diagnostics flow into.
pub struct ControlLoop<'a, E: Estimator + ?Sized, S: EventSink> {
    config: &'a ControllerConfig,
    estimator: &'a E,
    policy: ActuationPolicy,
    shutdown: ShutdownSignal,
    sink: S,
    state: StateId,
    stats: SessionStats,
    last_telemetry: Instant,
}

impl<'a, E: Estimator + ?Sized, S: EventSink> ControlLoop<'a, E, S> {
    pub fn new(
        config: &'a ControllerConfig,
        estimator: &'a E,
        shutdown: ShutdownSignal,
        sink: S,
    ) -> Self {
        Self {
            config,
            estimator,
            policy: ActuationPolicy::new(config),
            shutdown,
            sink,
            state: StateId::Connecting,
            stats: SessionStats::default(),
            last_telemetry: Instant::now(),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Run a whole session: open the transport with `connect`, loop until
    /// interrupted or the transport fails, then close it.
    ///
    /// The transport is closed on every path out of this function.
    pub fn run<T, F>(&mut self, connect: F) -> SessionOutcome
    where
        T: Transport,
        F: FnOnce() -> Result<T, ConnectionError>,
    {
        self.sink.emit(&ControlEvent::Connecting {
            address: self.config.port.clone(),
            baud_rate: self.config.baud_rate,
        });

        let mut transport = match connect() {
            Ok(t) => TransportGuard::new(t),
            Err(e) => {
                self.sink.emit(&ControlEvent::ConnectFailed(e.clone()));
                return self.stop(ExitReason::ConnectFailed(e));
            }
        };
        self.sink.emit(&ControlEvent::Connected {
            address: self.config.port.clone(),
        });

        let reason = match self.settle(&mut *transport) {
            Some(reason) => reason,
            None => {
                self.transition(StateId::Running);
                self.run_session(&mut *transport)
            }
        };

        self.transition(StateId::ShuttingDown);
        transport.close();
        self.stop(reason)
    }

    /// Wait out the peer's reset after open, then drop its boot chatter.
    fn settle<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Option<ExitReason> {
        if self
            .shutdown
            .wait(self.config.settle_delay(), self.config.poll_slice())
        {
            return Some(ExitReason::ShutdownRequested);
        }
        if let Err(e) = transport.discard_input() {
            self.sink.emit(&ControlEvent::TransportFault(e.clone()));
            return Some(ExitReason::TransportFault(e));
        }
        None
    }

    fn run_session<T: Transport + ?Sized>(&mut self, transport: &mut T) -> ExitReason {
        self.last_telemetry = Instant::now();
        loop {
            match self.run_cycle(transport) {
                CycleOutcome::Cancelled => return ExitReason::ShutdownRequested,
                CycleOutcome::TransportFault(e) => return ExitReason::TransportFault(e),
                _ => {}
            }

            self.maybe_emit_telemetry();

            if self
                .shutdown
                .wait(self.config.cycle_delay(), self.config.poll_slice())
            {
                return ExitReason::ShutdownRequested;
            }
        }
    }

    fn stop(&mut self, reason: ExitReason) -> SessionOutcome {
        self.transition(StateId::Stopped);
        self.sink.emit(&ControlEvent::Stopped {
            reason: reason.clone(),
            stats: self.stats,
        });
        SessionOutcome {
            reason,
            stats: self.stats,
        }
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// One pass of read → decode → predict → decide → write.
    /// Does not sleep; [`run`](Self::run) owns the cadence.
    pub fn run_cycle<T: Transport + ?Sized>(&mut self, transport: &mut T) -> CycleOutcome {
        self.stats.cycles += 1;

        // 1. Bounded, cancellable wait for one line
        let wait = self.await_line(transport);
        self.stats.lines_dropped = transport.dropped_lines();
        let line = match wait {
            LineWait::Line(line) => line,
            LineWait::TimedOut => {
                self.stats.read_timeouts += 1;
                self.sink.emit(&ControlEvent::ReadTimeout);
                return CycleOutcome::NoData;
            }
            LineWait::Cancelled => return CycleOutcome::Cancelled,
            LineWait::Fault(e) => {
                self.sink.emit(&ControlEvent::TransportFault(e.clone()));
                return CycleOutcome::TransportFault(e);
            }
        };
        self.stats.lines_received += 1;

        // 2. Decode
        let reading = match codec::decode_reading(&line) {
            Ok(r) => r,
            Err(error) => {
                self.stats.malformed_frames += 1;
                self.sink.emit(&ControlEvent::FrameDiscarded {
                    error,
                    line: String::from_utf8_lossy(&line).into_owned(),
                });
                return CycleOutcome::Discarded(error);
            }
        };

        // 3. Estimate
        let predicted_ml = match self.estimator.predict(&reading) {
            Ok(v) => v,
            Err(error) => {
                self.stats.estimation_faults += 1;
                self.sink.emit(&ControlEvent::EstimationFailed {
                    reading,
                    error: error.clone(),
                });
                return CycleOutcome::EstimationFailed(error);
            }
        };

        // 4. Decide, then encode + write
        let decision = self.policy.evaluate(predicted_ml);
        let Decision::Actuate {
            effective_ml,
            command,
            ..
        } = decision
        else {
            self.stats.suppressed += 1;
            self.sink.emit(&ControlEvent::DoseSuppressed {
                reading,
                predicted_ml,
                min_ml: self.policy.min_ml(),
            });
            return CycleOutcome::Suppressed { predicted_ml };
        };

        let frame = codec::encode_command(&command);
        if let Err(e) = transport.write_line(frame.as_bytes()) {
            self.sink.emit(&ControlEvent::TransportFault(e.clone()));
            return CycleOutcome::TransportFault(e);
        }

        let capped = decision.was_capped();
        self.stats.commands_sent += 1;
        self.stats.runtime_seconds_total += u64::from(command.runtime_seconds);
        if capped {
            self.stats.capped_commands += 1;
        }
        self.sink.emit(&ControlEvent::CommandSent {
            reading,
            predicted_ml,
            effective_ml,
            runtime_seconds: command.runtime_seconds,
            capped,
        });
        CycleOutcome::CommandSent(command)
    }

    /// Read in `poll_slice` pieces until a line, the read timeout,
    /// a shutdown request or a fault.
    fn await_line<T: Transport + ?Sized>(&self, transport: &mut T) -> LineWait {
        let deadline = Instant::now() + self.config.read_timeout();
        let slice = self.config.poll_slice();
        loop {
            if self.shutdown.is_requested() {
                return LineWait::Cancelled;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return LineWait::TimedOut;
            }
            match transport.read_line(remaining.min(slice)) {
                Ok(Some(line)) => return LineWait::Line(line),
                Ok(None) => {}
                Err(e) => return LineWait::Fault(e),
            }
        }
    }

    fn maybe_emit_telemetry(&mut self) {
        let Some(interval) = self.config.telemetry_interval() else {
            return;
        };
        if self.last_telemetry.elapsed() >= interval {
            self.sink.emit(&ControlEvent::Telemetry(self.stats));
            self.last_telemetry = Instant::now();
        }
    }

    fn transition(&mut self, to: StateId) {
        if to == self.state {
            return;
        }
        let from = self.state;
        self.state = to;
        self.sink.emit(&ControlEvent::StateChanged { from, to });
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> StateId {
        self.state
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
