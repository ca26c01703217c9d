//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing each [`ControlEvent`] through the
//! `log` facade.  Lines carry a short tag (`FRAME`, `MODEL`, `PUMP`,
//! `STATE`, `TELEM`, `LINK`) so they can be grepped per concern.

use log::{debug, error, info, warn};

use crate::app::events::ControlEvent;
use crate::app::ports::EventSink;
use crate::codec::SensorReading;

/// Adapter that logs every [`ControlEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

fn reading(r: &SensorReading) -> String {
    format!(
        "soil={:.1}% T={:.1}\u{00b0}C RH={:.1}%",
        r.soil_moisture, r.air_temperature, r.air_humidity
    )
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &ControlEvent) {
        match event {
            ControlEvent::StateChanged { from, to } => {
                info!("STATE | {} -> {}", from.name(), to.name());
            }
            ControlEvent::Connecting { address, baud_rate } => {
                info!("LINK  | opening {} @ {} baud", address, baud_rate);
            }
            ControlEvent::Connected { address } => {
                info!("LINK  | connected to {}", address);
            }
            ControlEvent::ConnectFailed(e) => {
                error!("LINK  | {}", e);
            }
            ControlEvent::ReadTimeout => {
                debug!("FRAME | no telemetry within read timeout");
            }
            ControlEvent::FrameDiscarded { error, line } => {
                warn!("FRAME | discarded {:?}: {}", line, error);
            }
            ControlEvent::EstimationFailed { reading: r, error } => {
                warn!("MODEL | estimation failed for {}: {}", reading(r), error);
            }
            ControlEvent::DoseSuppressed {
                reading: r,
                predicted_ml,
                min_ml,
            } => {
                info!(
                    "PUMP  | {} | predicted {:.2} mL < min {:.2} mL, no command",
                    reading(r),
                    predicted_ml,
                    min_ml
                );
            }
            ControlEvent::CommandSent {
                reading: r,
                predicted_ml,
                effective_ml,
                runtime_seconds,
                capped,
            } => {
                if *capped {
                    info!(
                        "PUMP  | {} | predicted {:.2} mL capped to {:.2} mL -> PUMP:{}",
                        reading(r),
                        predicted_ml,
                        effective_ml,
                        runtime_seconds
                    );
                } else {
                    info!(
                        "PUMP  | {} | predicted {:.2} mL -> PUMP:{}",
                        reading(r),
                        predicted_ml,
                        runtime_seconds
                    );
                }
            }
            ControlEvent::TransportFault(e) => {
                error!("LINK  | {}", e);
            }
            ControlEvent::Telemetry(s) => {
                info!(
                    "TELEM | cycles={} lines={} dropped={} timeouts={} malformed={} \
                     model_faults={} suppressed={} commands={} capped={} runtime={}s",
                    s.cycles,
                    s.lines_received,
                    s.lines_dropped,
                    s.read_timeouts,
                    s.malformed_frames,
                    s.estimation_faults,
                    s.suppressed,
                    s.commands_sent,
                    s.capped_commands,
                    s.runtime_seconds_total,
                );
            }
            ControlEvent::Stopped { reason, stats } => {
                let summary = format!(
                    "{} cycles, {} commands, {} s total runtime",
                    stats.cycles, stats.commands_sent, stats.runtime_seconds_total
                );
                if reason.is_clean() {
                    info!("STATE | stopped on operator request ({})", summary);
                } else {
                    error!("STATE | stopped: {:?} ({})", reason, summary);
                }
            }
        }
    }
}
