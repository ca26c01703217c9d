//! Control loop end-to-end: scripted telemetry in, pump commands out.

use std::io;
use std::thread;
use std::time::{Duration, Instant};

use irrigation::app::events::ControlEvent;
use irrigation::config::ControllerConfig;
use irrigation::control::shutdown::ShutdownSignal;
use irrigation::control::{ControlLoop, CycleOutcome, ExitReason, StateId};
use irrigation::error::{ConnectionError, EstimationError, MalformedFrame, TransportError};
use irrigation::transport::Transport;

use crate::mock_transport::{
    CountingEstimator, FailingEstimator, FixedEstimator, MockTransport, RecordingSink, Step,
};

const READING: &str = "30.0,28.5,50.0";

fn fast_config() -> ControllerConfig {
    ControllerConfig {
        cycle_delay_secs: 0,
        read_timeout_ms: 20,
        settle_delay_ms: 0,
        poll_slice_ms: 20,
        telemetry_interval_secs: 0,
        ..ControllerConfig::default()
    }
}

// ── Scenario 1: normal dose ───────────────────────────────────

#[test]
fn prediction_45ml_sends_pump_6() {
    let config = fast_config();
    let model = FixedEstimator(45.0);
    let shutdown = ShutdownSignal::new();
    let (transport, log) = MockTransport::lines(&[READING], shutdown.clone());

    let mut ctl = ControlLoop::new(&config, &model, shutdown, RecordingSink::new());
    let outcome = ctl.run(|| Ok(transport));

    assert!(outcome.is_clean());
    assert_eq!(log.borrow().written, vec!["PUMP:6\n".to_string()]);
    assert_eq!(outcome.stats.commands_sent, 1);
    assert_eq!(outcome.stats.runtime_seconds_total, 6);

    let sink = ctl.into_sink();
    assert!(sink.events.iter().any(|e| matches!(
        e,
        ControlEvent::CommandSent {
            runtime_seconds: 6,
            capped: false,
            ..
        }
    )));
}

// ── Scenario 2: below minimum ─────────────────────────────────

#[test]
fn prediction_below_minimum_sends_nothing() {
    let config = fast_config();
    let model = FixedEstimator(3.0);
    let shutdown = ShutdownSignal::new();
    let (transport, log) = MockTransport::lines(&[READING], shutdown.clone());

    let mut ctl = ControlLoop::new(&config, &model, shutdown, RecordingSink::new());
    let outcome = ctl.run(|| Ok(transport));

    assert!(outcome.is_clean());
    assert!(log.borrow().written.is_empty(), "no zero-second command");
    assert_eq!(outcome.stats.suppressed, 1);
    assert_eq!(
        ctl.sink()
            .count(|e| matches!(e, ControlEvent::DoseSuppressed { .. })),
        1
    );
}

// ── Scenarios 3 + 4: malformed frames ─────────────────────────

#[test]
fn non_numeric_field_skips_estimation() {
    let config = fast_config();
    let model = CountingEstimator::new(45.0);
    let shutdown = ShutdownSignal::new();
    let (mut transport, log) = MockTransport::lines(&["abc,28.5,50.0"], shutdown.clone());

    let mut ctl = ControlLoop::new(&config, &model, shutdown, RecordingSink::new());
    let out = ctl.run_cycle(&mut transport);

    assert_eq!(
        out,
        CycleOutcome::Discarded(MalformedFrame::NonNumeric { index: 0 })
    );
    assert_eq!(model.calls(), 0, "estimator must not run on a bad frame");
    assert!(log.borrow().written.is_empty());
    assert!(ctl.sink().events.iter().any(|e| matches!(
        e,
        ControlEvent::FrameDiscarded { line, .. } if line == "abc,28.5,50.0"
    )));
}

#[test]
fn two_fields_is_field_count_mismatch() {
    let config = fast_config();
    let model = CountingEstimator::new(45.0);
    let shutdown = ShutdownSignal::new();
    let (mut transport, _log) = MockTransport::lines(&["30.0,28.5"], shutdown.clone());

    let mut ctl = ControlLoop::new(&config, &model, shutdown, RecordingSink::new());
    let out = ctl.run_cycle(&mut transport);

    let CycleOutcome::Discarded(err) = out else {
        panic!("expected Discarded, got {out:?}");
    };
    assert_eq!(err, MalformedFrame::FieldCount { found: 2 });
    assert_eq!(err.reason(), "field count mismatch");
    assert_eq!(model.calls(), 0);
}

#[test]
fn malformed_frames_do_not_end_the_session() {
    let config = fast_config();
    let model = FixedEstimator(45.0);
    let shutdown = ShutdownSignal::new();
    let (transport, log) = MockTransport::lines(
        &["garbage", "1,2", "x,y,z", ",,", READING],
        shutdown.clone(),
    );

    let mut ctl = ControlLoop::new(&config, &model, shutdown, RecordingSink::new());
    let outcome = ctl.run(|| Ok(transport));

    assert!(outcome.is_clean());
    assert_eq!(outcome.stats.malformed_frames, 4);
    assert_eq!(log.borrow().written, vec!["PUMP:6\n".to_string()]);
}

// ── Estimation faults ─────────────────────────────────────────

#[test]
fn estimation_failure_skips_the_cycle() {
    let config = fast_config();
    let model = FailingEstimator::new(1, 45.0);
    let shutdown = ShutdownSignal::new();
    let (mut transport, log) = MockTransport::lines(&[READING], shutdown.clone());

    let mut ctl = ControlLoop::new(&config, &model, shutdown, RecordingSink::new());
    let out = ctl.run_cycle(&mut transport);

    assert!(matches!(
        out,
        CycleOutcome::EstimationFailed(EstimationError::NonFinite(_))
    ));
    assert!(log.borrow().written.is_empty());
    assert_eq!(ctl.stats().estimation_faults, 1);
    assert_eq!(
        ctl.sink()
            .count(|e| matches!(e, ControlEvent::EstimationFailed { .. })),
        1
    );
}

#[test]
fn session_survives_estimation_failure() {
    let config = fast_config();
    let model = FailingEstimator::new(1, 45.0);
    let shutdown = ShutdownSignal::new();
    let (transport, log) = MockTransport::lines(&[READING, READING], shutdown.clone());

    let mut ctl = ControlLoop::new(&config, &model, shutdown, RecordingSink::new());
    let outcome = ctl.run(|| Ok(transport));

    assert!(outcome.is_clean());
    assert_eq!(model.calls(), 2);
    assert_eq!(outcome.stats.estimation_faults, 1);
    assert_eq!(outcome.stats.commands_sent, 1);
    assert_eq!(log.borrow().written, vec!["PUMP:6\n".to_string()]);
}

// ── Scenario 5: safety cap ────────────────────────────────────

#[test]
fn prediction_over_cap_sends_pump_74() {
    let config = fast_config();
    let model = FixedEstimator(900.0);
    let shutdown = ShutdownSignal::new();
    let (transport, log) = MockTransport::lines(&[READING], shutdown.clone());

    let mut ctl = ControlLoop::new(&config, &model, shutdown, RecordingSink::new());
    let outcome = ctl.run(|| Ok(transport));

    assert_eq!(log.borrow().written, vec!["PUMP:74\n".to_string()]);
    assert_eq!(outcome.stats.capped_commands, 1);
    assert!(ctl.sink().events.iter().any(|e| matches!(
        e,
        ControlEvent::CommandSent {
            runtime_seconds: 74,
            capped: true,
            ..
        }
    )));
}

// ── Scenario 6: read timeout ──────────────────────────────────

#[test]
fn read_timeout_skips_processing() {
    let config = fast_config();
    let model = CountingEstimator::new(45.0);
    let shutdown = ShutdownSignal::new();
    let (mut transport, log) = MockTransport::new(&[Step::Silence], shutdown.clone());

    let mut ctl = ControlLoop::new(&config, &model, shutdown, RecordingSink::new());
    assert_eq!(ctl.run_cycle(&mut transport), CycleOutcome::NoData);
    assert_eq!(model.calls(), 0);
    assert!(log.borrow().written.is_empty());
    assert_eq!(ctl.stats().read_timeouts, 1);
}

#[test]
fn session_continues_after_timeout() {
    let config = fast_config();
    let model = FixedEstimator(45.0);
    let shutdown = ShutdownSignal::new();
    let (transport, log) = MockTransport::new(
        &[Step::Silence, Step::Line(READING)],
        shutdown.clone(),
    );

    let mut ctl = ControlLoop::new(&config, &model, shutdown, RecordingSink::new());
    let outcome = ctl.run(|| Ok(transport));

    assert!(outcome.is_clean());
    assert_eq!(outcome.stats.read_timeouts, 1);
    assert_eq!(log.borrow().written, vec!["PUMP:6\n".to_string()]);
}

// ── Lifecycle ─────────────────────────────────────────────────

#[test]
fn clean_session_walks_every_state_and_closes_once() {
    let config = fast_config();
    let model = FixedEstimator(45.0);
    let shutdown = ShutdownSignal::new();
    let (transport, log) = MockTransport::lines(&[READING], shutdown.clone());

    let mut ctl = ControlLoop::new(&config, &model, shutdown, RecordingSink::new());
    let outcome = ctl.run(|| Ok(transport));

    assert_eq!(outcome.reason, ExitReason::ShutdownRequested);
    assert_eq!(ctl.state(), StateId::Stopped);
    assert_eq!(log.borrow().closes, 1);
    assert_eq!(log.borrow().discards, 1, "boot noise flushed after settle");

    let states: Vec<StateId> = ctl
        .sink()
        .events
        .iter()
        .filter_map(|e| match e {
            ControlEvent::StateChanged { to, .. } => Some(*to),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![StateId::Running, StateId::ShuttingDown, StateId::Stopped]
    );
    assert!(matches!(
        ctl.sink().events.last(),
        Some(ControlEvent::Stopped {
            reason: ExitReason::ShutdownRequested,
            ..
        })
    ));
}

#[test]
fn connect_failure_never_reaches_running() {
    let config = fast_config();
    let model = FixedEstimator(45.0);
    let mut ctl = ControlLoop::new(&config, &model, ShutdownSignal::new(), RecordingSink::new());

    let outcome = ctl.run(|| -> Result<MockTransport, ConnectionError> {
        Err(ConnectionError::PermissionDenied {
            address: "/dev/ttyACM0".into(),
        })
    });

    assert!(!outcome.is_clean());
    assert!(matches!(
        outcome.reason,
        ExitReason::ConnectFailed(ConnectionError::PermissionDenied { .. })
    ));
    assert_eq!(
        ctl.sink()
            .count(|e| matches!(e, ControlEvent::StateChanged { to: StateId::Running, .. })),
        0
    );
    assert_eq!(ctl.state(), StateId::Stopped);
}

#[test]
fn write_fault_ends_session_and_still_closes() {
    let config = fast_config();
    let model = FixedEstimator(45.0);
    let shutdown = ShutdownSignal::new();
    let (transport, log) = MockTransport::lines(&[READING, READING], shutdown.clone());
    let transport = transport.failing_writes();

    let mut ctl = ControlLoop::new(&config, &model, shutdown, RecordingSink::new());
    let outcome = ctl.run(|| Ok(transport));

    assert!(!outcome.is_clean());
    assert!(matches!(
        outcome.reason,
        ExitReason::TransportFault(TransportError::Write { .. })
    ));
    assert_eq!(outcome.stats.commands_sent, 0);
    assert_eq!(log.borrow().closes, 1);
    assert_eq!(log.borrow().reads, 1, "no cycle after a fatal write");
}

#[test]
fn read_fault_ends_session() {
    let config = fast_config();
    let model = FixedEstimator(45.0);
    let shutdown = ShutdownSignal::new();
    let (transport, log) = MockTransport::new(
        &[Step::ReadFault(io::ErrorKind::BrokenPipe), Step::Line(READING)],
        shutdown.clone(),
    );

    let mut ctl = ControlLoop::new(&config, &model, shutdown, RecordingSink::new());
    let outcome = ctl.run(|| Ok(transport));

    assert!(matches!(
        outcome.reason,
        ExitReason::TransportFault(TransportError::Read {
            kind: io::ErrorKind::BrokenPipe,
            ..
        })
    ));
    assert!(log.borrow().written.is_empty());
    assert_eq!(log.borrow().closes, 1);
}

#[test]
fn transport_close_is_idempotent() {
    let (mut transport, log) = MockTransport::lines(&[], ShutdownSignal::new());
    transport.close();
    transport.close();
    transport.close();
    assert!(!transport.is_open());
    assert_eq!(log.borrow().closes, 1);
}

// ── Cancellation latency ──────────────────────────────────────

#[test]
fn shutdown_during_long_read_is_observed_within_a_slice() {
    let config = ControllerConfig {
        read_timeout_ms: 30_000,
        poll_slice_ms: 20,
        ..fast_config()
    };
    let model = FixedEstimator(45.0);
    let shutdown = ShutdownSignal::new();
    let steps = vec![Step::Silence; 10_000];
    let (mut transport, _log) = MockTransport::new(&steps, shutdown.clone());

    let remote = shutdown.clone();
    let trigger = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        remote.request();
    });

    let mut ctl = ControlLoop::new(&config, &model, shutdown, RecordingSink::new());
    let start = Instant::now();
    let out = ctl.run_cycle(&mut transport);
    trigger.join().unwrap();

    assert_eq!(out, CycleOutcome::Cancelled);
    assert!(
        start.elapsed() < Duration::from_secs(5),
        "cancel took {:?}",
        start.elapsed()
    );
}

#[test]
fn shutdown_during_cycle_delay_stops_promptly() {
    let config = ControllerConfig {
        cycle_delay_secs: 3600,
        poll_slice_ms: 20,
        ..fast_config()
    };
    let model = FixedEstimator(45.0);
    let shutdown = ShutdownSignal::new();
    let steps = vec![Step::Line(READING); 100];
    let (transport, log) = MockTransport::new(&steps, shutdown.clone());

    let remote = shutdown.clone();
    let trigger = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        remote.request();
    });

    let mut ctl = ControlLoop::new(&config, &model, shutdown, RecordingSink::new());
    let start = Instant::now();
    let outcome = ctl.run(|| Ok(transport));
    trigger.join().unwrap();

    assert!(outcome.is_clean());
    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(log.borrow().written.len(), 1, "only the first cycle ran");
    assert_eq!(log.borrow().closes, 1);
}

#[test]
fn shutdown_during_settle_skips_running() {
    let config = ControllerConfig {
        settle_delay_ms: 60_000,
        poll_slice_ms: 20,
        ..fast_config()
    };
    let model = FixedEstimator(45.0);
    let shutdown = ShutdownSignal::new();
    let (transport, log) = MockTransport::lines(&[READING], shutdown.clone());

    let remote = shutdown.clone();
    let trigger = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        remote.request();
    });

    let mut ctl = ControlLoop::new(&config, &model, shutdown, RecordingSink::new());
    let outcome = ctl.run(|| Ok(transport));
    trigger.join().unwrap();

    assert!(outcome.is_clean());
    assert_eq!(log.borrow().reads, 0);
    assert_eq!(log.borrow().closes, 1);
    assert_eq!(
        ctl.sink()
            .count(|e| matches!(e, ControlEvent::StateChanged { to: StateId::Running, .. })),
        0
    );
}

// ── Telemetry ─────────────────────────────────────────────────

#[test]
fn stopped_event_carries_final_stats() {
    let config = fast_config();
    let model = FixedEstimator(45.0);
    let shutdown = ShutdownSignal::new();
    let (transport, _log) =
        MockTransport::lines(&[READING, "bad", READING], shutdown.clone());

    let mut ctl = ControlLoop::new(&config, &model, shutdown, RecordingSink::new());
    let outcome = ctl.run(|| Ok(transport));

    let Some(ControlEvent::Stopped { stats, .. }) = ctl.sink().events.last() else {
        panic!("last event must be Stopped");
    };
    assert_eq!(*stats, outcome.stats);
    assert_eq!(stats.commands_sent, 2);
    assert_eq!(stats.malformed_frames, 1);
    assert_eq!(stats.lines_received, 3);
    assert_eq!(stats.readings_used(), 2);
}

#[test]
fn framing_drops_reach_session_stats() {
    let config = fast_config();
    let model = FixedEstimator(45.0);
    let shutdown = ShutdownSignal::new();
    let (transport, _log) = MockTransport::lines(&[READING], shutdown.clone());
    let transport = transport.with_dropped_lines(3);

    let mut ctl = ControlLoop::new(&config, &model, shutdown, RecordingSink::new());
    let outcome = ctl.run(|| Ok(transport));

    assert_eq!(outcome.stats.lines_dropped, 3);
}
