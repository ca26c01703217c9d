//! Irrigation controller, host entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  SerialTransport   TrainedModel   LogEventSink   ctrlc       │
//! │  (Transport)       (Estimator)    (EventSink)    (shutdown)  │
//! │                                                              │
//! │  ─────────────────── Port trait boundary ──────────────────  │
//! │                                                              │
//! │   ControlLoop:  read → decode → predict → decide → write     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `irrigation-controller [config.json]`

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use log::{error, info};

use irrigation::adapters::log_sink::LogEventSink;
use irrigation::config::ControllerConfig;
use irrigation::control::ControlLoop;
use irrigation::control::shutdown::ShutdownSignal;
use irrigation::error::Error;
use irrigation::estimator::TrainedModel;
use irrigation::transport::serial::SerialTransport;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    info!("irrigation-controller v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Configuration ──────────────────────────────────────
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = ControllerConfig::load(config_path.as_deref())
        .map_err(Error::from)
        .context("loading configuration")?;

    // ── 2. Model (fatal before any connection attempt) ────────
    let model = TrainedModel::load(&config.model_path)
        .map_err(Error::from)
        .with_context(|| format!("loading model {}", config.model_path.display()))?;

    // ── 3. Interrupt handling ─────────────────────────────────
    let shutdown = ShutdownSignal::new();
    shutdown
        .install_interrupt_handler()
        .context("installing interrupt handler")?;

    // ── 4. Session ────────────────────────────────────────────
    let mut control = ControlLoop::new(&config, &model, shutdown, LogEventSink::new());
    let outcome = control.run(|| SerialTransport::open(&config.port, config.baud_rate));
    outcome.reason.into_result().context("control session")?;
    Ok(())
}
