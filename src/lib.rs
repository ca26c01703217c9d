//! Irrigation controller library.
//!
//! Reads soil/air telemetry lines from a microcontroller over a serial
//! link, predicts the water volume a trained regressor recommends, and
//! writes back bounded `PUMP:<seconds>` commands.
//!
//! Everything except [`transport::serial`] runs without hardware, which
//! is what the integration tests drive.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod codec;
pub mod config;
pub mod control;
pub mod error;
pub mod estimator;
pub mod policy;
pub mod transport;
