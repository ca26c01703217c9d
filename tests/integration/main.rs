//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises the control loop
//! against mock transports and estimators.  Nothing here needs a serial
//! device.

mod control_loop_tests;
