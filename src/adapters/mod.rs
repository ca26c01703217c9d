//! Adapters from control-loop ports to the outside world.

pub mod log_sink;
