//! Per-session counters.

/// What happened over the life of one control session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Cycles started.
    pub cycles: u64,
    /// Complete lines read from the transport.
    pub lines_received: u64,
    /// Lines the transport discarded while framing (over-long or
    /// pushed out of a full backlog).
    pub lines_dropped: u64,
    /// Cycles in which no line arrived in time.
    pub read_timeouts: u64,
    /// Lines rejected by the codec.
    pub malformed_frames: u64,
    /// Readings the estimator could not handle.
    pub estimation_faults: u64,
    /// Predictions below the minimum dose.
    pub suppressed: u64,
    /// Pump commands written.
    pub commands_sent: u64,
    /// Commands reduced by the safety cap.
    pub capped_commands: u64,
    /// Sum of all commanded pump runtimes (seconds).
    pub runtime_seconds_total: u64,
}

impl SessionStats {
    /// Lines that made it through decode and estimation.
    pub fn readings_used(&self) -> u64 {
        self.suppressed + self.commands_sent
    }
}
