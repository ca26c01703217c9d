//! Newline frame accumulator.
//!
//! Serial reads return whatever bytes happen to be buffered: part of a
//! line, several lines, or a line split across calls.  `LineDecoder`
//! accumulates those chunks and hands out complete lines in arrival order.
//!
//! ```text
//!  feed("41.5,26")        partial = "41.5,26"          ready = []
//!  feed(".3,58.0\r\n30")  partial = "30"               ready = ["41.5,26.3,58.0"]
//! ```
//!
//! Bounded in both directions: an over-long line is dropped whole, and
//! only the newest [`MAX_PENDING_LINES`] complete lines are retained.

use std::collections::VecDeque;

use log::{debug, warn};

/// Longest accepted line, terminator excluded (protects against a peer
/// that never sends `\n`).
pub const MAX_LINE_LEN: usize = 256;

/// Complete lines kept while waiting for the consumer.
pub const MAX_PENDING_LINES: usize = 8;

/// One extra byte so a CR before the `\n` does not count against the limit.
const LINE_BUF: usize = MAX_LINE_LEN + 1;

/// Streaming line decoder.
pub struct LineDecoder {
    partial: heapless::Vec<u8, LINE_BUF>,
    /// Current line exceeded `MAX_LINE_LEN`; skip to the next `\n`.
    overflowed: bool,
    ready: VecDeque<Vec<u8>>,
    dropped_overlong: u64,
    dropped_backlog: u64,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LineDecoder {
    pub fn new() -> Self {
        Self {
            partial: heapless::Vec::new(),
            overflowed: false,
            ready: VecDeque::with_capacity(MAX_PENDING_LINES),
            dropped_overlong: 0,
            dropped_backlog: 0,
        }
    }

    /// Feed raw bytes.  Completed lines become available via [`next_line`](Self::next_line).
    pub fn feed(&mut self, data: &[u8]) {
        for &byte in data {
            if byte == b'\n' {
                self.finish_line();
                continue;
            }
            if self.overflowed {
                continue;
            }
            if self.partial.push(byte).is_err() {
                self.overflowed = true;
                self.partial.clear();
            }
        }
    }

    /// Oldest complete line, if any.
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        self.ready.pop_front()
    }

    /// Number of complete lines waiting.
    pub fn pending(&self) -> usize {
        self.ready.len()
    }

    /// Lines discarded for exceeding [`MAX_LINE_LEN`].
    pub fn dropped_overlong(&self) -> u64 {
        self.dropped_overlong
    }

    /// Lines discarded because the consumer fell behind.
    pub fn dropped_backlog(&self) -> u64 {
        self.dropped_backlog
    }

    /// Forget all buffered data (e.g. after reopening the port).
    pub fn reset(&mut self) {
        self.partial.clear();
        self.overflowed = false;
        self.ready.clear();
    }

    fn finish_line(&mut self) {
        let mut line: &[u8] = &self.partial;
        if let Some(stripped) = line.strip_suffix(b"\r") {
            line = stripped;
        }

        if self.overflowed || line.len() > MAX_LINE_LEN {
            self.overflowed = false;
            self.partial.clear();
            self.dropped_overlong += 1;
            warn!("line exceeded {MAX_LINE_LEN} bytes, discarded");
            return;
        }

        if !line.is_empty() {
            if self.ready.len() == MAX_PENDING_LINES {
                self.ready.pop_front();
                self.dropped_backlog += 1;
                debug!("line backlog full, dropped oldest");
            }
            self.ready.push_back(line.to_vec());
        }
        self.partial.clear();
    }
}
