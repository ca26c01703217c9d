//! Fuzz target: `LineDecoder::feed`
//!
//! Drives arbitrary byte streams, split at a fuzzer-chosen stride, into
//! the line decoder and checks that it never panics, never yields an
//! empty or over-long line, and never holds more than the backlog bound.
//!
//! cargo fuzz run fuzz_line_decoder

#![no_main]

use irrigation::transport::line::{LineDecoder, MAX_LINE_LEN, MAX_PENDING_LINES};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&stride, stream)) = data.split_first() else {
        return;
    };
    let stride = usize::from(stride).max(1);

    let mut decoder = LineDecoder::new();
    for chunk in stream.chunks(stride) {
        decoder.feed(chunk);
        assert!(decoder.pending() <= MAX_PENDING_LINES);
    }
    while let Some(line) = decoder.next_line() {
        assert!(!line.is_empty(), "blank lines are skipped");
        assert!(line.len() <= MAX_LINE_LEN, "line exceeds MAX_LINE_LEN");
        assert!(!line.contains(&b'\n'));
    }

    decoder.reset();
    assert_eq!(decoder.pending(), 0);
});
