//! Fuzz target: `codec::decode_reading`
//!
//! Any byte sequence either decodes to three finite values or is rejected
//! as `MalformedFrame`; nothing panics.
//!
//! cargo fuzz run fuzz_telemetry_frame

#![no_main]

use irrigation::codec;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(r) = codec::decode_reading(data) {
        assert!(r.features().iter().all(|v| v.is_finite()));
        assert_eq!(data.iter().filter(|&&b| b == b',').count(), 2);
    }
});
