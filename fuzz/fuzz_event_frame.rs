//! Fuzz target for the event stream frame decoder.
//!
//! Run with: cargo +nightly fuzz run fuzz_event_frame
//!
//! Frames come straight off the network, so `decode_frame` must reject any
//! text without panicking, including previews cut inside multi-byte chars.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    if let Ok(event) = ctbot_core::decode_frame(&text) {
        let _ = event.kind().marker();
        let _ = event.module().image_url();
    }
});
