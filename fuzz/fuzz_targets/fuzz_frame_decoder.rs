//! Fuzz target: `FrameDecoder::feed`
//!
//! Drives arbitrary byte sequences into the streaming frame decoder and
//! asserts that it never panics, never yields over-long payloads, and
//! accepts input cleanly again after a reset.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use simdeck::protocol::codec::{FrameDecoder, MAX_FRAME_SIZE};

fuzz_target!(|data: &[u8]| {
    let mut decoder = FrameDecoder::new();

    // Feed in the raw bytes (may contain any length byte, garbage, etc.)
    decoder.feed(data);
    while let Some(payload) = decoder.next_frame() {
        assert!(payload.len() <= MAX_FRAME_SIZE, "payload exceeds MAX_FRAME_SIZE");
    }
    // Whatever remains buffered must be a bounded partial frame.
    assert!(decoder.pending_bytes() <= data.len());

    // After a reset the decoder must accept bytes cleanly again.
    decoder.reset();
    decoder.feed(data);
});
