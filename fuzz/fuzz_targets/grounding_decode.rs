//! Fuzz target for grounding text decoding.
//!
//! This fuzzer feeds arbitrary UTF-8 text to the grounding scanner,
//! checking for panics, crashes, or hangs. Decoding is contractually
//! total: any input must produce annotations plus warnings, never an
//! error or a panic.

#![no_main]

use labelbridge::codec::decode;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let _ = decode(text);
});
