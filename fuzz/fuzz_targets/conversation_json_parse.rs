//! Fuzz target for conversation JSON parsing.
//!
//! Exercises the serde boundary of the persisted conversation schema with
//! arbitrary input, checking for panics or hangs.

#![no_main]

use labelbridge::curation::io::from_json_str;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let _ = from_json_str(text);
});
