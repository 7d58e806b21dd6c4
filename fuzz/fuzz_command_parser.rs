//! Fuzz target for chat command parsing.
//!
//! Run with: cargo +nightly fuzz run fuzz_command_parser
//!
//! The first byte picks a command prefix; the rest is the chat line.

#![no_main]

use libfuzzer_sys::fuzz_target;

use ctbot_core::CommandParser;

fuzz_target!(|data: &[u8]| {
    let Some((&first, rest)) = data.split_first() else {
        return;
    };
    let prefix = match first % 3 {
        0 => "!",
        1 => "?",
        _ => "ct!",
    };
    let Ok(line) = std::str::from_utf8(rest) else {
        return;
    };

    let parser = CommandParser::new(prefix);
    if let Some(Err(err)) = parser.parse(line) {
        let _ = err.to_string();
    }
});
