//! Fuzz target: `LineAssembler::push` + `parse`
//!
//! Streams arbitrary bytes through the serial line assembler and parses
//! every completed line.  Neither may panic, lines must stay within the
//! buffer, and unrecognized text must come back unchanged.
//!
//! cargo fuzz run fuzz_line_parser

#![no_main]

use libfuzzer_sys::fuzz_target;
use thermoloop::app::commands::{Command, parse};
use thermoloop::serial::{LINE_CAPACITY, LineAssembler};

fuzz_target!(|data: &[u8]| {
    let mut asm = LineAssembler::new();

    for &byte in data {
        if let Some(line) = asm.push(byte) {
            assert!(line.len() <= LINE_CAPACITY, "line exceeds capacity");
            match parse(&line) {
                Command::Unrecognized(raw) => assert_eq!(raw.as_str(), line.as_str()),
                Command::SetSetpoint(v) => assert!(v.is_finite()),
                _ => {}
            }
        }
        assert!(asm.len() <= LINE_CAPACITY);
    }
});
