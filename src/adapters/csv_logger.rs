//! CSV data logger over a byte stream.
//!
//! Implements [`TransportPort`] on anything `std::io::Write` (stdout on the
//! host, a UART writer on a board with `std`).  Every line is formatted
//! into a fixed buffer first, so a line is either written whole or not at
//! all.
//!
//! ```text
//! Time_ms, Temperature_C
//! 100, 25.00
//! 200, 25.13
//! ```

use core::fmt::Write as _;
use std::io::Write;

use heapless::String;

use crate::app::ports::TransportPort;
use crate::error::TransportError;

/// Column header, terminator included.
pub const CSV_HEADER: &str = "Time_ms, Temperature_C\r\n";

const SAMPLE_CAPACITY: usize = 48;

pub struct CsvLogger<W: Write> {
    out: W,
    lines_written: u32,
}

impl<W: Write> CsvLogger<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            lines_written: 0,
        }
    }

    pub fn lines_written(&self) -> u32 {
        self.lines_written
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_str(&mut self, text: &str) -> Result<(), TransportError> {
        self.out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush())
            .map_err(|_| TransportError::WriteFailed)?;
        self.lines_written = self.lines_written.wrapping_add(1);
        Ok(())
    }
}

impl<W: Write> TransportPort for CsvLogger<W> {
    fn log_header(&mut self) -> Result<(), TransportError> {
        self.write_str(CSV_HEADER)
    }

    fn log_sample(&mut self, timestamp_ms: u32, value: f32) -> Result<(), TransportError> {
        let mut line: String<SAMPLE_CAPACITY> = String::new();
        write!(line, "{timestamp_ms}, {value:.2}\r\n").map_err(|_| TransportError::LineTooLong)?;
        self.write_str(&line)
    }

    fn transmit(&mut self, text: &str) -> Result<(), TransportError> {
        self.write_str(text)
    }
}
