//! Line assembler for the serial command link.
//!
//! Wire format: printable ASCII terminated by `\n` or `\r`.
//!
//! ```text
//! ┌───────────────────────────────┬────────────┐
//! │ command text (≤ 32 bytes)     │ \n or \r   │
//! └───────────────────────────────┴────────────┘
//! ```
//!
//! The assembler is fed one byte at a time from the receive-complete
//! handler and yields a [`Line`] when a terminator arrives.  Bytes past
//! capacity are dropped silently; the line still closes at the next
//! terminator.  Empty lines (e.g. the `\n` of a `\r\n` pair) yield nothing.
//! Non-ASCII bytes are replaced by `?`, so every line is valid UTF-8.

/// Maximum command length in bytes, terminator excluded.
pub const LINE_CAPACITY: usize = 32;

/// A completed command line.
pub type Line = heapless::String<LINE_CAPACITY>;

/// Streaming byte-to-line assembler.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buf: heapless::Vec<u8, LINE_CAPACITY>,
    truncated: bool,
}

impl LineAssembler {
    pub const fn new() -> Self {
        Self {
            buf: heapless::Vec::new(),
            truncated: false,
        }
    }

    /// Feed one byte.  Returns `Some(line)` when a terminator closes a
    /// non-empty line.
    pub fn push(&mut self, byte: u8) -> Option<Line> {
        match byte {
            b'\n' | b'\r' => {
                if self.buf.is_empty() {
                    self.truncated = false;
                    return None;
                }
                let mut line = Line::new();
                for &b in &self.buf {
                    let c = if b.is_ascii() { b as char } else { '?' };
                    // One byte per char and the buffers share a capacity.
                    let _ = line.push(c);
                }
                self.reset();
                Some(line)
            }
            _ => {
                if self.buf.push(byte).is_err() {
                    self.truncated = true;
                }
                None
            }
        }
    }

    /// Whether bytes were dropped from the line currently being assembled.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Bytes buffered so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Drop any partial line.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.truncated = false;
    }
}
