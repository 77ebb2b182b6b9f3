//! Single-slot command mailbox between the serial receive context and the
//! supervisor loop.
//!
//! ```text
//! ┌──────────────────┐   Line   ┌───────────────┐   Command   ┌────────────┐
//! │  RX handler      │─────────▶│  CommandSlot  │────────────▶│ Supervisor │
//! │  (LineProducer)  │  signal  │  (1 slot)     │  try_take   │ (consumer) │
//! └──────────────────┘          └───────────────┘             └────────────┘
//! ```
//!
//! The slot is an `embassy-sync` [`Signal`]: posting sets the value and the
//! "ready" flag in one critical section; taking reads and clears both.  A
//! line posted before the previous one was taken replaces it.  The producer
//! never blocks.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use super::codec::{Line, LineAssembler};
use crate::app::commands::{Command, parse};

/// The shared slot.  Can live in a `static` on targets without threads.
pub struct CommandSlot {
    signal: Signal<CriticalSectionRawMutex, Line>,
}

impl Default for CommandSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandSlot {
    pub const fn new() -> Self {
        Self {
            signal: Signal::new(),
        }
    }

    /// Split into the producer half (RX context) and the consumer half
    /// (supervisor loop).  Borrowing `self` mutably makes a second split
    /// impossible while the halves are alive.
    pub fn split(&mut self) -> (LineProducer<'_>, LineConsumer<'_>) {
        let slot: &Self = self;
        (
            LineProducer {
                slot,
                assembler: LineAssembler::new(),
            },
            LineConsumer { slot },
        )
    }

    /// Whether a line is waiting to be taken.
    pub fn is_pending(&self) -> bool {
        self.signal.signaled()
    }
}

/// Producer half: owns the line assembler, posts completed lines.
pub struct LineProducer<'a> {
    slot: &'a CommandSlot,
    assembler: LineAssembler,
}

impl LineProducer<'_> {
    /// Feed one received byte.  Returns `true` when it completed a line.
    pub fn on_byte(&mut self, byte: u8) -> bool {
        match self.assembler.push(byte) {
            Some(line) => {
                self.slot.signal.signal(line);
                true
            }
            None => false,
        }
    }

    /// Whether the last posted line is still waiting to be taken.
    pub fn is_pending(&self) -> bool {
        self.slot.is_pending()
    }
}

/// Consumer half: takes at most one line per call and parses it.
pub struct LineConsumer<'a> {
    slot: &'a CommandSlot,
}

impl LineConsumer<'_> {
    /// Take the pending line, if any, clearing the ready flag.
    pub fn try_take_line(&mut self) -> Option<Line> {
        self.slot.signal.try_take()
    }

    /// Take and parse the pending line, if any.
    pub fn try_take(&mut self) -> Option<Command> {
        self.try_take_line().map(|line| parse(&line))
    }
}
