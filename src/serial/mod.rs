//! Serial command link: byte-to-line assembly and the single-slot handoff
//! to the supervisor loop.

pub mod channels;
pub mod codec;

pub use channels::{CommandSlot, LineConsumer, LineProducer};
pub use codec::{LINE_CAPACITY, Line, LineAssembler};
