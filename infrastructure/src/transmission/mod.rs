//! Report transmitters: where accepted reports end up.
//!
//! - [`InMemoryTransmitter`]: keeps every report, for inspection and tests
//! - [`JsonlTransmitter`]: appends one JSON line per report to a file
//! - [`FanoutTransmitter`]: hands each report to several transmitters

mod fanout;
mod jsonl;
mod memory;

pub use fanout::FanoutTransmitter;
pub use jsonl::JsonlTransmitter;
pub use memory::{InMemoryTransmitter, TransmittedReport};
