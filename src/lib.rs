#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod catalog;
mod codec;
mod command;
mod display;
mod fault;
mod frame;
mod generator;
mod message;
mod sentinel;
mod setup;
mod signal;

// Receive, standard id 0x618, 8 data bytes
// CanBus RX 0x618 80 00 A0 0E 10 00 AA 00

pub use catalog::{definitions, lookup, Direction, MessageDefinition, MessageId};
pub use codec::ByteOrder;
pub use command::*;
pub use display::HexBytes;
pub use fault::*;
pub use frame::*;
pub use generator::*;
pub use message::*;
pub use sentinel::SentinelRule;
pub use setup::*;
pub use signal::{AsciiBlock, Encoding, Linear, Signal, SignalValue};

pub use embedded_can::{Frame, Id, StandardId};
