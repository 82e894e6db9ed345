//! lora-per-at: the AT command interpreter of the LoRa PER test rig.
//!
//! Bytes from the command link are framed into lines ([`protocol`]), matched
//! against an ordered command table ([`dispatcher`]), and applied to the
//! [`TestConfig`](lora_per_core::TestConfig) by the standard command set
//! ([`commands`]). The [`io`] module runs the transport in its own task and
//! hands completed lines to a single consumer.

pub mod commands;
pub mod dispatcher;
pub mod io;
pub mod protocol;

pub use commands::standard_table;
pub use dispatcher::{CommandContext, CommandHandler, CommandTable, DispatchOutcome, Dispatcher};
pub use io::{AtConfig, Console, spawn_console};
pub use protocol::{LineFramer, Params, ReadBuffer};
