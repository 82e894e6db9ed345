//! lora-per-core: Core traits, types, and error definitions for the LoRa
//! packet error rate (PER) test rig.
//!
//! This crate defines the hardware-agnostic abstractions shared by the AT
//! command interpreter and the PER engine. Applications depend on these types
//! without pulling in a specific serial or radio driver.
//!
//! # Key types
//!
//! - [`Radio`] -- the radio driver seam (configuration calls + notifications)
//! - [`Transport`] -- byte-level serial link carrying AT commands
//! - [`TestConfig`] -- the mutable configuration store written by commands
//! - [`RadioEvent`] -- asynchronous radio notifications
//! - [`Error`] / [`Result`] -- error handling

pub mod config;
pub mod error;
pub mod events;
pub mod helpers;
pub mod radio;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use lora_per_core::*`.
pub use config::TestConfig;
pub use error::{Error, Result};
pub use events::RadioEvent;
pub use helpers::{format_freq_mhz, lora_time_on_air, lora_time_on_air_ms};
pub use radio::{IrqMask, Radio};
pub use transport::Transport;
pub use types::*;
