//! lora-per-test-harness: Test doubles for the LoRa PER test rig.
//!
//! This crate provides [`MockTransport`] for deterministic testing of the
//! AT command link, [`MockRadio`] for driving the PER engine through a
//! scripted sequence of radio notifications, and [`SimRadio`], a seedable
//! loopback radio for running a whole session on a host.

pub mod mock_radio;
pub mod mock_serial;
pub mod sim_radio;

pub use mock_radio::{CallLog, MockRadio, RadioCall};
pub use mock_serial::{MockTransport, SentLog};
pub use sim_radio::SimRadio;
