//! # lora-per -- LoRa Packet Error Rate Test Rig
//!
//! `lora-per` runs a packet error rate (PER) test between two LoRa radios.
//! An operator configures the rig over a serial console with AT commands,
//! then `AT+START` runs a campaign: the transmitter sends numbered frames
//! forever, the receiver counts what arrives and prints the PER once it has
//! seen the requested number of frames.
//!
//! ## Quick Start
//!
//! ```no_run
//! use lora_per::PerRigBuilder;
//! use lora_per_test_harness::SimRadio;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut rig = PerRigBuilder::new(SimRadio::new(Some(1)).with_loss(0.1))
//!         .serial_port("/dev/ttyACM0")
//!         .build()
//!         .await?;
//!
//!     if let Some(report) = rig.run().await? {
//!         println!("{report}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate                   | Purpose                                              |
//! |-------------------------|------------------------------------------------------|
//! | `lora-per-core`         | [`Radio`] and [`Transport`] traits, types, errors    |
//! | `lora-per-at`           | Line framing, command table, dispatcher, console IO  |
//! | `lora-per-engine`       | PER state machine, report, [`PerRig`] orchestration  |
//! | `lora-per-transport`    | Serial port and stdio transports                     |
//! | `lora-per-test-harness` | Mock transport, mock radio, simulated radio          |
//! | **`lora-per`**          | This facade crate -- re-exports everything           |
//!
//! ## AT Commands
//!
//! | Command          | Effect                                        |
//! |------------------|-----------------------------------------------|
//! | `AT+FREQ=<hz>`   | carrier frequency                             |
//! | `AT+POWER=<dbm>` | output power                                  |
//! | `AT+SF=<5..12>`  | spreading factor                              |
//! | `AT+BW=<khz>`    | bandwidth                                     |
//! | `AT+CR=<0..7>`   | coding rate                                   |
//! | `AT+TRSW=<0/1>`  | 1 = receiver, 0 = transmitter                 |
//! | `AT+CWSW=<0/1>`  | continuous wave                               |
//! | `AT+NBFRAME=<n>` | frames the receiver counts                    |
//! | `AT+RXBOOST=<0/1>` | boosted receive gain                        |
//! | `AT+SLEEP=<0/1>` | sleep before starting                         |
//! | `AT+HELP`        | command reference                             |
//! | `AT+START`       | start the test                                |
//!
//! A line may match more than one command: every table entry whose name
//! occurs in the line fires, in table order.

pub use lora_per_core::*;

/// Line framing, command dispatch and the console IO task.
pub mod at {
    pub use lora_per_at::*;
}

/// The PER state machine and session orchestration.
pub mod engine {
    pub use lora_per_engine::*;
}

/// Serial port and stdio command links.
pub mod transports {
    pub use lora_per_transport::*;
}

pub use lora_per_engine::{
    EngineSettings, PerEngine, PerReport, PerRig, PerRigBuilder, PerState,
};
pub use lora_per_transport::{SerialTransport, StdioTransport};
