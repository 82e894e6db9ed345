//! Transport implementations for the PER test rig command link.
//!
//! This crate provides concrete implementations of the
//! [`Transport`](lora_per_core::Transport) trait from `lora-per-core`:
//!
//! - [`SerialTransport`]: the rig's UART, seen from the host as a USB virtual
//!   COM port
//! - [`StdioTransport`]: the process's stdin/stdout, for driving a simulated
//!   rig from a terminal or a pipe
//!
//! # Example
//!
//! ```no_run
//! use lora_per_transport::SerialTransport;
//! use lora_per_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> lora_per_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyACM0", 921_600).await?;
//!
//! transport.send(b"AT+HELP\r\n").await?;
//!
//! let mut buf = [0u8; 256];
//! let n = transport.receive(&mut buf, Duration::from_secs(1)).await?;
//! # Ok(())
//! # }
//! ```

pub mod serial;
pub mod stdio;

pub use serial::{DataBits, FlowControl, Parity, SerialConfig, SerialTransport, StopBits};
pub use stdio::StdioTransport;
