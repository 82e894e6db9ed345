//! PerRigBuilder -- fluent builder for constructing [`PerRig`] instances.
//!
//! Separates configuration from construction so that callers can set up the
//! console framing, the starting test configuration, and the engine
//! constants before the command link is opened.
//!
//! # Example
//!
//! ```no_run
//! use lora_per_engine::builder::PerRigBuilder;
//! use lora_per_test_harness::SimRadio;
//!
//! # async fn example() -> lora_per_core::Result<()> {
//! let mut rig = PerRigBuilder::new(SimRadio::new(None))
//!     .serial_port("/dev/ttyACM0")
//!     .baud_rate(921_600)
//!     .build()
//!     .await?;
//! let report = rig.run().await?;
//! # Ok(())
//! # }
//! ```

use lora_per_at::{AtConfig, Dispatcher, spawn_console, standard_table};
use lora_per_core::error::{Error, Result};
use lora_per_core::{Radio, TestConfig, Transport};
use lora_per_transport::SerialTransport;
use lora_per_transport::serial::DEFAULT_BAUD_RATE;
use tracing::debug;

use crate::engine::PerEngine;
use crate::rig::PerRig;
use crate::settings::EngineSettings;

/// Fluent builder for [`PerRig`].
///
/// Every setting has a default, so the simplest usage is:
///
/// ```ignore
/// let rig = PerRigBuilder::new(radio)
///     .serial_port("/dev/ttyACM0")
///     .build()
///     .await?;
/// ```
pub struct PerRigBuilder<R: Radio> {
    radio: R,
    serial_port: Option<String>,
    baud_rate: Option<u32>,
    at: AtConfig,
    config: TestConfig,
    settings: EngineSettings,
}

impl<R: Radio> PerRigBuilder<R> {
    /// Create a new builder around the given radio driver.
    pub fn new(radio: R) -> Self {
        PerRigBuilder {
            radio,
            serial_port: None,
            baud_rate: None,
            at: AtConfig::default(),
            config: TestConfig::default(),
            settings: EngineSettings::default(),
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyACM0` or `COM5`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the console baud rate (default: 921 600).
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = Some(baud);
        self
    }

    /// Name the console in log output (default: `UART2`).
    pub fn console_name(mut self, name: &str) -> Self {
        self.at.name = name.to_string();
        self
    }

    pub fn line_capacity(mut self, capacity: usize) -> Self {
        self.at.line_capacity = capacity;
        self
    }

    pub fn read_capacity(mut self, capacity: usize) -> Self {
        self.at.read_capacity = capacity;
        self
    }

    /// How many completed lines may wait for the command loop (default: 8).
    pub fn queue_depth(mut self, depth: usize) -> Self {
        self.at.queue_depth = depth;
        self
    }

    /// The configuration the command phase starts from.
    pub fn config(mut self, config: TestConfig) -> Self {
        self.config = config;
        self
    }

    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build a [`PerRig`] with a caller-provided command transport.
    ///
    /// This is the entry point for tests (pass a `MockTransport` from
    /// `lora-per-test-harness`) and for running over stdio.
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<PerRig<R>> {
        if self.at.line_capacity == 0 || self.at.read_capacity == 0 {
            return Err(Error::InvalidParameter(
                "line and read buffer capacities must be non-zero".into(),
            ));
        }
        if self.at.queue_depth == 0 {
            return Err(Error::InvalidParameter(
                "line queue depth must be non-zero".into(),
            ));
        }
        if self.settings.payload_len == 0 {
            return Err(Error::InvalidParameter(
                "payload must hold at least the rolling counter".into(),
            ));
        }

        debug!(
            console = %self.at.name,
            line_capacity = self.at.line_capacity,
            read_capacity = self.at.read_capacity,
            payload_len = self.settings.payload_len,
            "building PER rig"
        );

        let dispatcher = Dispatcher::new(self.at.name.clone(), standard_table());
        let console = spawn_console(transport, self.at);
        let engine = PerEngine::new(self.radio, self.settings);
        Ok(PerRig::new(console, dispatcher, self.config, engine))
    }

    /// Build a [`PerRig`] on a serial console.
    ///
    /// Requires that [`serial_port()`](Self::serial_port) has been called.
    pub async fn build(self) -> Result<PerRig<R>> {
        let port = self
            .serial_port
            .as_ref()
            .ok_or_else(|| Error::InvalidParameter("serial_port is required for build()".into()))?;
        let baud = self.baud_rate.unwrap_or(DEFAULT_BAUD_RATE);

        let transport = SerialTransport::open(port, baud).await?;
        self.build_with_transport(Box::new(transport)).await
    }
}
