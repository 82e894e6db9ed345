//! PerRig -- one test session from the first AT command to the report.
//!
//! A session has two phases. In the command phase the console dispatches
//! lines against the command table, and only command handlers write the
//! [`TestConfig`]. `AT+START` ends the phase; the engine then runs a campaign
//! on a snapshot of the configuration, and a receiver prints its report back
//! over the console.

use lora_per_at::{Console, Dispatcher};
use lora_per_core::{Radio, Result, TestConfig, Transport};
use tracing::{info, warn};

use crate::engine::PerEngine;
use crate::report::PerReport;

/// Line written to the console when the session opens.
pub const BANNER: &str = "LoRa PER test ready, AT+HELP for commands";

/// A PER test rig: console, command table, configuration and engine.
///
/// Constructed via [`PerRigBuilder`](crate::builder::PerRigBuilder).
pub struct PerRig<R: Radio> {
    console: Console,
    dispatcher: Dispatcher,
    config: TestConfig,
    engine: PerEngine<R>,
}

impl<R: Radio> PerRig<R> {
    pub(crate) fn new(
        console: Console,
        dispatcher: Dispatcher,
        config: TestConfig,
        engine: PerEngine<R>,
    ) -> Self {
        PerRig {
            console,
            dispatcher,
            config,
            engine,
        }
    }

    /// The configuration as the command phase left it.
    pub fn config(&self) -> &TestConfig {
        &self.config
    }

    pub fn engine(&self) -> &PerEngine<R> {
        &self.engine
    }

    pub fn console_name(&self) -> &str {
        self.console.name()
    }

    /// Run one session.
    ///
    /// Returns `Ok(None)` if the console input ends before `AT+START`, and
    /// the report once a receiver reaches its frame target. A transmitter or
    /// continuous-wave session only returns on a radio error.
    pub async fn run(&mut self) -> Result<Option<PerReport>> {
        self.console.write_line(BANNER).await?;

        let started = self
            .console
            .run_until_start(&self.dispatcher, &mut self.config)
            .await?;
        if !started {
            info!(console = %self.console.name(), "no start command, session over");
            return Ok(None);
        }

        let report = self.engine.run(&self.config).await?;
        for line in report.lines() {
            if let Err(e) = self.console.write_line(&line).await {
                warn!(error = %e, "failed to print report line");
            }
        }
        Ok(Some(report))
    }

    /// Stop the console and recover the command transport and the radio.
    pub async fn shutdown(self) -> Result<(Box<dyn Transport>, R)> {
        let transport = self.console.shutdown().await?;
        Ok((transport, self.engine.into_radio()))
    }
}
