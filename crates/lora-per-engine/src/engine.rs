//! The PER test state machine.
//!
//! A campaign moves `Idle -> Arming -> Running -> Reporting -> Idle`. Arming
//! reads the [`TestConfig`] once and programs the radio; from then on the
//! engine only reacts to [`RadioEvent`]s, one at a time, each handled to
//! completion before the next is awaited.
//!
//! Only the receiver ends a campaign, when its frame index reaches the
//! target. The transmitter sends frames until the process is stopped, and a
//! continuous-wave run parks in [`PerState::ContinuousWave`] for good.
//!
//! Any radio driver error aborts the run and is returned unchanged.

use std::fmt;
use std::time::Duration;

use lora_per_core::{IrqMask, Radio, RadioEvent, Result, Role, TestConfig};
use tracing::{debug, error, info, warn};

use crate::report::{PerCounters, PerReport, per_percent};
use crate::settings::EngineSettings;

/// Where the engine is in a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerState {
    /// No radio activity; configuration may change.
    Idle,
    /// Programming the radio from the configuration snapshot.
    Arming,
    /// Counting radio notifications.
    Running,
    /// The frame target was reached; counters are final.
    Reporting,
    /// Emitting an unmodulated carrier. Terminal.
    ContinuousWave,
}

impl fmt::Display for PerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PerState::Idle => "idle",
            PerState::Arming => "arming",
            PerState::Running => "running",
            PerState::Reporting => "reporting",
            PerState::ContinuousWave => "continuous wave",
        };
        f.write_str(name)
    }
}

/// Drives one PER campaign on a [`Radio`].
pub struct PerEngine<R: Radio> {
    radio: R,
    settings: EngineSettings,
    config: TestConfig,
    state: PerState,
    counters: PerCounters,
    /// Failures only count once a frame has been seen.
    first_pkt_seen: bool,
    payload: Vec<u8>,
    rx_timeout: Duration,
    last_counter: Option<u8>,
}

impl<R: Radio> PerEngine<R> {
    pub fn new(radio: R, settings: EngineSettings) -> Self {
        PerEngine {
            radio,
            payload: settings.initial_payload(),
            rx_timeout: settings.rx_base_timeout,
            settings,
            config: TestConfig::default(),
            state: PerState::Idle,
            counters: PerCounters::default(),
            first_pkt_seen: false,
            last_counter: None,
        }
    }

    pub fn state(&self) -> PerState {
        self.state
    }

    pub fn counters(&self) -> PerCounters {
        self.counters
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// The configuration snapshot of the current campaign.
    pub fn config(&self) -> &TestConfig {
        &self.config
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn into_radio(self) -> R {
        self.radio
    }

    /// Run a whole campaign and return its report.
    ///
    /// Returns only for a receiver that reaches its frame target, or on a
    /// radio error. A transmitter and a continuous-wave run never return
    /// `Ok`.
    pub async fn run(&mut self, config: &TestConfig) -> Result<PerReport> {
        match self.run_campaign(config).await {
            Ok(report) => Ok(report),
            Err(e) => {
                error!(state = %self.state, error = %e, "PER run aborted");
                self.state = PerState::Idle;
                Err(e)
            }
        }
    }

    async fn run_campaign(&mut self, config: &TestConfig) -> Result<PerReport> {
        self.arm(config).await?;

        if self.state == PerState::ContinuousWave {
            info!("continuous wave on, parking");
            return std::future::pending().await;
        }

        while self.state == PerState::Running {
            let event = self.radio.wait_event().await?;
            self.handle_event(event).await?;
        }

        self.finish().await
    }

    /// Take a snapshot of `config`, program the radio, and start the first
    /// transmission or receive window.
    pub async fn arm(&mut self, config: &TestConfig) -> Result<()> {
        self.state = PerState::Arming;
        self.config = config.clone();
        self.counters = PerCounters::default();
        self.first_pkt_seen = false;
        self.last_counter = None;
        info!(config = %self.config, "arming PER test");

        if self.config.sleep_before_run {
            debug!(wakeup = ?self.settings.sleep_wakeup, "sleeping before init");
            self.radio.sleep(self.settings.sleep_wakeup).await?;
        }

        let modulation = self.config.modulation();
        self.radio.set_frequency(self.config.frequency_hz).await?;
        self.radio.set_tx_power(self.config.tx_power_dbm).await?;
        self.radio.set_modulation(modulation).await?;
        if self.config.rx_boost {
            self.radio.set_rx_boosted(true).await?;
        }

        if self.config.continuous_wave {
            self.radio.set_continuous_wave().await?;
            self.state = PerState::ContinuousWave;
            return Ok(());
        }

        self.radio.set_irq_mask(IrqMask::PER_TEST).await?;
        self.radio.clear_irq_status(IrqMask::ALL).await?;

        self.payload = self.settings.initial_payload();
        self.rx_timeout = self.settings.rx_timeout(&self.config);

        match self.config.role {
            Role::Receiver => {
                debug!(rx_timeout = ?self.rx_timeout, "opening first receive window");
                self.radio.start_rx(self.rx_timeout).await?;
            }
            Role::Transmitter => {
                self.radio.write_payload(&self.payload).await?;
                self.radio.start_tx().await?;
            }
        }

        self.state = PerState::Running;
        Ok(())
    }

    /// Handle one radio notification.
    ///
    /// Ignored outside [`PerState::Running`], so a continuous-wave or
    /// finished campaign never moves again.
    pub async fn handle_event(&mut self, event: RadioEvent) -> Result<()> {
        if self.state != PerState::Running {
            debug!(event = event.name(), state = %self.state, "event ignored");
            return Ok(());
        }

        match (self.config.role, event) {
            (Role::Transmitter, RadioEvent::TxDone) => self.on_tx_done().await,
            (Role::Receiver, RadioEvent::RxDone { payload }) => self.on_rx_done(&payload).await,
            (Role::Receiver, RadioEvent::RxTimeout) => {
                self.on_rx_failure(|c| &mut c.nb_rx_timeout).await
            }
            (Role::Receiver, RadioEvent::CrcError) => {
                self.on_rx_failure(|c| &mut c.nb_crc_error).await
            }
            (Role::Receiver, RadioEvent::LengthError) => {
                self.on_rx_failure(|c| &mut c.nb_length_error).await
            }
            (role, event) => {
                debug!(%role, event = event.name(), "event not used by this role");
                Ok(())
            }
        }
    }

    async fn on_tx_done(&mut self) -> Result<()> {
        tokio::time::sleep(self.settings.tx_delay).await;

        if let Some(counter) = self.payload.first_mut() {
            *counter = counter.wrapping_add(1);
            info!(counter = *counter, "counter value");
        }
        self.radio.write_payload(&self.payload).await?;
        self.radio.start_tx().await
    }

    async fn on_rx_done(&mut self, payload: &[u8]) -> Result<()> {
        self.first_pkt_seen = true;
        self.check_rolling_counter(payload);

        let expected = usize::from(self.settings.payload_len);
        if payload.len() == expected {
            self.counters.nb_ok += 1;
            debug!(nb_ok = self.counters.nb_ok, "valid frame received");
        } else {
            warn!(expected, received = payload.len(), "invalid frame size");
        }

        self.counters.per_index += 1;
        info!(per_index = self.counters.per_index, "PER index");

        if self.counters.per_index < self.config.nb_frames {
            self.radio.start_rx(self.rx_timeout).await
        } else {
            info!(
                per = per_percent(self.counters.nb_ok, self.config.nb_frames),
                "PER test complete"
            );
            self.state = PerState::Reporting;
            Ok(())
        }
    }

    async fn on_rx_failure(&mut self, counter: fn(&mut PerCounters) -> &mut u32) -> Result<()> {
        if self.first_pkt_seen {
            *counter(&mut self.counters) += 1;
        }
        self.radio.start_rx(self.rx_timeout).await
    }

    /// Warn about gaps in the transmitter's rolling counter. Diagnostic only.
    fn check_rolling_counter(&mut self, payload: &[u8]) {
        let Some(&counter) = payload.first() else {
            return;
        };
        if let Some(last) = self.last_counter {
            let gap = counter.wrapping_sub(last);
            if gap > 1 {
                warn!(last, counter, missed = gap - 1, "rolling counter gap");
            } else if gap == 0 {
                debug!(counter, "repeated rolling counter");
            }
        }
        self.last_counter = Some(counter);
    }

    /// Build the report and park the radio in standby.
    async fn finish(&mut self) -> Result<PerReport> {
        let report = PerReport::new(
            self.counters,
            self.config.nb_frames,
            self.settings.packet_type,
        );
        info!(%report, "PER report");
        self.radio.standby().await?;
        self.state = PerState::Idle;
        Ok(report)
    }
}
