//! The test configuration store.
//!
//! [`TestConfig`] holds every radio test parameter the AT command layer can
//! change. It is owned by exactly one writer at a time: the command loop
//! mutates it while the rig is idle, then hands a copy to the PER engine when
//! a start command arrives. There is no shared global state.

use std::fmt;

use crate::helpers::{format_freq_mhz, needs_ldro};
use crate::types::{Bandwidth, CodingRate, LoraModulation, Role, SpreadingFactor};

/// Radio test parameters written by AT commands and read by the PER engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestConfig {
    /// Carrier frequency in hertz.
    pub frequency_hz: u32,
    /// Output power in dBm.
    pub tx_power_dbm: i8,
    pub spreading_factor: SpreadingFactor,
    pub bandwidth: Bandwidth,
    pub coding_rate: CodingRate,
    /// Transmitter or receiver end of the link.
    pub role: Role,
    /// Number of frames the receiver counts before reporting.
    pub nb_frames: u32,
    /// Boosted receive gain.
    pub rx_boost: bool,
    /// Put the radio to sleep before initialisation.
    pub sleep_before_run: bool,
    /// Emit an unmodulated carrier instead of running a campaign.
    pub continuous_wave: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        TestConfig {
            frequency_hz: 868_000_000,
            tx_power_dbm: 14,
            spreading_factor: SpreadingFactor::Sf7,
            bandwidth: Bandwidth::Bw125,
            coding_rate: CodingRate::Cr4_5,
            role: Role::Transmitter,
            nb_frames: 20,
            rx_boost: false,
            sleep_before_run: false,
            continuous_wave: false,
        }
    }
}

impl TestConfig {
    /// The modulation parameters implied by this configuration, with low data
    /// rate optimisation derived from the symbol time.
    pub fn modulation(&self) -> LoraModulation {
        LoraModulation {
            spreading_factor: self.spreading_factor,
            bandwidth: self.bandwidth,
            coding_rate: self.coding_rate,
            ldro: needs_ldro(self.spreading_factor, self.bandwidth),
        }
    }
}

impl fmt::Display for TestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} dBm, {}, {}, {} frames, rx_boost={}, sleep={}, cw={}",
            format_freq_mhz(self.frequency_hz),
            self.tx_power_dbm,
            self.role,
            self.modulation(),
            self.nb_frames,
            self.rx_boost,
            self.sleep_before_run,
            self.continuous_wave,
        )
    }
}
