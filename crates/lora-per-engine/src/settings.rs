//! Build-time constants of a PER campaign.

use std::time::Duration;

use lora_per_core::{LoraPacketParams, PacketType, TestConfig, lora_time_on_air};

/// Fixed engine parameters that no AT command changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Receive window before the frame's own time on air is added.
    pub rx_base_timeout: Duration,
    /// Pause between a completed transmission and the next one.
    pub tx_delay: Duration,
    /// Length of every test frame, rolling counter included.
    pub payload_len: u8,
    pub packet_type: PacketType,
    pub preamble_len: u16,
    pub crc_on: bool,
    pub explicit_header: bool,
    /// Wake-up time programmed when the sleep switch is on.
    pub sleep_wakeup: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            rx_base_timeout: Duration::from_millis(600),
            tx_delay: Duration::from_millis(200),
            payload_len: 20,
            packet_type: PacketType::LoRa,
            preamble_len: 8,
            crc_on: true,
            explicit_header: true,
            sleep_wakeup: Duration::from_millis(10_000),
        }
    }
}

impl EngineSettings {
    /// Packet framing used on air.
    pub fn packet_params(&self) -> LoraPacketParams {
        LoraPacketParams {
            preamble_len: self.preamble_len,
            payload_len: self.payload_len,
            explicit_header: self.explicit_header,
            crc_on: self.crc_on,
        }
    }

    /// Receive window for one test frame under `config`.
    pub fn rx_timeout(&self, config: &TestConfig) -> Duration {
        self.rx_base_timeout + lora_time_on_air(&config.modulation(), &self.packet_params())
    }

    /// The initial test frame: byte `i` holds `i`, so the rolling counter in
    /// byte 0 starts at zero.
    pub fn initial_payload(&self) -> Vec<u8> {
        (0..self.payload_len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lora_per_core::SpreadingFactor;

    #[test]
    fn defaults() {
        let s = EngineSettings::default();
        assert_eq!(s.rx_base_timeout, Duration::from_millis(600));
        assert_eq!(s.tx_delay, Duration::from_millis(200));
        assert_eq!(s.payload_len, 20);
        assert_eq!(s.packet_type, PacketType::LoRa);
        assert_eq!(s.sleep_wakeup, Duration::from_secs(10));
    }

    #[test]
    fn rx_timeout_adds_time_on_air() {
        let s = EngineSettings::default();
        let mut cfg = TestConfig::default();
        assert_eq!(s.rx_timeout(&cfg), Duration::from_millis(657));

        cfg.spreading_factor = SpreadingFactor::Sf12;
        assert!(s.rx_timeout(&cfg) > Duration::from_millis(1500));
    }

    #[test]
    fn initial_payload_layout() {
        let p = EngineSettings::default().initial_payload();
        assert_eq!(p.len(), 20);
        assert_eq!(p[0], 0);
        assert_eq!(p[1], 1);
        assert_eq!(p[19], 19);
    }
}
