//! A simulated LoRa link for running the test rig on a host.
//!
//! [`SimRadio`] plays both ends of the link. Transmissions complete after
//! their time on air. Receive windows are served by a simulated peer that
//! sends PER test frames back to back, losing or corrupting a configurable
//! fraction of them. Outcomes are drawn from a seedable RNG so a run can be
//! reproduced.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use lora_per_core::error::{Error, Result};
use lora_per_core::events::RadioEvent;
use lora_per_core::helpers::lora_time_on_air;
use lora_per_core::radio::{IrqMask, Radio};
use lora_per_core::types::{
    Bandwidth, CodingRate, LoraModulation, LoraPacketParams, SpreadingFactor,
};

/// Output power range of the LR11xx high-power PA, in dBm.
const TX_POWER_RANGE: std::ops::RangeInclusive<i8> = -9..=22;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Armed {
    Idle,
    Tx,
    Rx(Duration),
    ContinuousWave,
}

/// A loopback [`Radio`] with random frame loss.
#[derive(Debug)]
pub struct SimRadio {
    rng: StdRng,
    loss: f64,
    corruption: f64,
    payload_len: u8,
    modulation: LoraModulation,
    frequency_hz: u32,
    tx_len: usize,
    irq_mask: IrqMask,
    armed: Armed,
    peer_counter: u8,
}

impl SimRadio {
    /// Create a simulated radio. With `seed`, every run draws the same
    /// sequence of outcomes.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        SimRadio {
            rng,
            loss: 0.0,
            corruption: 0.0,
            payload_len: 20,
            modulation: LoraModulation {
                spreading_factor: SpreadingFactor::Sf7,
                bandwidth: Bandwidth::Bw125,
                coding_rate: CodingRate::Cr4_5,
                ldro: false,
            },
            frequency_hz: 0,
            tx_len: 0,
            irq_mask: IrqMask::NONE,
            armed: Armed::Idle,
            peer_counter: 0,
        }
    }

    /// Probability that a peer frame never arrives. Clamped to `0.0..=1.0`.
    pub fn with_loss(mut self, probability: f64) -> Self {
        self.loss = probability.clamp(0.0, 1.0);
        self
    }

    /// Probability that a peer frame arrives with a CRC error.
    pub fn with_corruption(mut self, probability: f64) -> Self {
        self.corruption = probability.clamp(0.0, 1.0);
        self
    }

    /// Length of the frames the simulated peer sends.
    pub fn with_payload_len(mut self, len: u8) -> Self {
        self.payload_len = len;
        self
    }

    pub fn frequency_hz(&self) -> u32 {
        self.frequency_hz
    }

    /// The interrupt sources last routed with `set_irq_mask`.
    pub fn irq_mask(&self) -> IrqMask {
        self.irq_mask
    }

    fn airtime(&self, len: usize) -> Duration {
        let packet = LoraPacketParams {
            payload_len: u8::try_from(len).unwrap_or(u8::MAX),
            ..LoraPacketParams::default()
        };
        lora_time_on_air(&self.modulation, &packet)
    }

    fn peer_frame(&mut self) -> Bytes {
        self.peer_counter = self.peer_counter.wrapping_add(1);
        let mut frame = vec![self.peer_counter];
        frame.extend(1..self.payload_len);
        Bytes::from(frame)
    }
}

#[async_trait]
impl Radio for SimRadio {
    async fn set_frequency(&mut self, freq_hz: u32) -> Result<()> {
        self.frequency_hz = freq_hz;
        Ok(())
    }

    async fn set_tx_power(&mut self, dbm: i8) -> Result<()> {
        if !TX_POWER_RANGE.contains(&dbm) {
            return Err(Error::Radio(format!(
                "tx power {dbm} dBm outside {}..={} dBm",
                TX_POWER_RANGE.start(),
                TX_POWER_RANGE.end()
            )));
        }
        Ok(())
    }

    async fn set_modulation(&mut self, modulation: LoraModulation) -> Result<()> {
        self.modulation = modulation;
        Ok(())
    }

    async fn set_rx_boosted(&mut self, on: bool) -> Result<()> {
        debug!(on, "sim radio rx boost");
        Ok(())
    }

    async fn set_irq_mask(&mut self, mask: IrqMask) -> Result<()> {
        self.irq_mask = mask;
        Ok(())
    }

    async fn clear_irq_status(&mut self, _mask: IrqMask) -> Result<()> {
        Ok(())
    }

    async fn write_payload(&mut self, payload: &[u8]) -> Result<()> {
        self.tx_len = payload.len();
        Ok(())
    }

    async fn start_tx(&mut self) -> Result<()> {
        self.armed = Armed::Tx;
        Ok(())
    }

    async fn start_rx(&mut self, timeout: Duration) -> Result<()> {
        self.armed = Armed::Rx(timeout);
        Ok(())
    }

    async fn set_continuous_wave(&mut self) -> Result<()> {
        self.armed = Armed::ContinuousWave;
        Ok(())
    }

    async fn sleep(&mut self, wakeup: Duration) -> Result<()> {
        debug!(?wakeup, "sim radio sleep");
        self.armed = Armed::Idle;
        Ok(())
    }

    async fn standby(&mut self) -> Result<()> {
        self.armed = Armed::Idle;
        Ok(())
    }

    async fn wait_event(&mut self) -> Result<RadioEvent> {
        let armed = std::mem::replace(&mut self.armed, Armed::Idle);
        match armed {
            Armed::Tx => {
                tokio::time::sleep(self.airtime(self.tx_len)).await;
                Ok(RadioEvent::TxDone)
            }
            Armed::Rx(timeout) => {
                let roll: f64 = self.rng.gen_range(0.0..1.0);
                let frame = self.peer_frame();
                if roll < self.loss {
                    trace!(counter = frame[0], "sim peer frame lost");
                    tokio::time::sleep(timeout).await;
                    Ok(RadioEvent::RxTimeout)
                } else if roll < self.loss + self.corruption {
                    tokio::time::sleep(self.airtime(frame.len())).await;
                    Ok(RadioEvent::CrcError)
                } else {
                    tokio::time::sleep(self.airtime(frame.len())).await;
                    Ok(RadioEvent::RxDone { payload: frame })
                }
            }
            // Nothing will ever be raised. The caller waits forever, which is
            // what a radio emitting a carrier looks like.
            Armed::Idle | Armed::ContinuousWave => {
                self.armed = armed;
                std::future::pending().await
            }
        }
    }
}
