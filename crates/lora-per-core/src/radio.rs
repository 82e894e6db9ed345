//! The `Radio` trait -- the seam between the PER engine and a radio driver.
//!
//! The engine only consumes this interface: discrete configuration and
//! start/stop calls, plus [`wait_event`](Radio::wait_event) which yields the
//! next interrupt notification. Any `Err` returned by a driver call is treated
//! as fatal for the current run.

use std::fmt;
use std::ops::BitOr;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::events::RadioEvent;
use crate::types::LoraModulation;

/// Radio interrupt mask.
///
/// Bit positions follow the LR11xx IRQ register layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IrqMask(u32);

impl IrqMask {
    pub const NONE: IrqMask = IrqMask(0);
    pub const TX_DONE: IrqMask = IrqMask(1 << 2);
    pub const RX_DONE: IrqMask = IrqMask(1 << 3);
    pub const PREAMBLE_DETECTED: IrqMask = IrqMask(1 << 4);
    pub const SYNC_WORD_HEADER_VALID: IrqMask = IrqMask(1 << 5);
    pub const HEADER_ERROR: IrqMask = IrqMask(1 << 6);
    pub const CRC_ERROR: IrqMask = IrqMask(1 << 7);
    pub const TIMEOUT: IrqMask = IrqMask(1 << 10);
    pub const FSK_LEN_ERROR: IrqMask = IrqMask(1 << 23);
    pub const ALL: IrqMask = IrqMask(u32::MAX);

    /// The interrupts a PER campaign listens to.
    pub const PER_TEST: IrqMask = IrqMask(
        Self::TX_DONE.0
            | Self::RX_DONE.0
            | Self::TIMEOUT.0
            | Self::PREAMBLE_DETECTED.0
            | Self::HEADER_ERROR.0
            | Self::FSK_LEN_ERROR.0
            | Self::CRC_ERROR.0,
    );

    /// Create a mask from raw register bits.
    pub fn from_bits(bits: u32) -> Self {
        IrqMask(bits)
    }

    /// Raw register bits.
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Whether every bit of `other` is set in this mask.
    pub fn contains(&self, other: IrqMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for IrqMask {
    type Output = IrqMask;

    fn bitor(self, rhs: IrqMask) -> IrqMask {
        IrqMask(self.0 | rhs.0)
    }
}

impl fmt::Display for IrqMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// Asynchronous interface to a LoRa radio driver.
#[async_trait]
pub trait Radio: Send {
    /// Program the carrier frequency in hertz.
    async fn set_frequency(&mut self, freq_hz: u32) -> Result<()>;

    /// Program the output power in dBm.
    async fn set_tx_power(&mut self, dbm: i8) -> Result<()>;

    /// Program spreading factor, bandwidth, and coding rate.
    async fn set_modulation(&mut self, modulation: LoraModulation) -> Result<()>;

    /// Enable or disable boosted receive gain.
    async fn set_rx_boosted(&mut self, on: bool) -> Result<()>;

    /// Route the given interrupt sources to the IRQ line.
    async fn set_irq_mask(&mut self, mask: IrqMask) -> Result<()>;

    /// Clear pending interrupt status.
    async fn clear_irq_status(&mut self, mask: IrqMask) -> Result<()>;

    /// Write a frame into the radio's transmit buffer.
    async fn write_payload(&mut self, payload: &[u8]) -> Result<()>;

    /// Start transmitting the buffered frame.
    async fn start_tx(&mut self) -> Result<()>;

    /// Open a receive window that closes with [`RadioEvent::RxTimeout`]
    /// after `timeout` if no frame arrives.
    async fn start_rx(&mut self, timeout: Duration) -> Result<()>;

    /// Emit an unmodulated carrier until the radio is reset.
    async fn set_continuous_wave(&mut self) -> Result<()>;

    /// Enter the low-power sleep state, waking after `wakeup`.
    async fn sleep(&mut self, wakeup: Duration) -> Result<()>;

    /// Return to standby.
    async fn standby(&mut self) -> Result<()>;

    /// Wait for the next interrupt notification.
    async fn wait_event(&mut self) -> Result<RadioEvent>;
}

#[async_trait]
impl<R: Radio + ?Sized> Radio for Box<R> {
    async fn set_frequency(&mut self, freq_hz: u32) -> Result<()> {
        (**self).set_frequency(freq_hz).await
    }

    async fn set_tx_power(&mut self, dbm: i8) -> Result<()> {
        (**self).set_tx_power(dbm).await
    }

    async fn set_modulation(&mut self, modulation: LoraModulation) -> Result<()> {
        (**self).set_modulation(modulation).await
    }

    async fn set_rx_boosted(&mut self, on: bool) -> Result<()> {
        (**self).set_rx_boosted(on).await
    }

    async fn set_irq_mask(&mut self, mask: IrqMask) -> Result<()> {
        (**self).set_irq_mask(mask).await
    }

    async fn clear_irq_status(&mut self, mask: IrqMask) -> Result<()> {
        (**self).clear_irq_status(mask).await
    }

    async fn write_payload(&mut self, payload: &[u8]) -> Result<()> {
        (**self).write_payload(payload).await
    }

    async fn start_tx(&mut self) -> Result<()> {
        (**self).start_tx().await
    }

    async fn start_rx(&mut self, timeout: Duration) -> Result<()> {
        (**self).start_rx(timeout).await
    }

    async fn set_continuous_wave(&mut self) -> Result<()> {
        (**self).set_continuous_wave().await
    }

    async fn sleep(&mut self, wakeup: Duration) -> Result<()> {
        (**self).sleep(wakeup).await
    }

    async fn standby(&mut self) -> Result<()> {
        (**self).standby().await
    }

    async fn wait_event(&mut self) -> Result<RadioEvent> {
        (**self).wait_event().await
    }
}
