//! Scripted radio for deterministic testing of the PER engine.
//!
//! [`MockRadio`] records every driver call in a shared [`CallLog`] and hands
//! out pre-loaded [`RadioEvent`]s from [`wait_event`](Radio::wait_event).
//! Any call can be made to fail to exercise fatal radio error paths.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use lora_per_core::error::{Error, Result};
use lora_per_core::events::RadioEvent;
use lora_per_core::radio::{IrqMask, Radio};
use lora_per_core::types::LoraModulation;

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioCall {
    SetFrequency(u32),
    SetTxPower(i8),
    SetModulation(LoraModulation),
    SetRxBoosted(bool),
    SetIrqMask(IrqMask),
    ClearIrqStatus(IrqMask),
    WritePayload(Vec<u8>),
    StartTx,
    StartRx(Duration),
    SetContinuousWave,
    Sleep(Duration),
    Standby,
}

impl RadioCall {
    /// The driver method name, as accepted by [`MockRadio::fail_on`].
    pub fn name(&self) -> &'static str {
        match self {
            RadioCall::SetFrequency(_) => "set_frequency",
            RadioCall::SetTxPower(_) => "set_tx_power",
            RadioCall::SetModulation(_) => "set_modulation",
            RadioCall::SetRxBoosted(_) => "set_rx_boosted",
            RadioCall::SetIrqMask(_) => "set_irq_mask",
            RadioCall::ClearIrqStatus(_) => "clear_irq_status",
            RadioCall::WritePayload(_) => "write_payload",
            RadioCall::StartTx => "start_tx",
            RadioCall::StartRx(_) => "start_rx",
            RadioCall::SetContinuousWave => "set_continuous_wave",
            RadioCall::Sleep(_) => "sleep",
            RadioCall::Standby => "standby",
        }
    }
}

/// Shared record of every call made on a [`MockRadio`].
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<RadioCall>>>);

impl CallLog {
    fn lock(&self) -> MutexGuard<'_, Vec<RadioCall>> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// A copy of every recorded call, in order.
    pub fn calls(&self) -> Vec<RadioCall> {
        self.lock().clone()
    }

    /// How many recorded calls have the given method name.
    pub fn count(&self, name: &str) -> usize {
        self.lock().iter().filter(|c| c.name() == name).count()
    }

    /// Every payload passed to `write_payload`, in order.
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.lock()
            .iter()
            .filter_map(|c| match c {
                RadioCall::WritePayload(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }
}

/// A mock [`Radio`] driven by a pre-loaded event script.
///
/// When the script runs out, `wait_event()` returns a radio error so a test
/// never hangs on an engine that keeps waiting.
#[derive(Debug, Default)]
pub struct MockRadio {
    events: VecDeque<RadioEvent>,
    log: CallLog,
    fail_on: Option<&'static str>,
}

impl MockRadio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event to the script.
    pub fn push_event(&mut self, event: RadioEvent) {
        self.events.push_back(event);
    }

    /// Append `count` copies of `event`.
    pub fn push_events(&mut self, event: RadioEvent, count: usize) {
        for _ in 0..count {
            self.events.push_back(event.clone());
        }
    }

    /// Append an `RxDone` carrying `payload`.
    pub fn push_rx_done(&mut self, payload: &[u8]) {
        self.push_event(RadioEvent::RxDone {
            payload: Bytes::copy_from_slice(payload),
        });
    }

    /// Make every call to the named driver method fail.
    pub fn fail_on(&mut self, method: &'static str) {
        self.fail_on = Some(method);
    }

    /// A handle onto the call log that outlives moving the radio.
    pub fn call_log(&self) -> CallLog {
        self.log.clone()
    }

    pub fn remaining_events(&self) -> usize {
        self.events.len()
    }

    fn record(&self, call: RadioCall) -> Result<()> {
        let name = call.name();
        self.log.lock().push(call);
        if self.fail_on == Some(name) {
            return Err(Error::Radio(format!("{name} rejected by mock radio")));
        }
        Ok(())
    }
}

#[async_trait]
impl Radio for MockRadio {
    async fn set_frequency(&mut self, freq_hz: u32) -> Result<()> {
        self.record(RadioCall::SetFrequency(freq_hz))
    }

    async fn set_tx_power(&mut self, dbm: i8) -> Result<()> {
        self.record(RadioCall::SetTxPower(dbm))
    }

    async fn set_modulation(&mut self, modulation: LoraModulation) -> Result<()> {
        self.record(RadioCall::SetModulation(modulation))
    }

    async fn set_rx_boosted(&mut self, on: bool) -> Result<()> {
        self.record(RadioCall::SetRxBoosted(on))
    }

    async fn set_irq_mask(&mut self, mask: IrqMask) -> Result<()> {
        self.record(RadioCall::SetIrqMask(mask))
    }

    async fn clear_irq_status(&mut self, mask: IrqMask) -> Result<()> {
        self.record(RadioCall::ClearIrqStatus(mask))
    }

    async fn write_payload(&mut self, payload: &[u8]) -> Result<()> {
        self.record(RadioCall::WritePayload(payload.to_vec()))
    }

    async fn start_tx(&mut self) -> Result<()> {
        self.record(RadioCall::StartTx)
    }

    async fn start_rx(&mut self, timeout: Duration) -> Result<()> {
        self.record(RadioCall::StartRx(timeout))
    }

    async fn set_continuous_wave(&mut self) -> Result<()> {
        self.record(RadioCall::SetContinuousWave)
    }

    async fn sleep(&mut self, wakeup: Duration) -> Result<()> {
        self.record(RadioCall::Sleep(wakeup))
    }

    async fn standby(&mut self) -> Result<()> {
        self.record(RadioCall::Standby)
    }

    async fn wait_event(&mut self) -> Result<RadioEvent> {
        self.events
            .pop_front()
            .ok_or_else(|| Error::Radio("mock radio event script exhausted".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_calls_in_order() {
        let mut radio = MockRadio::new();
        let log = radio.call_log();

        radio.set_frequency(868_000_000).await.unwrap();
        radio.write_payload(&[0, 1, 2]).await.unwrap();
        radio.start_tx().await.unwrap();

        assert_eq!(
            log.calls(),
            vec![
                RadioCall::SetFrequency(868_000_000),
                RadioCall::WritePayload(vec![0, 1, 2]),
                RadioCall::StartTx,
            ]
        );
        assert_eq!(log.count("start_tx"), 1);
        assert_eq!(log.payloads(), vec![vec![0, 1, 2]]);
    }

    #[tokio::test]
    async fn events_then_exhaustion() {
        let mut radio = MockRadio::new();
        radio.push_event(RadioEvent::TxDone);
        radio.push_rx_done(b"abc");

        assert_eq!(radio.wait_event().await.unwrap(), RadioEvent::TxDone);
        assert!(matches!(
            radio.wait_event().await.unwrap(),
            RadioEvent::RxDone { payload } if payload.as_ref() == b"abc"
        ));
        assert!(matches!(radio.wait_event().await, Err(Error::Radio(_))));
    }

    #[tokio::test]
    async fn fail_on_rejects_named_call() {
        let mut radio = MockRadio::new();
        radio.fail_on("start_rx");

        radio.set_frequency(1).await.unwrap();
        let err = radio
            .start_rx(Duration::from_millis(600))
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        // The failing call is still recorded.
        assert_eq!(radio.call_log().count("start_rx"), 1);
    }
}
