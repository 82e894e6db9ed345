//! Transport trait for the AT command link.
//!
//! The [`Transport`] trait abstracts over the serial link that carries AT
//! commands to the rig and diagnostic text back to the operator.
//! Implementations exist for serial ports and stdio (`lora-per-transport`)
//! and for deterministic testing (`MockTransport` in
//! `lora-per-test-harness`).

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport for the command link.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the operator.
    ///
    /// Implementations should not return until all bytes have been handed to
    /// the underlying link.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the operator into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Will wait up to `timeout`
    /// for data to arrive; returns [`Error::Timeout`](crate::error::Error::Timeout)
    /// if nothing arrives within the deadline, and
    /// [`Error::ConnectionLost`](crate::error::Error::ConnectionLost) once the
    /// input has ended for good.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
