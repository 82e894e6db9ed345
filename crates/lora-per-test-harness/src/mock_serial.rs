//! Mock transport for deterministic testing of the command link.
//!
//! [`MockTransport`] implements the [`Transport`] trait with pre-loaded
//! operator input. Every `send()` is recorded in a shared [`SentLog`] that
//! stays readable after the transport has been moved into an IO task.
//!
//! # Example
//!
//! ```
//! use lora_per_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // Pre-load what the operator types; receive() hands it out in order.
//! mock.push_rx(b"AT+SF=9\r\n");
//! mock.push_rx(b"AT+START\r\n");
//! // After the queued input, receive() reports the link as gone.
//! mock.end_input();
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use lora_per_core::error::{Error, Result};
use lora_per_core::transport::Transport;

/// Shared record of every `send()` made through a [`MockTransport`].
#[derive(Debug, Clone, Default)]
pub struct SentLog(Arc<Mutex<Vec<Vec<u8>>>>);

impl SentLog {
    fn lock(&self) -> MutexGuard<'_, Vec<Vec<u8>>> {
        // A panicking test thread may poison the lock; the data is still valid.
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn push(&self, data: &[u8]) {
        self.lock().push(data.to_vec());
    }

    /// Number of `send()` calls recorded.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// A copy of every recorded `send()` payload, in order.
    pub fn data(&self) -> Vec<Vec<u8>> {
        self.lock().clone()
    }

    /// Everything sent so far, concatenated and decoded as text.
    pub fn text(&self) -> String {
        let concatenated: Vec<u8> = self.lock().concat();
        String::from_utf8_lossy(&concatenated).into_owned()
    }
}

/// A mock [`Transport`] for testing the command link without hardware.
///
/// Input chunks are handed out by `receive()` in the order they were
/// pushed, one chunk (or as much as fits) per call. When the queue is empty,
/// `receive()` waits for the timeout and returns [`Error::Timeout`], or
/// returns [`Error::ConnectionLost`] if [`end_input`](Self::end_input) was
/// called.
#[derive(Debug)]
pub struct MockTransport {
    /// Queued operator input.
    rx_queue: VecDeque<Vec<u8>>,
    /// Whether the input ends once the queue drains.
    input_ended: bool,
    /// Whether the transport is "connected".
    connected: bool,
    /// Whether every `receive()` fails with a transport error.
    reads_fail: bool,
    /// Log of all bytes sent through this transport.
    sent_log: SentLog,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            rx_queue: VecDeque::new(),
            input_ended: false,
            connected: true,
            reads_fail: false,
            sent_log: SentLog::default(),
        }
    }

    /// Queue bytes to be returned by a later `receive()` call.
    pub fn push_rx(&mut self, data: &[u8]) {
        self.rx_queue.push_back(data.to_vec());
    }

    /// Mark the input as finished after the queued chunks.
    pub fn end_input(&mut self) {
        self.input_ended = true;
    }

    /// Return a copy of all data that has been sent through this transport.
    ///
    /// Each element is the byte slice from one `send()` call.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        self.sent_log.data()
    }

    /// A handle onto the send log that outlives moving the transport.
    pub fn sent_log(&self) -> SentLog {
        self.sent_log.clone()
    }

    /// Return the number of input chunks not yet received.
    pub fn remaining_input(&self) -> usize {
        self.rx_queue.len()
    }

    /// Make every later `receive()` fail with [`Error::Transport`], as a
    /// port that keeps reporting read errors would.
    pub fn fail_reads(&mut self) {
        self.reads_fail = true;
    }

    /// Set the connected state of the mock transport.
    ///
    /// When set to `false`, subsequent `send()` and `receive()` calls will
    /// return [`Error::NotConnected`].
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        self.sent_log.push(data);
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        if self.reads_fail {
            return Err(Error::Transport("mock read failure".into()));
        }

        let Some(mut chunk) = self.rx_queue.pop_front() else {
            if self.input_ended {
                return Err(Error::ConnectionLost);
            }
            tokio::time::sleep(timeout).await;
            return Err(Error::Timeout);
        };

        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            // Keep the unread tail for the next call.
            chunk.drain(..n);
            self.rx_queue.push_front(chunk);
        }
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.rx_queue.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_transport_receives_in_order() {
        let mut mock = MockTransport::new();
        mock.push_rx(b"AT+SF=9\r\n");
        mock.push_rx(b"AT+START\r\n");

        let mut buf = [0u8; 64];
        let n = mock
            .receive(&mut buf, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"AT+SF=9\r\n");

        let n = mock
            .receive(&mut buf, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"AT+START\r\n");
        assert_eq!(mock.remaining_input(), 0);
    }

    #[tokio::test]
    async fn mock_transport_tracks_sent_data() {
        let mut mock = MockTransport::new();
        let log = mock.sent_log();

        mock.send(b"PER = 10\r\n").await.unwrap();
        mock.send(b"Final PER index: 20\r\n").await.unwrap();

        assert_eq!(mock.sent_data().len(), 2);
        assert_eq!(mock.sent_data()[0], b"PER = 10\r\n");
        assert_eq!(log.len(), 2);
        assert_eq!(log.text(), "PER = 10\r\nFinal PER index: 20\r\n");
    }

    #[tokio::test(start_paused = true)]
    async fn mock_transport_empty_queue_times_out() {
        let mut mock = MockTransport::new();
        let mut buf = [0u8; 64];

        let result = mock.receive(&mut buf, Duration::from_millis(10)).await;
        assert!(matches!(result.unwrap_err(), Error::Timeout));
    }

    #[tokio::test]
    async fn mock_transport_ended_input_is_connection_lost() {
        let mut mock = MockTransport::new();
        mock.push_rx(b"x");
        mock.end_input();

        let mut buf = [0u8; 8];
        assert_eq!(
            mock.receive(&mut buf, Duration::from_millis(10))
                .await
                .unwrap(),
            1
        );
        let result = mock.receive(&mut buf, Duration::from_millis(10)).await;
        assert!(matches!(result.unwrap_err(), Error::ConnectionLost));
    }

    #[tokio::test]
    async fn mock_transport_disconnect() {
        let mut mock = MockTransport::new();
        assert!(mock.is_connected());

        mock.close().await.unwrap();
        assert!(!mock.is_connected());

        // Operations after close should fail.
        let result = mock.send(&[0x01]).await;
        assert!(matches!(result.unwrap_err(), Error::NotConnected));
    }

    #[tokio::test]
    async fn mock_transport_set_connected() {
        let mut mock = MockTransport::new();
        mock.set_connected(false);
        assert!(!mock.is_connected());

        let result = mock.send(&[0x01]).await;
        assert!(matches!(result.unwrap_err(), Error::NotConnected));

        let mut buf = [0u8; 8];
        let result = mock.receive(&mut buf, Duration::from_millis(10)).await;
        assert!(matches!(result.unwrap_err(), Error::NotConnected));
    }

    #[tokio::test]
    async fn mock_transport_failing_reads() {
        let mut mock = MockTransport::new();
        mock.push_rx(b"AT+HELP\r\n");
        mock.fail_reads();

        let mut buf = [0u8; 16];
        for _ in 0..2 {
            let result = mock.receive(&mut buf, Duration::from_millis(10)).await;
            assert!(matches!(result.unwrap_err(), Error::Transport(_)));
        }
        // Sending is unaffected.
        mock.send(b"x").await.unwrap();
        assert_eq!(mock.remaining_input(), 1);
    }

    #[tokio::test]
    async fn mock_transport_partial_receive() {
        let mut mock = MockTransport::new();
        mock.push_rx(&[0xAA, 0xBB, 0xCC, 0xDD]);

        // Read with a buffer smaller than the chunk.
        let mut buf = [0u8; 2];
        let n = mock
            .receive(&mut buf, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(&buf[..n], &[0xAA, 0xBB]);

        // Read the remaining bytes.
        let n = mock
            .receive(&mut buf, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(&buf[..n], &[0xCC, 0xDD]);
    }
}
