//! The console IO task.
//!
//! One tokio task owns the command [`Transport`] exclusively. It reads bytes,
//! feeds them through a [`LineFramer`], and publishes each completed line on a
//! bounded channel to the single command-loop consumer. Output written by the
//! consumer (help text, reports) goes back through the same task.
//!
//! Completed lines are never dropped. When the consumer falls behind and
//! `queue_depth` lines are waiting, the task stops reading and unread bytes
//! stay in the link until there is room again. Output requests are still
//! served meanwhile, so a handler printing help text cannot stall the loop.

use std::collections::VecDeque;
use std::time::Duration;

use lora_per_core::{Error, Result, TestConfig, Transport};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatcher::{DEFAULT_CONSOLE_NAME, Dispatcher};
use crate::protocol::{DEFAULT_LINE_CAPACITY, DEFAULT_READ_CAPACITY, LineFramer, ReadBuffer};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Configuration for the console IO task.
#[derive(Debug, Clone)]
pub struct AtConfig {
    /// Console name used in log output.
    pub name: String,
    /// Line buffer capacity in bytes, terminator slot included.
    pub line_capacity: usize,
    /// Read buffer capacity in bytes.
    pub read_capacity: usize,
    /// Completed lines that may wait for the command loop before the task
    /// stops reading input.
    pub queue_depth: usize,
    /// How long a single transport read waits before the loop checks for
    /// output and cancellation again.
    pub poll_timeout: Duration,
}

impl Default for AtConfig {
    fn default() -> Self {
        AtConfig {
            name: DEFAULT_CONSOLE_NAME.to_string(),
            line_capacity: DEFAULT_LINE_CAPACITY,
            read_capacity: DEFAULT_READ_CAPACITY,
            queue_depth: 8,
            poll_timeout: Duration::from_millis(50),
        }
    }
}

/// A request sent from the [`Console`] handle to the IO task.
pub enum Request {
    /// Write bytes to the operator.
    Write {
        data: Vec<u8>,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Graceful shutdown; returns the transport for recovery.
    Shutdown {
        reply: oneshot::Sender<Box<dyn Transport>>,
    },
}

/// Handle to the console IO task.
pub struct Console {
    name: String,
    lines_rx: mpsc::Receiver<ReadBuffer>,
    req_tx: mpsc::Sender<Request>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Console {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the next completed line.
    ///
    /// Returns `None` once the input has ended and every queued line has
    /// been consumed.
    pub async fn next_line(&mut self) -> Option<ReadBuffer> {
        self.lines_rx.recv().await
    }

    /// Write raw bytes to the operator.
    pub async fn write(&self, data: Vec<u8>) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.req_tx
            .send(Request::Write {
                data,
                reply: reply_tx,
            })
            .await
            .map_err(|_| Error::NotConnected)?;

        match reply_rx.await {
            Ok(result) => result,
            Err(_) => Err(Error::NotConnected),
        }
    }

    /// Write one line of text, terminated with CR+LF.
    pub async fn write_line(&self, line: &str) -> Result<()> {
        let mut data = Vec::with_capacity(line.len() + 2);
        data.extend_from_slice(line.as_bytes());
        data.extend_from_slice(b"\r\n");
        self.write(data).await
    }

    /// Run the command phase: dispatch lines until one requests a start.
    ///
    /// Returns `true` when a start was requested and `false` when the input
    /// ended first. Lines queued after the start command stay queued.
    pub async fn run_until_start(
        &mut self,
        dispatcher: &Dispatcher,
        config: &mut TestConfig,
    ) -> Result<bool> {
        while let Some(mut line) = self.next_line().await {
            let outcome = dispatcher.process_line(&mut line, config);
            for text in &outcome.output {
                self.write_line(text).await?;
            }
            if outcome.start_requested {
                info!(console = %self.name, "leaving command phase");
                return Ok(true);
            }
        }
        info!(console = %self.name, "console input ended before start");
        Ok(false)
    }

    /// Stop the IO task without recovering the transport.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Shut down the IO task and recover the transport.
    pub async fn shutdown(self) -> Result<Box<dyn Transport>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .req_tx
            .send(Request::Shutdown { reply: reply_tx })
            .await;
        let transport = reply_rx.await.map_err(|_| Error::NotConnected)?;
        let _ = self.task.await;
        Ok(transport)
    }
}

// ---------------------------------------------------------------------------
// Spawn
// ---------------------------------------------------------------------------

/// Spawn the console IO task over `transport`.
pub fn spawn_console(transport: Box<dyn Transport>, config: AtConfig) -> Console {
    let (lines_tx, lines_rx) = mpsc::channel::<ReadBuffer>(config.queue_depth.max(1));
    let (req_tx, req_rx) = mpsc::channel::<Request>(32);
    let cancel = CancellationToken::new();
    let name = config.name.clone();

    debug!(console = %name, queue_depth = config.queue_depth, "spawning console IO task");
    let task = tokio::spawn(io_loop(transport, config, lines_tx, req_rx, cancel.clone()));

    Console {
        name,
        lines_rx,
        req_tx,
        cancel,
        task,
    }
}

// ---------------------------------------------------------------------------
// IO Loop
// ---------------------------------------------------------------------------

/// Consecutive read failures after which the input is treated as ended.
const MAX_READ_FAILURES: u32 = 3;

/// The main IO loop. Runs as a spawned Tokio task.
///
/// Uses `tokio::select! { biased; }` to prioritize:
/// 1. Cancellation
/// 2. Output and shutdown requests
/// 3. Handing pending lines to the consumer
/// 4. Reading input, only while fewer than `queue_depth` lines are pending
async fn io_loop(
    mut transport: Box<dyn Transport>,
    config: AtConfig,
    lines_tx: mpsc::Sender<ReadBuffer>,
    mut req_rx: mpsc::Receiver<Request>,
    cancel: CancellationToken,
) {
    let mut framer = LineFramer::new(config.line_capacity, config.read_capacity);
    // Dropped once input has ended and every pending line is delivered, so
    // the consumer sees the end of the stream.
    let mut lines_tx = Some(lines_tx);
    let mut pending: VecDeque<ReadBuffer> = VecDeque::new();
    let mut input_ended = false;
    let mut read_failures = 0u32;
    let mut buf = [0u8; 256];

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!(console = %config.name, "console IO task cancelled");
                break;
            }

            req = req_rx.recv() => {
                match req {
                    Some(Request::Write { data, reply }) => {
                        let _ = reply.send(transport.send(&data).await);
                    }
                    Some(Request::Shutdown { reply }) => {
                        debug!(console = %config.name, "console shutdown requested");
                        let _ = reply.send(transport);
                        return;
                    }
                    None => {
                        debug!(console = %config.name, "console handle dropped, exiting IO task");
                        break;
                    }
                }
            }

            permit = reserve_slot(lines_tx.clone()), if !pending.is_empty() => {
                match (permit, pending.pop_front()) {
                    (Some(permit), Some(line)) => {
                        permit.send(line);
                    }
                    _ => {
                        debug!(console = %config.name, "line consumer gone");
                        pending.clear();
                        lines_tx = None;
                    }
                }
            }

            result = transport.receive(&mut buf, config.poll_timeout),
                if lines_tx.is_some() && !input_ended && pending.len() < config.queue_depth =>
            {
                match result {
                    Ok(n) => {
                        read_failures = 0;
                        for &b in &buf[..n] {
                            if let Some(line) = framer.on_byte(b) {
                                pending.push_back(line);
                            }
                        }
                        if pending.len() >= config.queue_depth {
                            debug!(
                                console = %config.name,
                                pending = pending.len(),
                                "line queue full, pausing input"
                            );
                        }
                    }
                    Err(Error::Timeout) => {}
                    Err(Error::ConnectionLost | Error::NotConnected) => {
                        info!(console = %config.name, "console input ended");
                        input_ended = true;
                    }
                    Err(e) => {
                        read_failures += 1;
                        if read_failures >= MAX_READ_FAILURES {
                            warn!(
                                console = %config.name,
                                error = %e,
                                failures = read_failures,
                                "console read keeps failing, ending input"
                            );
                            input_ended = true;
                        } else {
                            warn!(console = %config.name, error = %e, "console read failed");
                            tokio::time::sleep(Duration::from_millis(10)).await;
                        }
                    }
                }
            }
        }

        if input_ended && pending.is_empty() && lines_tx.is_some() {
            lines_tx = None;
        }
    }
}

/// Wait for room on the line queue. `None` once the consumer is gone.
async fn reserve_slot(
    lines_tx: Option<mpsc::Sender<ReadBuffer>>,
) -> Option<mpsc::OwnedPermit<ReadBuffer>> {
    lines_tx?.reserve_owned().await.ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{HELP_TEXT, standard_table};
    use lora_per_core::SpreadingFactor;
    use lora_per_test_harness::MockTransport;

    fn scripted(input: &[u8]) -> MockTransport {
        let mut mock = MockTransport::new();
        mock.push_rx(input);
        mock.end_input();
        mock
    }

    #[test]
    fn at_config_defaults() {
        let config = AtConfig::default();
        assert_eq!(config.name, "UART2");
        assert_eq!(config.line_capacity, 255);
        assert_eq!(config.read_capacity, 125);
        assert_eq!(config.queue_depth, 8);
    }

    #[tokio::test]
    async fn lines_arrive_in_order_then_end() {
        let mock = scripted(b"AT+HELP\r\nAT+SF=9\n");
        let mut console = spawn_console(Box::new(mock), AtConfig::default());

        let first = console.next_line().await.unwrap();
        assert_eq!(first.as_bytes(), b"AT+HELP");
        let second = console.next_line().await.unwrap();
        assert_eq!(second.as_bytes(), b"AT+SF=9");
        assert!(console.next_line().await.is_none());

        let _ = console.shutdown().await;
    }

    #[tokio::test]
    async fn lines_split_across_reads() {
        let mut mock = MockTransport::new();
        mock.push_rx(b"AT+NB");
        mock.push_rx(b"FRAME=5");
        mock.push_rx(b"0\r\n");
        mock.end_input();
        let mut console = spawn_console(Box::new(mock), AtConfig::default());

        let line = console.next_line().await.unwrap();
        assert_eq!(line.as_bytes(), b"AT+NBFRAME=50");
        assert!(console.next_line().await.is_none());
    }

    #[tokio::test]
    async fn burst_larger_than_queue_is_delivered_whole() {
        let mock = scripted(b"AT+A\nAT+B\nAT+C\nAT+D\n");
        let config = AtConfig {
            queue_depth: 1,
            ..AtConfig::default()
        };
        let mut console = spawn_console(Box::new(mock), config);

        for expected in [&b"AT+A"[..], b"AT+B", b"AT+C", b"AT+D"] {
            let line = console.next_line().await.unwrap();
            assert_eq!(line.as_bytes(), expected);
        }
        assert!(console.next_line().await.is_none());
    }

    #[tokio::test]
    async fn output_served_while_queue_is_full() {
        let mut script = Vec::new();
        for _ in 0..12 {
            script.extend_from_slice(b"AT+HELP\r\n");
        }
        script.extend_from_slice(b"AT+START\r\n");
        let mock = scripted(&script);
        let sent = mock.sent_log();
        let config = AtConfig {
            queue_depth: 2,
            ..AtConfig::default()
        };
        let mut console = spawn_console(Box::new(mock), config);
        let dispatcher = Dispatcher::new("test", standard_table());
        let mut cfg = TestConfig::default();

        let started = console
            .run_until_start(&dispatcher, &mut cfg)
            .await
            .unwrap();

        assert!(started);
        assert_eq!(sent.len(), 12 * HELP_TEXT.len());
    }

    #[tokio::test]
    async fn persistent_read_errors_end_input() {
        let mut mock = MockTransport::new();
        mock.fail_reads();
        let mut console = spawn_console(Box::new(mock), AtConfig::default());

        let next = tokio::time::timeout(Duration::from_secs(5), console.next_line()).await;
        assert!(matches!(next, Ok(None)));
    }

    #[tokio::test]
    async fn write_line_reaches_transport() {
        let mock = MockTransport::new();
        let sent = mock.sent_log();
        let console = spawn_console(Box::new(mock), AtConfig::default());

        console.write_line("PER = 10%").await.unwrap();
        assert_eq!(sent.text(), "PER = 10%\r\n");

        let transport = console.shutdown().await.unwrap();
        assert!(transport.is_connected());
    }

    #[tokio::test]
    async fn write_fails_when_disconnected() {
        let mut mock = MockTransport::new();
        mock.set_connected(false);
        let console = spawn_console(Box::new(mock), AtConfig::default());

        let result = console.write_line("x").await;
        assert!(matches!(result, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn write_after_cancel_is_not_connected() {
        let console = spawn_console(Box::new(MockTransport::new()), AtConfig::default());
        console.cancel();
        tokio::task::yield_now().await;

        let result = console.write_line("x").await;
        assert!(matches!(result, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn command_phase_stops_at_start() {
        let mock = scripted(b"AT+FREQ=915000000\r\nAT+HELP\r\nAT+START\r\nAT+SF=9\r\n");
        let sent = mock.sent_log();
        let mut console = spawn_console(Box::new(mock), AtConfig::default());
        let dispatcher = Dispatcher::new(console.name().to_string(), standard_table());
        let mut config = TestConfig::default();

        let started = console
            .run_until_start(&dispatcher, &mut config)
            .await
            .unwrap();

        assert!(started);
        assert_eq!(config.frequency_hz, 915_000_000);
        // The line after AT+START belongs to nobody yet.
        assert_eq!(config.spreading_factor, SpreadingFactor::Sf7);
        assert_eq!(sent.len(), HELP_TEXT.len());
        assert!(sent.text().starts_with("AT command reference:\r\n"));
    }

    #[tokio::test]
    async fn command_phase_ends_with_input() {
        let mock = scripted(b"AT+SF=12\n");
        let mut console = spawn_console(Box::new(mock), AtConfig::default());
        let dispatcher = Dispatcher::new("test", standard_table());
        let mut config = TestConfig::default();

        let started = console
            .run_until_start(&dispatcher, &mut config)
            .await
            .unwrap();

        assert!(!started);
        assert_eq!(config.spreading_factor, SpreadingFactor::Sf12);
    }
}
