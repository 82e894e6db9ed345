//! Standard input/output as a command link.
//!
//! Lets the rig run on a host without a serial adapter: AT commands are read
//! from stdin (a terminal, a pipe, or a redirected script) and console output
//! goes to stdout. End of file on stdin is reported as
//! [`Error::ConnectionLost`].

use std::time::Duration;

use async_trait::async_trait;
use lora_per_core::error::{Error, Result};
use lora_per_core::transport::Transport;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

/// A [`Transport`] over any async reader/writer pair, stdio by default.
pub struct StdioTransport<I = tokio::io::Stdin, O = tokio::io::Stdout> {
    input: Option<I>,
    output: Option<O>,
}

impl StdioTransport {
    /// Read commands from the process stdin and write to stdout.
    pub fn new() -> Self {
        Self::from_parts(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, O> StdioTransport<I, O>
where
    I: AsyncRead + Unpin + Send + Sync,
    O: AsyncWrite + Unpin + Send + Sync,
{
    /// Build a link from an arbitrary reader and writer.
    pub fn from_parts(input: I, output: O) -> Self {
        StdioTransport {
            input: Some(input),
            output: Some(output),
        }
    }
}

#[async_trait]
impl<I, O> Transport for StdioTransport<I, O>
where
    I: AsyncRead + Unpin + Send + Sync,
    O: AsyncWrite + Unpin + Send + Sync,
{
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let output = self.output.as_mut().ok_or(Error::NotConnected)?;
        output.write_all(data).await?;
        output.flush().await?;
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let input = self.input.as_mut().ok_or(Error::NotConnected)?;
        match tokio::time::timeout(timeout, input.read(buf)).await {
            Ok(Ok(0)) => {
                debug!("stdin reached end of file");
                self.input = None;
                Err(Error::ConnectionLost)
            }
            Ok(Ok(n)) => {
                trace!(bytes = n, "received from stdin");
                Ok(n)
            }
            Ok(Err(e)) => Err(Error::Io(e)),
            Err(_) => Err(Error::Timeout),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.input = None;
        if let Some(mut output) = self.output.take() {
            output.flush().await?;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.output.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_then_reports_end_of_input() {
        let (mut operator, rig_input) = tokio::io::duplex(64);
        let mut transport = StdioTransport::from_parts(rig_input, tokio::io::sink());

        operator.write_all(b"AT+HELP\r\n").await.unwrap();
        drop(operator);

        let mut buf = [0u8; 32];
        let n = transport
            .receive(&mut buf, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"AT+HELP\r\n");

        let err = transport
            .receive(&mut buf, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConnectionLost));
        // Input is gone for good, output still works.
        let err = transport
            .receive(&mut buf, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotConnected));
        assert!(transport.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_input_times_out() {
        let (_operator, rig_input) = tokio::io::duplex(64);
        let mut transport = StdioTransport::from_parts(rig_input, tokio::io::sink());

        let mut buf = [0u8; 8];
        let err = transport
            .receive(&mut buf, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout));
    }

    #[tokio::test]
    async fn send_writes_output() {
        let (rig_output, mut operator) = tokio::io::duplex(64);
        let mut transport = StdioTransport::from_parts(tokio::io::empty(), rig_output);

        transport.send(b"PER = 0\r\n").await.unwrap();

        let mut buf = [0u8; 16];
        let n = operator.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"PER = 0\r\n");
    }

    #[tokio::test]
    async fn close_disconnects() {
        let mut transport = StdioTransport::from_parts(tokio::io::empty(), tokio::io::sink());
        transport.close().await.unwrap();
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.send(b"x").await,
            Err(Error::NotConnected)
        ));
    }
}
