pub mod wire;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::error::AppError;

pub use wire::{RemoteResponse, WireCommand};

/// A request/response channel to the design-tool process.
///
/// One command in, one response out. Implementations own their connection
/// and must leave themselves reconnectable after any failure.
#[async_trait]
pub trait RemoteTransport: Send {
    /// Establish the connection now instead of on first use.
    async fn connect(&mut self) -> Result<(), AppError>;

    async fn exchange(&mut self, command: &WireCommand) -> Result<RemoteResponse, AppError>;

    fn is_connected(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

// ── TCP transport ──────────────────────────────────────────────────

/// Longest response line accepted from the remote, newline included.
pub const MAX_REPLY_BYTES: u64 = 1 << 20;

/// Persistent line-delimited JSON connection over TCP.
///
/// Connects lazily. Any I/O error, EOF, timeout, or unparseable reply drops
/// the stream; the next exchange reconnects before sending. An exchange whose
/// future was dropped before its reply was read also leaves the stream unusable.
pub struct RemoteHandle {
    address: String,
    timeout: Duration,
    state: ConnectionState,
    stream: Option<BufReader<TcpStream>>,
    /// Set from the first byte written until the reply line is parsed.
    in_flight: bool,
}

impl RemoteHandle {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
            state: ConnectionState::Disconnected,
            stream: None,
            in_flight: false,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Drop the stream, if any. The next exchange reconnects.
    pub fn disconnect(&mut self) {
        if self.stream.take().is_some() {
            tracing::info!(address = %self.address, "disconnected from remote");
        }
        self.state = ConnectionState::Disconnected;
        self.in_flight = false;
    }

    async fn open(&mut self) -> Result<(), AppError> {
        self.state = ConnectionState::Connecting;
        tracing::debug!(address = %self.address, "connecting to remote");

        let attempt = tokio::time::timeout(self.timeout, TcpStream::connect(&self.address)).await;
        let stream = match attempt {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                self.state = ConnectionState::Disconnected;
                return Err(AppError::remote_unavailable(format!(
                    "Failed to connect to {}: {e}",
                    self.address
                )));
            }
            Err(_) => {
                self.state = ConnectionState::Disconnected;
                return Err(AppError::remote_unavailable(format!(
                    "Timed out connecting to {} after {} ms",
                    self.address,
                    self.timeout.as_millis()
                )));
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(address = %self.address, error = %e, "failed to set TCP_NODELAY");
        }
        self.stream = Some(BufReader::new(stream));
        self.state = ConnectionState::Connected;
        tracing::info!(address = %self.address, "connected to remote");
        Ok(())
    }

    async fn round_trip(&mut self, line: &str) -> Result<RemoteResponse, AppError> {
        let timeout = self.timeout;
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| AppError::remote_unavailable("Not connected"))?;

        self.in_flight = true;
        tokio::time::timeout(timeout, stream.get_mut().write_all(line.as_bytes()))
            .await
            .map_err(|_| AppError::remote_unavailable("Timed out sending command"))?
            .map_err(|e| AppError::remote_unavailable(format!("Failed to send command: {e}")))?;

        let mut reply = String::new();
        let read = tokio::time::timeout(timeout, (&mut *stream).take(MAX_REPLY_BYTES).read_line(&mut reply))
            .await
            .map_err(|_| AppError::remote_unavailable("Timed out waiting for response"))?
            .map_err(|e| AppError::remote_unavailable(format!("Failed to read response: {e}")))?;

        if read == 0 {
            return Err(AppError::remote_unavailable("Connection closed by remote"));
        }
        if !reply.ends_with('\n') && read as u64 >= MAX_REPLY_BYTES {
            return Err(AppError::remote_unavailable(format!(
                "Response exceeded {MAX_REPLY_BYTES} bytes"
            )));
        }

        let response = RemoteResponse::from_line(&reply)
            .map_err(|e| AppError::remote_unavailable(format!("Malformed response from remote: {e}")))?;
        self.in_flight = false;
        Ok(response)
    }
}

#[async_trait]
impl RemoteTransport for RemoteHandle {
    async fn connect(&mut self) -> Result<(), AppError> {
        if self.stream.is_some() {
            return Ok(());
        }
        self.open().await
    }

    async fn exchange(&mut self, command: &WireCommand) -> Result<RemoteResponse, AppError> {
        let line = command.to_line().map_err(|e| AppError::Io {
            message: format!("Failed to encode {}: {e}", command.name()),
        })?;

        if self.in_flight {
            tracing::warn!(address = %self.address, "previous exchange was abandoned; reconnecting");
            self.disconnect();
        }
        if self.stream.is_none() {
            self.open().await?;
        }

        match self.round_trip(&line).await {
            Ok(response) => {
                tracing::debug!(command = command.name(), success = response.success, "remote exchange");
                Ok(response)
            }
            Err(e) => {
                tracing::warn!(command = command.name(), error = %e, "remote exchange failed");
                self.disconnect();
                Err(e)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}
