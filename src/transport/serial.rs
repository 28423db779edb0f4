//! Serial/USB transport implementation.
//!
//! This module provides serial port communication for lock controller units
//! connected via USB adapters.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use crate::error::{Error, Result};
use crate::transport::Transport;

/// Default baud rate for lock controller units.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default per-read timeout window.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Read buffer size per call.
pub const READ_BUF_SIZE: usize = 100;

/// Default delay after opening the port before the first write.
pub const DEFAULT_CONNECTION_DELAY: Duration = Duration::from_millis(300);

/// Configuration for serial transport.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Serial port path (e.g., "/dev/ttyUSB0" or "COM3").
    pub port: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Bounded wait per read call.
    pub read_timeout: Duration,
    /// Delay after connection before sending commands.
    pub connection_delay: Duration,
}

impl SerialConfig {
    /// Creates a new serial configuration with default settings.
    #[must_use]
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            connection_delay: DEFAULT_CONNECTION_DELAY,
        }
    }

    /// Sets the baud rate.
    #[must_use]
    pub const fn baud_rate(mut self, rate: u32) -> Self {
        self.baud_rate = rate;
        self
    }

    /// Sets the per-read timeout window.
    #[must_use]
    pub const fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the connection delay.
    #[must_use]
    pub const fn connection_delay(mut self, delay: Duration) -> Self {
        self.connection_delay = delay;
        self
    }
}

/// Serial transport for lock controller communication.
///
/// The stream is held whole rather than split: the control loop is the only
/// reader and the only writer, alternating between the two.
pub struct SerialTransport {
    config: SerialConfig,
    stream: Option<SerialStream>,
}

impl SerialTransport {
    /// Creates a new serial transport with the given configuration.
    #[must_use]
    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            stream: None,
        }
    }

    /// Creates a new serial transport for the given port with default
    /// settings.
    #[must_use]
    pub fn with_port(port: impl Into<String>) -> Self {
        Self::new(SerialConfig::new(port))
    }

    /// Returns the transport configuration.
    #[must_use]
    pub const fn config(&self) -> &SerialConfig {
        &self.config
    }
}

impl Transport for SerialTransport {
    fn connect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if self.stream.is_some() {
                return Ok(());
            }

            tracing::info!("connecting to serial port: {}", self.config.port);

            let mut stream = tokio_serial::new(&self.config.port, self.config.baud_rate)
                .open_native_async()
                .map_err(Error::Serial)?;

            // Wait for the unit to settle after the port opens
            tokio::time::sleep(self.config.connection_delay).await;

            // Drain stale bytes; controllers chatter shortly after the
            // adapter is opened
            let mut buf = [0u8; READ_BUF_SIZE];
            let mut drained = 0usize;
            while let Ok(Ok(n)) =
                tokio::time::timeout(Duration::from_millis(20), stream.read(&mut buf)).await
            {
                if n == 0 {
                    break;
                }
                drained += n;
            }
            if drained > 0 {
                tracing::debug!("drained {drained} stale bytes from buffer");
            }

            self.stream = Some(stream);
            tracing::info!("serial channel open");
            Ok(())
        })
    }

    fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if self.stream.take().is_some() {
                tracing::info!("disconnecting from serial port");
            }
            Ok(())
        })
    }

    fn send(&mut self, data: Bytes) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

            tracing::trace!("sending {} bytes: {}", data.len(), hex::encode(&data));
            stream.write_all(&data).await.map_err(Error::Io)?;
            stream.flush().await.map_err(Error::Io)?;

            Ok(())
        })
    }

    fn recv(
        &mut self,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<Bytes>> + Send + '_>> {
        Box::pin(async move {
            let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

            let mut buf = [0u8; READ_BUF_SIZE];
            match tokio::time::timeout(timeout, stream.read(&mut buf)).await {
                Err(_) => Ok(Bytes::new()),
                Ok(Ok(0)) => Err(Error::Io(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "serial port closed",
                ))),
                Ok(Ok(n)) => {
                    tracing::trace!("received {} bytes: {}", n, hex::encode(&buf[..n]));
                    Ok(Bytes::copy_from_slice(&buf[..n]))
                }
                Ok(Err(e)) => {
                    tracing::error!("serial read error: {}", e);
                    Err(Error::Io(e))
                }
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

/// Lists available serial ports.
///
/// # Errors
///
/// Returns an error if the port list cannot be retrieved.
pub fn list_ports() -> Result<Vec<String>> {
    let ports = tokio_serial::available_ports().map_err(Error::Serial)?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

/// Discovers the first available serial port.
///
/// Scans up to `attempts` times with `delay` between scans. Bounded by
/// design; the caller decides whether a missing channel is fatal (at startup
/// it is).
///
/// # Errors
///
/// Returns [`Error::ChannelUnavailable`] when no port appears within the
/// attempt budget.
pub async fn discover_port(attempts: u32, delay: Duration) -> Result<String> {
    for attempt in 1..=attempts {
        if let Some(port) = list_ports()?.into_iter().next() {
            tracing::info!("discovered serial port: {port}");
            return Ok(port);
        }
        tracing::debug!("no serial ports found (attempt {attempt}/{attempts})");
        tokio::time::sleep(delay).await;
    }
    Err(Error::ChannelUnavailable {
        reason: format!("no serial port appeared after {attempts} attempts"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_config_defaults() {
        let config = SerialConfig::new("/dev/ttyUSB0");
        assert_eq!(config.port, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.read_timeout, DEFAULT_READ_TIMEOUT);
    }

    #[test]
    fn test_serial_config_builder() {
        let config = SerialConfig::new("/dev/ttyUSB0")
            .baud_rate(19_200)
            .read_timeout(Duration::from_millis(250))
            .connection_delay(Duration::from_secs(1));
        assert_eq!(config.baud_rate, 19_200);
        assert_eq!(config.read_timeout, Duration::from_millis(250));
        assert_eq!(config.connection_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_not_connected_state() {
        let transport = SerialTransport::with_port("/dev/ttyUSB0");
        assert!(!transport.is_connected());
    }

    #[test]
    #[ignore = "Requires /sys/class/tty - not available in sandboxed builds"]
    fn test_list_ports() {
        // Just verify it doesn't panic
        let _ = list_ports();
    }
}
